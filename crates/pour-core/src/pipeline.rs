//! The fixed install pipeline.
//!
//! ```text
//! resolve -> fetch -> verify -> extract -> install -> test
//! ```
//!
//! Steps run strictly in that order, each awaited before the next begins.
//! The binary directory is only touched once the archive digest has been
//! verified. Any previous receipt is removed before the binary is replaced,
//! so a failing smoke test leaves the new file in place with no receipt
//! vouching for it.

use pour_schema::Formula;
use reqwest::Client;

use crate::io::download::{DownloadRequest, Fetched};
use crate::io::extract;
use crate::smoke::{self, SmokeOutcome};
use crate::{InstallError, InstallReceipt, Layout, Reporter};

/// Run only the smoke test against what is currently in `layout.bin_dir`.
///
/// Needs no network access; this is what `pour test` runs.
///
/// # Errors
///
/// Returns `InstallError::Formula` for an invalid formula, or
/// `InstallError::TestFailure` when the test does not pass.
pub async fn test_installed<R: Reporter>(
    formula: &Formula,
    layout: &Layout,
    reporter: &R,
) -> Result<SmokeOutcome, InstallError> {
    formula.validate()?;
    let name = &formula.package.name;
    let version = &formula.package.version;

    match smoke_test(formula, layout, reporter).await {
        Ok(outcome) => {
            reporter.done(name, version, "test passed");
            Ok(outcome)
        }
        Err(e) => {
            reporter.failed(name, version, &e.to_string());
            Err(e)
        }
    }
}

async fn smoke_test<R: Reporter>(
    formula: &Formula,
    layout: &Layout,
    reporter: &R,
) -> Result<SmokeOutcome, InstallError> {
    let test = formula.test_action();
    let argv = test.argv(&layout.bin_dir).join(" ");
    reporter.testing(&formula.package.name, &formula.package.version, &argv);
    smoke::run(&test, &layout.bin_dir).await
}

/// Runs formulas through the pipeline against one [`Layout`].
#[derive(Debug)]
pub struct Pipeline<R: Reporter> {
    client: Client,
    layout: Layout,
    reporter: R,
}

impl<R: Reporter> Pipeline<R> {
    /// Build a pipeline; the layout's directories are created lazily.
    pub fn new(client: Client, layout: Layout, reporter: R) -> Self {
        Self {
            client,
            layout,
            reporter,
        }
    }

    /// The directories this pipeline installs into.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Install `formula` and run its smoke test.
    ///
    /// # Errors
    ///
    /// Returns the error of the first step that fails:
    /// `Formula` (validation), `Integrity` / `Download` (fetch & verify),
    /// `Extract` / `MissingFile` (install), `TestFailure` (test).
    pub async fn install(&self, formula: &Formula) -> Result<InstallReceipt, InstallError> {
        let name = &formula.package.name;
        let version = &formula.package.version;

        match self.run_steps(formula).await {
            Ok(receipt) => {
                let detail = if receipt.from_cache {
                    "installed (cached)"
                } else {
                    "installed"
                };
                self.reporter.done(name, version, detail);
                Ok(receipt)
            }
            Err(e) => {
                tracing::error!(package = %name, %version, error = %e, "install failed");
                self.reporter.failed(name, version, &e.to_string());
                Err(e)
            }
        }
    }

    async fn run_steps(&self, formula: &Formula) -> Result<InstallReceipt, InstallError> {
        let name = &formula.package.name;
        let version = &formula.package.version;

        // 1. Resolve
        formula.validate()?;
        let url = formula.resolved_url();
        let filename = formula.archive_filename();
        tracing::debug!(package = %name, %version, %url, "resolved");

        self.layout.ensure_work_dirs()?;

        // 2. Fetch & verify
        let cache_file = self.layout.cache_file(&formula.source.sha256, &filename);
        let fetched: Fetched = DownloadRequest::new(
            &self.client,
            name,
            version,
            &url,
            &cache_file,
            &formula.source.sha256,
            &self.reporter,
        )
        .execute()
        .await?;
        tracing::debug!(size = fetched.size, cached = fetched.from_cache, "archive verified");

        // 3. Extract into a private staging directory
        self.reporter.extracting(name, version);
        let staging = tempfile::Builder::new()
            .prefix(&format!("pour-{name}-"))
            .tempdir_in(&self.layout.tmp_dir)?;

        let archive = fetched.path.clone();
        let format = formula.format();
        let dest = staging.path().to_path_buf();
        let bin = formula.install.bin.clone();
        let files = tokio::task::spawn_blocking(move || {
            extract::extract_archive(&archive, format, &dest, &bin)
        })
        .await
        .map_err(|e| InstallError::context("Extraction task panicked", e))??;
        tracing::debug!(files = files.len(), "archive unpacked");

        // 4. Install
        self.reporter.installing(name, version);
        let source = crate::install::locate(&files, &formula.install.bin, &filename)?
            .absolute_path
            .clone();
        InstallReceipt::remove(&self.layout, name)?;
        let bin_dir = self.layout.bin_dir.clone();
        let installed_name = formula.install.installed_name().to_string();
        let installed = tokio::task::spawn_blocking(move || {
            crate::install::place_binary(&source, &bin_dir, &installed_name)
        })
        .await
        .map_err(|e| InstallError::context("Install task panicked", e))??;
        drop(staging);

        // 5. Test
        let outcome = smoke_test(formula, &self.layout, &self.reporter).await?;

        let receipt = InstallReceipt {
            name: name.clone(),
            version: version.clone(),
            url,
            sha256: fetched.digest,
            installed,
            test_exit_code: outcome.exit_code,
            from_cache: fetched.from_cache,
            installed_at: chrono::Utc::now(),
        };
        receipt.write(&self.layout)?;

        Ok(receipt)
    }
}
