//! Install command

use anyhow::{Context, Result};
use pour_core::{Layout, Pipeline};
use std::path::PathBuf;
use std::time::Instant;

use crate::ui::ConsoleReporter;

/// Install each formula in turn, stopping at the first failure.
pub async fn install(formulas: &[PathBuf], layout: Layout, quiet: bool) -> Result<()> {
    // Validate everything up front so a typo in the last file fails fast.
    let loaded = formulas
        .iter()
        .map(|path| super::load_formula(path))
        .collect::<Result<Vec<_>>>()?;

    let reporter = ConsoleReporter::new(quiet);
    let pipeline = Pipeline::new(super::http_client()?, layout, reporter);
    let start = Instant::now();

    for (path, formula) in formulas.iter().zip(&loaded) {
        tracing::debug!(formula = %path.display(), "installing");
        pipeline.install(formula).await.with_context(|| {
            format!(
                "Failed to install {} {}",
                formula.package.name, formula.package.version
            )
        })?;
    }

    if !quiet {
        let count = loaded.len();
        let noun = if count == 1 { "package" } else { "packages" };
        eprintln!(
            "\n  Installed {count} {noun} into {} in {:.1}s",
            pipeline.layout().bin_dir.display(),
            start.elapsed().as_secs_f64()
        );
    }

    Ok(())
}
