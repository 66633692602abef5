//! Directory layout.
//!
//! The binary directory and friends are resolved once (flags, environment,
//! home directory) and then handed to the pipeline explicitly as a [`Layout`].

use std::path::{Path, PathBuf};

use dirs::home_dir;
use pour_schema::{PackageName, Sha256Digest};

/// Environment variable overriding the prefix (`~/.pour`).
pub const HOME_ENV: &str = "POUR_HOME";

/// Environment variable overriding the binary directory (`<prefix>/bin`).
pub const BIN_DIR_ENV: &str = "POUR_BIN_DIR";

/// Returns the prefix directory, or None if the user's home cannot be resolved.
pub fn try_pour_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var(HOME_ENV) {
        if !val.is_empty() {
            return Some(PathBuf::from(val));
        }
    }
    home_dir().map(|h| h.join(".pour"))
}

/// Resolved directories used by one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Root of everything pour writes (`~/.pour`).
    pub prefix: PathBuf,
    /// Install target for binaries: `<prefix>/bin` unless overridden.
    pub bin_dir: PathBuf,
    /// Verified archives keyed by digest: `<prefix>/cache`.
    pub cache_dir: PathBuf,
    /// Staging area for extraction: `<prefix>/tmp`.
    pub tmp_dir: PathBuf,
    /// Install receipts: `<prefix>/receipts`.
    pub receipts_dir: PathBuf,
}

impl Layout {
    /// Standard layout below `prefix`.
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        let prefix = prefix.into();
        Self {
            bin_dir: prefix.join("bin"),
            cache_dir: prefix.join("cache"),
            tmp_dir: prefix.join("tmp"),
            receipts_dir: prefix.join("receipts"),
            prefix,
        }
    }

    /// Replace the binary directory, keeping everything else.
    pub fn with_bin_dir(mut self, bin_dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = bin_dir.into();
        self
    }

    /// Create the cache, staging and receipt directories.
    ///
    /// The binary directory is left alone; it is created by the install step
    /// so that nothing appears there before an archive has been verified.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error from directory creation.
    pub fn ensure_work_dirs(&self) -> std::io::Result<()> {
        for dir in [&self.cache_dir, &self.tmp_dir, &self.receipts_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Cache location for an archive: `<cache>/<sha256>-<filename>`.
    pub fn cache_file(&self, digest: &Sha256Digest, filename: &str) -> PathBuf {
        self.cache_dir.join(format!("{digest}-{filename}"))
    }

    /// Receipt location for a package: `<receipts>/<name>.json`.
    pub fn receipt_path(&self, name: &PackageName) -> PathBuf {
        self.receipts_dir.join(format!("{name}.json"))
    }

    /// Whether `path` sits under the binary directory.
    pub fn is_in_bin_dir(&self, path: &Path) -> bool {
        path.starts_with(&self.bin_dir)
    }
}
