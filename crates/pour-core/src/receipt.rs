//! Install receipts: a JSON record written after an install passes its smoke test.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use pour_schema::{PackageName, Sha256Digest, Version};
use serde::{Deserialize, Serialize};

use crate::Layout;

/// What was installed, from where, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    /// Package name.
    pub name: PackageName,
    /// Installed version.
    pub version: Version,
    /// Resolved download URL.
    pub url: String,
    /// Verified archive digest.
    pub sha256: Sha256Digest,
    /// Absolute path of the installed binary.
    pub installed: PathBuf,
    /// Exit code the smoke test returned.
    pub test_exit_code: i32,
    /// Whether the archive came from the local cache.
    pub from_cache: bool,
    /// Completion time.
    pub installed_at: DateTime<Utc>,
}

impl InstallReceipt {
    /// Write the receipt to `<receipts>/<name>.json`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the receipt cannot be serialized or written.
    pub fn write(&self, layout: &Layout) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&layout.receipts_dir)?;
        let path = layout.receipt_path(&self.name);
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }

    /// Load the receipt for `name`, if one exists.
    ///
    /// # Errors
    ///
    /// Returns an I/O error for unreadable or malformed receipts.
    pub fn load(layout: &Layout, name: &PackageName) -> std::io::Result<Option<Self>> {
        let path = layout.receipt_path(name);
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Delete the receipt for `name`, if there is one.
    ///
    /// # Errors
    ///
    /// Returns any I/O error other than the receipt not existing.
    pub fn remove(layout: &Layout, name: &PackageName) -> std::io::Result<()> {
        match std::fs::remove_file(layout.receipt_path(name)) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
