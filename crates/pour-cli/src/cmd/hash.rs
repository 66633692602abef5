//! Hash command

use anyhow::{Context, Result};
use pour_schema::Sha256Digest;
use std::path::PathBuf;

/// Print the SHA256 digest of each file, in `sha256sum` layout.
pub fn hash(files: &[PathBuf]) -> Result<()> {
    for file in files {
        let digest = Sha256Digest::compute_file(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        println!("{digest}  {}", file.display());
    }
    Ok(())
}
