//! Placing the installed binary.
//!
//! The binary is copied into a temporary file inside the binary directory and
//! renamed over the target, so a reinstall of the same version swaps the file
//! atomically and a crash never leaves a half-written binary behind.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::InstallError;
use crate::io::extract::{self, ExtractedFile};

/// Find the install action's file among the regular files an extraction produced.
///
/// # Errors
///
/// Returns `InstallError::MissingFile` when `bin` is not among `files` or is no
/// longer a regular file on disk.
pub fn locate<'a>(
    files: &'a [ExtractedFile],
    bin: &str,
    archive: &str,
) -> Result<&'a ExtractedFile, InstallError> {
    let missing = || InstallError::MissingFile {
        name: bin.to_string(),
        archive: archive.to_string(),
    };
    let wanted = extract::sanitize(Path::new(bin)).map_err(|_| missing())?;

    let found = files
        .iter()
        .find(|f| f.relative_path == wanted)
        .filter(|f| extract::is_regular_file(&f.absolute_path));

    found.ok_or_else(|| {
        tracing::debug!(%bin, candidates = files.len(), "install source missing");
        missing()
    })
}

/// Copy `source` to `bin_dir/installed_name` with mode 0755.
///
/// # Errors
///
/// Returns any I/O error from creating the directory, copying, or renaming.
pub fn place_binary(source: &Path, bin_dir: &Path, installed_name: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(bin_dir)?;
    let target = bin_dir.join(installed_name);

    let mut staged = tempfile::Builder::new()
        .prefix(".pour-")
        .tempfile_in(bin_dir)?;
    {
        let mut reader = fs::File::open(source)?;
        io::copy(&mut reader, staged.as_file_mut())?;
        staged.as_file().sync_all()?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o755))?;
    }

    // The returned handle is still open for writing; close it before anything execs the target.
    let file = staged.persist(&target).map_err(|e| e.error)?;
    drop(file);

    tracing::info!(target = %target.display(), "installed binary");
    Ok(target)
}
