//! Archive extraction module
//!
//! Handles tar.gz, tar.zst, tar, zip and raw binaries. Only regular files are
//! reported back; symlinks and directories in an archive are never install
//! candidates.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use pour_schema::ArtifactFormat;
use thiserror::Error;
use walkdir::WalkDir;
use zip::ZipArchive;
use zstd::stream::Decoder as ZstdDecoder;

/// Errors raised while unpacking an archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Filesystem or decoder failure.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The archive is malformed or contains an unsafe entry.
    #[error("Archive error: {0}")]
    Archive(String),
}

/// A regular file written during extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    /// Path relative to extraction root
    pub relative_path: PathBuf,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
}

/// Unpack `archive_path` into `dest_dir` according to `format`.
///
/// A raw binary is copied to `dest_dir/<bin>`. When `bin` is not present as
/// given and the content sits under a single top-level directory, that
/// directory is flattened by one level.
///
/// # Errors
///
/// Returns `ExtractError::Archive` for corrupt archives or entries that would
/// escape `dest_dir`, and `ExtractError::Io` otherwise.
pub fn extract_archive(
    archive_path: &Path,
    format: ArtifactFormat,
    dest_dir: &Path,
    bin: &str,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    tracing::debug!(archive = %archive_path.display(), %format, "extracting");

    let files = match format {
        ArtifactFormat::TarGz => extract_tar_gz(archive_path, dest_dir)?,
        ArtifactFormat::TarZst => extract_tar_zst(archive_path, dest_dir)?,
        ArtifactFormat::Tar => {
            let file = File::open(archive_path)?;
            extract_tar(BufReader::new(file), dest_dir)?
        }
        ArtifactFormat::Zip => extract_zip(archive_path, dest_dir)?,
        ArtifactFormat::Binary => return extract_raw(archive_path, dest_dir, bin),
    };

    if is_regular_file(&dest_dir.join(bin)) || !strip_components(dest_dir)? {
        return Ok(files);
    }
    list_files(dest_dir)
}

/// Extract a tar.zst archive to a destination directory
pub fn extract_tar_zst(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let reader = BufReader::new(file);
    let zstd_decoder = ZstdDecoder::new(reader)?;

    extract_tar(zstd_decoder, dest_dir)
}

/// Extract a tar.gz archive to a destination directory
pub fn extract_tar_gz(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let reader = BufReader::new(file);
    let gz_decoder = flate2::read::GzDecoder::new(reader);

    extract_tar(gz_decoder, dest_dir)
}

/// Extract a tar archive from a reader
fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<ExtractedFile>, ExtractError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    let mut extracted_files = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_type = entry.header().entry_type();

        // Parents are created by unpack_in
        if entry_type.is_dir() {
            continue;
        }

        let relative_path = sanitize(&entry.path()?)?;

        // unpack_in refuses to write through symlinks planted by earlier entries
        if !entry.unpack_in(dest_dir)? {
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {}",
                relative_path.display()
            )));
        }

        if entry_type.is_file() {
            extracted_files.push(ExtractedFile {
                absolute_path: dest_dir.join(&relative_path),
                relative_path,
            });
        }
    }

    Ok(extracted_files)
}

/// Extract a zip archive
pub fn extract_zip(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;

    fs::create_dir_all(dest_dir)?;
    let mut extracted_files = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        let Some(relative_path) = file.enclosed_name() else {
            return Err(ExtractError::Archive(format!(
                "Invalid path in archive: {}",
                file.name()
            )));
        };

        if file.is_dir() {
            fs::create_dir_all(dest_dir.join(&relative_path))?;
            continue;
        }

        let absolute_path = dest_dir.join(&relative_path);
        if let Some(p) = absolute_path.parent() {
            fs::create_dir_all(p)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode & 0o777))?;
            }
        }

        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
        });
    }

    Ok(extracted_files)
}

/// The download is the binary itself; copy it under its install name.
fn extract_raw(
    archive_path: &Path,
    dest_dir: &Path,
    binary_name: &str,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let relative_path = sanitize(Path::new(binary_name))?;
    let absolute_path = dest_dir.join(&relative_path);
    if let Some(parent) = absolute_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(archive_path, &absolute_path)?;

    Ok(vec![ExtractedFile {
        relative_path,
        absolute_path,
    }])
}

/// Detect if a directory has a single top-level directory and strip it by moving contents up.
///
/// Returns whether anything was moved.
pub fn strip_components(dir: &Path) -> io::Result<bool> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.filter_map(Result::ok).collect();

    // Filter out hidden files (like .DS_Store)
    entries.retain(|e| !e.file_name().to_string_lossy().starts_with('.'));

    if entries.len() != 1 || !entries[0].file_type()?.is_dir() {
        return Ok(false);
    }

    // Park the directory first so a child named like its parent ("tool/tool") cannot collide.
    let parked = dir.join(format!(
        ".pour-strip-{}",
        entries[0].file_name().to_string_lossy()
    ));
    fs::rename(entries[0].path(), &parked)?;

    for entry in fs::read_dir(&parked)? {
        let entry = entry?;
        fs::rename(entry.path(), dir.join(entry.file_name()))?;
    }

    fs::remove_dir(parked)?;
    Ok(true)
}

/// Whether `path` is a regular file, not following symlinks.
pub fn is_regular_file(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.is_file())
}

/// Every regular file below `root`, sorted by path.
fn list_files(root: &Path) -> Result<Vec<ExtractedFile>, ExtractError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative_path = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| ExtractError::Archive(e.to_string()))?
            .to_path_buf();
        files.push(ExtractedFile {
            relative_path,
            absolute_path: entry.into_path(),
        });
    }

    Ok(files)
}

/// Reject absolute paths and `..` so an entry cannot land outside the staging directory.
pub(crate) fn sanitize(path: &Path) -> Result<PathBuf, ExtractError> {
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => {
                return Err(ExtractError::Archive(format!(
                    "Invalid path in archive: {}",
                    path.display()
                )));
            }
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(ExtractError::Archive("Empty path in archive".to_string()));
    }
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::tempdir;

    type Entry<'a> = (&'a str, &'a [u8], u32);

    fn append_all<W: Write>(builder: &mut tar::Builder<W>, files: &[Entry<'_>]) {
        for (name, data, mode) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
    }

    fn tar_gz(path: &Path, files: &[Entry<'_>]) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        append_all(&mut builder, files);
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn tar_zst(path: &Path, files: &[Entry<'_>]) {
        let file = File::create(path).unwrap();
        let encoder = zstd::stream::Encoder::new(file, 0).unwrap();
        let mut builder = tar::Builder::new(encoder);
        append_all(&mut builder, files);
        builder.into_inner().unwrap().finish().unwrap();
    }

    fn plain_tar(path: &Path, files: &[Entry<'_>]) {
        let mut builder = tar::Builder::new(File::create(path).unwrap());
        append_all(&mut builder, files);
        builder.into_inner().unwrap().sync_all().unwrap();
    }

    fn zip_file(path: &Path, files: &[Entry<'_>]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, data, mode) in files {
            let options = zip::write::SimpleFileOptions::default().unix_permissions(*mode);
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
    }

    fn relative_paths(files: &[ExtractedFile]) -> Vec<PathBuf> {
        let mut names: Vec<_> = files.iter().map(|f| f.relative_path.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn test_extract_tar_gz_flat() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("tool.tar.gz");
        tar_gz(
            &archive,
            &[
                ("getawslog", b"#!/bin/sh\n".as_slice(), 0o755),
                ("README.md", b"docs".as_slice(), 0o644),
            ],
        );

        let dest = dir.path().join("out");
        let files = extract_archive(&archive, ArtifactFormat::TarGz, &dest, "getawslog").unwrap();

        assert_eq!(
            relative_paths(&files),
            vec![PathBuf::from("README.md"), PathBuf::from("getawslog")]
        );
        assert!(dest.join("getawslog").is_file());
        assert_eq!(files[0].absolute_path, dest.join(&files[0].relative_path));
    }

    #[test]
    fn test_extract_tar_gz_strips_single_top_level_dir() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("tool.tar.gz");
        tar_gz(
            &archive,
            &[
                ("tool-1.0.0/tool", b"bin".as_slice(), 0o755),
                ("tool-1.0.0/LICENSE", b"mit".as_slice(), 0o644),
            ],
        );

        let dest = dir.path().join("out");
        let files = extract_archive(&archive, ArtifactFormat::TarGz, &dest, "tool").unwrap();

        assert!(dest.join("tool").is_file());
        assert!(!dest.join("tool-1.0.0").exists());
        assert_eq!(
            relative_paths(&files),
            vec![PathBuf::from("LICENSE"), PathBuf::from("tool")]
        );
    }

    #[test]
    fn test_nested_bin_found_as_given_is_not_stripped() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("tool.tar.gz");
        tar_gz(&archive, &[("dist/tool", b"bin".as_slice(), 0o755)]);

        let dest = dir.path().join("out");
        let files = extract_archive(&archive, ArtifactFormat::TarGz, &dest, "dist/tool").unwrap();

        assert!(dest.join("dist/tool").is_file());
        assert_eq!(relative_paths(&files), vec![PathBuf::from("dist/tool")]);
    }

    #[test]
    fn test_versioned_dir_named_in_bin_is_kept() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("tool.tar.gz");
        tar_gz(&archive, &[("tool-1.0.0/tool", b"bin".as_slice(), 0o755)]);

        let dest = dir.path().join("out");
        extract_archive(&archive, ArtifactFormat::TarGz, &dest, "tool-1.0.0/tool").unwrap();

        assert!(dest.join("tool-1.0.0/tool").is_file());
    }

    #[test]
    fn test_extract_tar_zst_with_top_level_dir() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("tool.tar.zst");
        tar_zst(
            &archive,
            &[
                ("tool_linux/tool", b"zstd bin".as_slice(), 0o755),
                ("tool_linux/README", b"docs".as_slice(), 0o644),
            ],
        );

        let dest = dir.path().join("out");
        let files = extract_archive(&archive, ArtifactFormat::TarZst, &dest, "tool").unwrap();

        assert_eq!(fs::read(dest.join("tool")).unwrap(), b"zstd bin");
        assert_eq!(
            relative_paths(&files),
            vec![PathBuf::from("README"), PathBuf::from("tool")]
        );
    }

    #[test]
    fn test_extract_plain_tar() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("tool.tar");
        plain_tar(&archive, &[("tool", b"plain".as_slice(), 0o755)]);

        let dest = dir.path().join("out");
        let files = extract_archive(&archive, ArtifactFormat::Tar, &dest, "tool").unwrap();

        assert_eq!(fs::read(dest.join("tool")).unwrap(), b"plain");
        assert_eq!(relative_paths(&files), vec![PathBuf::from("tool")]);
    }

    #[test]
    fn test_extract_zip_flat() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("tool.zip");
        zip_file(
            &archive,
            &[
                ("tool", b"zip bin".as_slice(), 0o755),
                ("LICENSE", b"mit".as_slice(), 0o644),
            ],
        );

        let dest = dir.path().join("out");
        let files = extract_archive(&archive, ArtifactFormat::Zip, &dest, "tool").unwrap();

        assert_eq!(fs::read(dest.join("tool")).unwrap(), b"zip bin");
        assert_eq!(
            relative_paths(&files),
            vec![PathBuf::from("LICENSE"), PathBuf::from("tool")]
        );

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(dest.join("tool")).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
    }

    #[test]
    fn test_extract_zip_strips_single_top_level_dir() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("tool.zip");
        zip_file(&archive, &[("tool-2.0/bin/tool", b"zip bin".as_slice(), 0o755)]);

        let dest = dir.path().join("out");
        let files = extract_archive(&archive, ArtifactFormat::Zip, &dest, "bin/tool").unwrap();

        assert!(dest.join("bin/tool").is_file());
        assert!(!dest.join("tool-2.0").exists());
        assert_eq!(relative_paths(&files), vec![PathBuf::from("bin/tool")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_entries_are_not_reported() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("tool.tar");
        let mut builder = tar::Builder::new(File::create(&archive).unwrap());
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        header.set_link_name("/etc/passwd").unwrap();
        header.set_cksum();
        builder
            .append_data(&mut header, "getawslog", io::empty())
            .unwrap();
        append_all(&mut builder, &[("README.md", b"docs".as_slice(), 0o644)]);
        builder.into_inner().unwrap().sync_all().unwrap();

        let dest = dir.path().join("out");
        let files = extract_archive(&archive, ArtifactFormat::Tar, &dest, "getawslog").unwrap();

        assert_eq!(relative_paths(&files), vec![PathBuf::from("README.md")]);
        assert!(!is_regular_file(&dest.join("getawslog")));
    }

    #[test]
    fn test_strip_handles_child_named_like_parent() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("tool");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("tool"), "bin").unwrap();

        assert!(strip_components(dir.path()).unwrap());
        assert!(dir.path().join("tool").is_file());
    }

    #[test]
    fn test_strip_components_with_hidden_files() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("file.txt"), "content").unwrap();

        // Create a hidden file (simulation of .DS_Store)
        fs::write(dir.path().join(".DS_Store"), "junk").unwrap();

        assert!(strip_components(dir.path()).unwrap());

        // Should still strip because .DS_Store is ignored
        assert!(dir.path().join("file.txt").exists());
        assert!(!dir.path().join("nested").exists());
    }

    #[test]
    fn test_strip_components_leaves_flat_dirs() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a"), "a").unwrap();
        fs::write(dir.path().join("b"), "b").unwrap();

        assert!(!strip_components(dir.path()).unwrap());
    }

    #[test]
    fn test_extract_raw_binary() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("tool_Linux_x86_64");
        fs::write(&src, b"binary content").unwrap();

        let dest = dir.path().join("extracted");
        let files = extract_archive(&src, ArtifactFormat::Binary, &dest, "tool").unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].relative_path, PathBuf::from("tool"));
        assert!(files[0].absolute_path.exists());
    }

    #[test]
    fn test_corrupt_gzip_is_an_error() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("broken.tar.gz");
        fs::write(&archive, b"definitely not gzip").unwrap();

        let dest = dir.path().join("out");
        assert!(extract_archive(&archive, ArtifactFormat::TarGz, &dest, "tool").is_err());
    }

    #[test]
    fn test_sanitize_rejects_traversal() {
        assert!(sanitize(Path::new("../evil")).is_err());
        assert!(sanitize(Path::new("/etc/passwd")).is_err());
        assert_eq!(
            sanitize(Path::new("./bin/tool")).unwrap(),
            PathBuf::from("bin/tool")
        );
    }
}
