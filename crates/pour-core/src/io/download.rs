//! Archive download with streaming SHA256 verification.
//!
//! Bytes land in a `.part` file next to the destination and are hashed as
//! they arrive. Only a verified file is renamed into place, so the cache never
//! holds an archive whose digest does not match its name.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use pour_schema::{PackageName, Sha256Digest, Version};
use reqwest::Client;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::Reporter;

/// Errors raised while fetching or verifying an archive.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Transport failure or non-success HTTP status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The fetched bytes do not hash to the recorded digest.
    #[error("Hash mismatch: expected {expected}, got {actual}")]
    HashMismatch {
        /// Digest recorded in the formula.
        expected: String,
        /// Digest of the bytes actually received.
        actual: String,
    },
}

/// Result of a successful fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Verified archive on disk.
    pub path: PathBuf,
    /// Its digest (equal to the expected one).
    pub digest: Sha256Digest,
    /// Size in bytes.
    pub size: u64,
    /// Whether the network was skipped.
    pub from_cache: bool,
}

/// Request for a download operation
#[derive(Debug)]
pub struct DownloadRequest<'a, R: Reporter> {
    /// Shared HTTP client.
    pub client: &'a Client,
    /// Package being fetched (for progress).
    pub pkg_name: &'a PackageName,
    /// Version being fetched (for progress).
    pub version: &'a Version,
    /// Resolved archive URL.
    pub url: &'a str,
    /// Final location of the verified archive.
    pub dest: &'a Path,
    /// Digest the archive must hash to.
    pub expected: &'a Sha256Digest,
    /// Progress sink.
    pub reporter: &'a R,
}

impl<'a, R: Reporter> DownloadRequest<'a, R> {
    /// Bundle the parameters of one download.
    pub fn new(
        client: &'a Client,
        pkg_name: &'a PackageName,
        version: &'a Version,
        url: &'a str,
        dest: &'a Path,
        expected: &'a Sha256Digest,
        reporter: &'a R,
    ) -> Self {
        Self {
            client,
            pkg_name,
            version,
            url,
            dest,
            expected,
            reporter,
        }
    }

    /// Reuse a verified cached archive if present, otherwise download.
    ///
    /// # Errors
    ///
    /// See [`download_and_verify`].
    pub async fn execute(self) -> Result<Fetched, DownloadError> {
        if let Some(fetched) = reuse_cached(&self).await? {
            return Ok(fetched);
        }
        download_and_verify(self).await
    }
}

/// Re-hash an existing cache entry; evict it when it no longer matches.
async fn reuse_cached<R: Reporter>(
    req: &DownloadRequest<'_, R>,
) -> Result<Option<Fetched>, DownloadError> {
    if !tokio::fs::try_exists(req.dest).await? {
        return Ok(None);
    }

    req.reporter.verifying(req.pkg_name, req.version);
    let path = req.dest.to_path_buf();
    let (digest, size) = tokio::task::spawn_blocking(move || {
        let size = std::fs::metadata(&path)?.len();
        Ok::<_, std::io::Error>((Sha256Digest::compute_file(&path)?, size))
    })
    .await
    .map_err(std::io::Error::other)??;

    if &digest == req.expected {
        tracing::debug!(path = %req.dest.display(), "using cached archive");
        req.reporter.cached(req.pkg_name, req.version);
        return Ok(Some(Fetched {
            path: req.dest.to_path_buf(),
            digest,
            size,
            from_cache: true,
        }));
    }

    tracing::warn!(
        path = %req.dest.display(),
        expected = %req.expected,
        actual = %digest,
        "evicting corrupt cache entry"
    );
    req.reporter
        .warning(&format!("cached {} is corrupt, downloading again", req.url));
    tokio::fs::remove_file(req.dest).await?;
    Ok(None)
}

/// Download `req.url` to `req.dest`, hashing while streaming.
///
/// # Errors
///
/// Returns `DownloadError::Http` on transport failure or a non-2xx status,
/// `DownloadError::HashMismatch` when the digest differs (the partial file is
/// removed and `req.dest` is never created), and `DownloadError::Io` for
/// filesystem failures.
pub async fn download_and_verify<R: Reporter>(
    req: DownloadRequest<'_, R>,
) -> Result<Fetched, DownloadError> {
    let DownloadRequest {
        client,
        pkg_name,
        version,
        url,
        dest,
        expected,
        reporter,
    } = req;

    tracing::info!(%url, "fetching archive");

    let response = client
        .get(url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
        .send()
        .await?
        .error_for_status()?;

    let total_size = response.content_length();
    reporter.downloading(pkg_name, version, 0, total_size);

    let part = part_path(dest);
    let streamed = stream_to_file(response, &part, |downloaded| {
        reporter.downloading(pkg_name, version, downloaded, total_size);
    })
    .await;
    let (hasher, downloaded) = match streamed {
        Ok(done) => done,
        Err(e) => {
            tokio::fs::remove_file(&part).await.ok();
            return Err(e);
        }
    };

    reporter.verifying(pkg_name, version);
    let actual = Sha256Digest::from_hasher(hasher);

    if &actual != expected {
        tokio::fs::remove_file(&part).await.ok();
        return Err(DownloadError::HashMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }

    tokio::fs::rename(&part, dest).await?;
    tracing::debug!(bytes = downloaded, dest = %dest.display(), "archive verified");

    Ok(Fetched {
        path: dest.to_path_buf(),
        digest: actual,
        size: downloaded,
        from_cache: false,
    })
}

/// Write the response body to `part`, hashing as it goes.
async fn stream_to_file(
    response: reqwest::Response,
    part: &Path,
    mut progress: impl FnMut(u64),
) -> Result<(Sha256, u64), DownloadError> {
    let mut file = File::create(part).await?;
    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);
        downloaded += chunk.len() as u64;
        progress(downloaded);
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok((hasher, downloaded))
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
