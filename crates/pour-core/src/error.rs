//! Domain-specific errors for the install pipeline

use pour_schema::FormulaError;
use thiserror::Error;

use crate::io::download::DownloadError;
use crate::io::extract::ExtractError;

/// Every way an installation attempt can fail. All variants are terminal.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The formula could not be loaded or failed validation.
    #[error("Invalid formula: {0}")]
    Formula(#[from] FormulaError),

    /// The downloaded archive does not hash to the recorded checksum.
    #[error("Integrity check failed: expected sha256 {expected}, got {actual}")]
    Integrity {
        /// Digest recorded in the formula.
        expected: String,
        /// Digest of the bytes received.
        actual: String,
    },

    /// Transport or filesystem failure while fetching.
    #[error("Download failed: {0}")]
    Download(DownloadError),

    /// The archive could not be unpacked.
    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// The file named by the install action is not in the archive.
    #[error("'{name}' not found in {archive}")]
    MissingFile {
        /// Path requested by the install action.
        name: String,
        /// Archive file name it was looked up in.
        archive: String,
    },

    /// The post-install smoke test did not exit as expected.
    #[error(
        "Smoke test `{command}` {}, expected exit code {expected}{}",
        describe_exit(.actual),
        describe_stderr(.stderr)
    )]
    TestFailure {
        /// The command line that was run.
        command: String,
        /// Exit code that counts as a pass.
        expected: i32,
        /// Observed exit code; `None` when the process could not start or was killed.
        actual: Option<i32>,
        /// Trailing stderr of the process, or the spawn error.
        stderr: String,
    },

    /// Filesystem failure outside download and extraction.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure with a short description of the step that raised it.
    #[error("{context}: {message}")]
    Context {
        /// The step.
        context: &'static str,
        /// The underlying message.
        message: String,
    },
}

impl InstallError {
    /// Create an error with context for better debugging.
    pub fn context(ctx: &'static str, msg: impl std::fmt::Display) -> Self {
        Self::Context {
            context: ctx,
            message: msg.to_string(),
        }
    }
}

impl From<DownloadError> for InstallError {
    fn from(err: DownloadError) -> Self {
        match err {
            DownloadError::HashMismatch { expected, actual } => Self::Integrity { expected, actual },
            other => Self::Download(other),
        }
    }
}

fn describe_exit(actual: &Option<i32>) -> String {
    match actual {
        Some(code) => format!("exited with {code}"),
        None => "did not exit normally".to_string(),
    }
}

fn describe_stderr(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}
