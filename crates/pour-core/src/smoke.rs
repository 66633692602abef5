//! Post-install smoke test.

use std::path::Path;
use std::process::Stdio;

use pour_schema::TestAction;
use tokio::process::Command;

use crate::InstallError;

/// Bytes of stderr kept for the failure message.
const STDERR_TAIL: usize = 2048;

/// A passing smoke test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeOutcome {
    /// The command line that ran, `{{bin}}` expanded.
    pub command: String,
    /// Its exit code (equal to the expected one).
    pub exit_code: i32,
    /// Captured stdout, for display only.
    pub stdout: String,
}

/// Run `test` with `{{bin}}` bound to `bin_dir`.
///
/// # Errors
///
/// Returns `InstallError::TestFailure` when the process cannot be started,
/// is killed by a signal, or exits with a code other than the expected one.
pub async fn run(test: &TestAction, bin_dir: &Path) -> Result<SmokeOutcome, InstallError> {
    let argv = test.argv(bin_dir);
    let command = argv.join(" ");
    let Some((program, args)) = argv.split_first() else {
        return Err(InstallError::TestFailure {
            command,
            expected: test.expected_exit_code,
            actual: None,
            stderr: "empty test command".to_string(),
        });
    };

    tracing::info!(%command, "running smoke test");

    let output = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            return Err(InstallError::TestFailure {
                command,
                expected: test.expected_exit_code,
                actual: None,
                stderr: e.to_string(),
            });
        }
    };

    let actual = output.status.code();
    tracing::debug!(%command, ?actual, "smoke test finished");

    if actual != Some(test.expected_exit_code) {
        return Err(InstallError::TestFailure {
            command,
            expected: test.expected_exit_code,
            actual,
            stderr: tail(&output.stderr),
        });
    }

    Ok(SmokeOutcome {
        command,
        exit_code: test.expected_exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
    })
}

fn tail(bytes: &[u8]) -> String {
    let start = bytes.len().saturating_sub(STDERR_TAIL);
    String::from_utf8_lossy(&bytes[start..]).trim().to_string()
}
