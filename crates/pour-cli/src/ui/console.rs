//! Line-oriented console reporter.
//!
//! Step lines go to stderr so that `pour test` can keep the binary's own
//! output on stdout. On a terminal, download progress is redrawn in place.

use std::io::{IsTerminal, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossterm::queue;
use crossterm::style::{Print, Stylize};
use crossterm::terminal::{Clear, ClearType};
use pour_core::Reporter;
use pour_schema::{PackageName, Version};

use super::theme::{Theme, format_size};

/// Prints pipeline progress for a human at a terminal.
#[derive(Debug)]
pub struct ConsoleReporter {
    theme: Theme,
    quiet: bool,
    interactive: bool,
    progress_drawn: AtomicBool,
    last_percent: AtomicU64,
}

impl ConsoleReporter {
    /// Create a reporter; `quiet` keeps only results, warnings and failures.
    pub fn new(quiet: bool) -> Self {
        Self {
            theme: Theme::default(),
            quiet,
            interactive: std::io::stderr().is_terminal(),
            progress_drawn: AtomicBool::new(false),
            last_percent: AtomicU64::new(u64::MAX),
        }
    }

    fn line(&self, text: &str) {
        let mut err = std::io::stderr().lock();
        if self.progress_drawn.swap(false, Ordering::Relaxed) {
            let _ = queue!(err, Print('\r'), Clear(ClearType::CurrentLine));
        }
        let _ = writeln!(err, "{text}");
    }

    fn label(&self, name: &PackageName, version: &Version) -> String {
        format!(
            "{} {}",
            self.theme.paint(name.as_str(), self.theme.colors.package_name),
            self.theme.paint(version.as_str(), self.theme.colors.secondary)
        )
    }

    fn step(&self, name: &PackageName, version: &Version, what: &str) {
        if self.quiet {
            return;
        }
        self.line(&format!(
            "  {} {} {what}",
            self.theme.paint(self.theme.icons.step, self.theme.colors.active),
            self.label(name, version)
        ));
    }

    /// A final success line for work that did not go through the pipeline.
    pub fn success(&self, msg: &str) {
        self.line(&format!(
            "  {} {msg}",
            self.theme.paint(self.theme.icons.success, self.theme.colors.success)
        ));
    }
}

impl Reporter for ConsoleReporter {
    fn downloading(&self, name: &PackageName, version: &Version, current: u64, total: Option<u64>) {
        if self.quiet {
            return;
        }
        if current == 0 {
            self.last_percent.store(u64::MAX, Ordering::Relaxed);
            let size = total.map(|t| format!(" ({})", format_size(t))).unwrap_or_default();
            self.step(name, version, &format!("downloading{size}"));
            return;
        }
        let Some(total) = total.filter(|t| *t > 0) else {
            return;
        };
        if !self.interactive {
            return;
        }

        let percent = current.saturating_mul(100) / total;
        if self.last_percent.swap(percent, Ordering::Relaxed) == percent {
            return;
        }
        let mut err = std::io::stderr().lock();
        let _ = queue!(err, Print('\r'), Clear(ClearType::CurrentLine));
        let _ = write!(
            err,
            "    {} / {} {}",
            format_size(current),
            format_size(total),
            self.theme
                .paint(&format!("{percent}%"), self.theme.colors.secondary)
        );
        let _ = err.flush();
        self.progress_drawn.store(true, Ordering::Relaxed);
    }

    fn cached(&self, name: &PackageName, version: &Version) {
        self.step(name, version, "using cached archive");
    }

    fn verifying(&self, name: &PackageName, version: &Version) {
        self.step(name, version, "verifying sha256");
    }

    fn extracting(&self, name: &PackageName, version: &Version) {
        self.step(name, version, "extracting");
    }

    fn installing(&self, name: &PackageName, version: &Version) {
        self.step(name, version, "installing");
    }

    fn testing(&self, name: &PackageName, version: &Version, command: &str) {
        self.step(
            name,
            version,
            &format!(
                "testing {}",
                self.theme.paint(command, self.theme.colors.secondary)
            ),
        );
    }

    fn done(&self, name: &PackageName, version: &Version, detail: &str) {
        self.line(&format!(
            "  {} {} {detail}",
            self.theme.paint(self.theme.icons.success, self.theme.colors.success),
            self.label(name, version)
        ));
    }

    fn failed(&self, name: &PackageName, version: &Version, reason: &str) {
        self.line(&format!(
            "  {} {} {}",
            self.theme.paint(self.theme.icons.failure, self.theme.colors.error),
            self.label(name, version),
            reason.red()
        ));
    }

    fn warning(&self, msg: &str) {
        self.line(&format!(
            "  {} {}",
            self.theme.paint(self.theme.icons.warning, self.theme.colors.warning),
            msg.yellow()
        ));
    }
}
