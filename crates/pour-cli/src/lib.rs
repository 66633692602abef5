//! pour - install prebuilt binaries from checksummed formulas
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! A formula is a small TOML file naming one release archive, its SHA-256
//! digest, the executable inside it and a command that proves the installed
//! binary runs. `pour install` carries it through the fixed pipeline
//! provided by `pour_core`.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.pour/
//! ├── bin/        # Installed binaries (or $POUR_BIN_DIR)
//! ├── cache/      # Verified archives, keyed by digest
//! ├── tmp/        # Extraction staging
//! └── receipts/   # One JSON receipt per installed package
//! ```

pub mod cmd;
pub mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pour_core::Layout;
use pour_core::paths::{BIN_DIR_ENV, HOME_ENV, try_pour_home};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pour")]
#[command(author, version, about = "pour - install prebuilt binaries from checksummed formulas")]
pub struct Cli {
    /// Root directory for cache, receipts and the default bin dir
    #[arg(long, global = true, env = HOME_ENV, value_name = "DIR")]
    pub prefix: Option<PathBuf>,

    /// Directory installed binaries are placed in
    #[arg(long, global = true, env = BIN_DIR_ENV, value_name = "DIR")]
    pub bin_dir: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install formulas: fetch, verify, extract, install and smoke test
    Install {
        /// Formula file(s)
        #[arg(required = true)]
        formulas: Vec<PathBuf>,
    },
    /// Run a formula's smoke test against the installed binary
    Test {
        /// Formula file
        formula: PathBuf,
    },
    /// Validate formula files without installing anything
    Check {
        /// Formula file(s)
        #[arg(required = true)]
        formulas: Vec<PathBuf>,
    },
    /// Compute SHA256 hash of a file (for formula authoring)
    Hash {
        /// Files to hash
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Show a formula and its install state
    Info {
        /// Formula file
        formula: PathBuf,
    },
}

impl Cli {
    /// Resolve the directories to work in from flags, environment and home.
    pub fn layout(&self) -> Result<Layout> {
        let prefix = self
            .prefix
            .clone()
            .or_else(try_pour_home)
            .with_context(|| format!("Could not determine home directory; set {HOME_ENV}"))?;

        let layout = Layout::new(prefix);
        Ok(match &self.bin_dir {
            Some(bin_dir) => layout.with_bin_dir(bin_dir),
            None => layout,
        })
    }
}
