//! Command implementations

pub mod check;
pub mod hash;
pub mod info;
pub mod install;

use anyhow::{Context, Result};
use pour_schema::Formula;
use std::path::Path;

/// Load and validate a formula file.
pub(crate) fn load_formula(path: &Path) -> Result<Formula> {
    Formula::from_file(path).with_context(|| format!("Invalid formula {}", path.display()))
}

/// HTTP client shared by the network commands.
pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(pour_core::USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}
