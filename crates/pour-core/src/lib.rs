//! Core library for pour.
//!
//! Consumes a [`Formula`](pour_schema::Formula) and runs the fixed host
//! pipeline: resolve, fetch, verify, extract, install, test. Every step is a
//! hard gate; the first failure aborts the install.

pub mod error;
pub mod install;
pub mod io;
pub mod paths;
pub mod pipeline;
pub mod receipt;
pub mod reporter;
pub mod smoke;

pub use error::InstallError;
pub use paths::Layout;
pub use pipeline::{Pipeline, test_installed};
pub use receipt::InstallReceipt;
pub use reporter::{NullReporter, Reporter};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("pour/", env!("CARGO_PKG_VERSION"));
