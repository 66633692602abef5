//! Shared types for pour formulas.
//!
//! A formula is a plain, immutable record: identity, a versioned source
//! location, an integrity fingerprint, an install action, and a smoke test.
//! The only I/O here is reading formula files and hashing local files; the
//! pipeline that consumes these records lives in `pour-core`.

pub mod formula;
pub mod hash;
pub mod types;

// Re-exports
pub use formula::{Formula, FormulaError, InstallAction, PackageInfo, Source, TestAction};
pub use hash::{DigestError, Sha256Digest};
pub use types::*;

/// Placeholder substituted with the formula version in source URLs.
pub const VERSION_PLACEHOLDER: &str = "{{version}}";

/// Placeholder substituted with the binary directory in test commands.
pub const BIN_PLACEHOLDER: &str = "{{bin}}";
