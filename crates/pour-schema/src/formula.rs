//! TOML formula definition parsing
//!
//! A formula is authored once per release and never mutated afterwards; a new
//! release gets a new `version` and `sha256` pair.

use std::fs;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hash::Sha256Digest;
use crate::types::{ArtifactFormat, PackageName, Version};
use crate::{BIN_PLACEHOLDER, VERSION_PLACEHOLDER};

/// Errors that can occur when loading or validating a formula.
#[derive(Error, Debug)]
pub enum FormulaError {
    /// An I/O error occurred while reading a formula file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The TOML content could not be deserialized into a formula.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field is present but holds an unusable value.
    #[error("Invalid {field}: {reason}")]
    Invalid {
        /// Dotted path of the offending field (e.g. `source.url`).
        field: &'static str,
        /// Human-readable explanation.
        reason: String,
    },

    /// The resolved URL embeds a version segment that disagrees with `package.version`.
    #[error("URL embeds version {found} but formula declares {declared}")]
    VersionMismatch {
        /// The version declared in `[package]`.
        declared: String,
        /// The version-looking path segment found in the URL.
        found: String,
    },
}

impl FormulaError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Identity of the packaged software.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Unique name within a formula collection.
    pub name: PackageName,
    /// Release version.
    pub version: Version,
    /// Short human-readable summary.
    #[serde(default)]
    pub description: String,
    /// URL of the project's homepage.
    #[serde(default)]
    pub homepage: String,
}

/// Location and integrity information for the release archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Download URL, literal or containing `{{version}}`.
    pub url: String,
    /// Expected SHA-256 digest of the downloaded archive.
    pub sha256: Sha256Digest,
    /// Archive format; detected from the URL when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ArtifactFormat>,
}

/// Copy one named file from the unpacked archive into the binary directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallAction {
    /// Path of the file inside the unpacked archive; also the installed name's source.
    pub bin: String,
}

impl InstallAction {
    /// File name the binary gets inside the binary directory.
    pub fn installed_name(&self) -> &str {
        Path::new(&self.bin)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.bin)
    }
}

/// Post-install smoke test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestAction {
    /// Program and arguments. `{{bin}}` expands to the binary directory.
    pub command: Vec<String>,
    /// Exit status that counts as a pass.
    #[serde(default)]
    pub expected_exit_code: i32,
}

impl TestAction {
    /// The default test: run the installed binary with `-v`.
    pub fn version_flag(installed_name: &str) -> Self {
        Self {
            command: vec![format!("{BIN_PLACEHOLDER}/{installed_name}"), "-v".into()],
            expected_exit_code: 0,
        }
    }

    /// Expand `{{bin}}` against an explicit binary directory.
    pub fn argv(&self, bin_dir: &Path) -> Vec<String> {
        let bin = bin_dir.to_string_lossy();
        self.command
            .iter()
            .map(|arg| arg.replace(BIN_PLACEHOLDER, &bin))
            .collect()
    }
}

/// Complete formula: identity, source, install action and smoke test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formula {
    /// Identity metadata.
    pub package: PackageInfo,
    /// Where to fetch the archive and how to verify it.
    pub source: Source,
    /// Which file to install.
    pub install: InstallAction,
    /// Smoke test; defaults to `<bin> -v`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<TestAction>,
}

impl Formula {
    /// Parse and validate a formula from a TOML file on disk.
    ///
    /// # Errors
    ///
    /// Returns `FormulaError::Io` if the file cannot be read, or any parse or
    /// validation error from [`Formula::parse`].
    pub fn from_file(path: &Path) -> Result<Self, FormulaError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a formula from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `FormulaError::Parse` for malformed TOML or a malformed digest,
    /// and the errors of [`Formula::validate`] otherwise.
    pub fn parse(content: &str) -> Result<Self, FormulaError> {
        let formula: Self = toml::from_str(content)?;
        formula.validate()?;
        Ok(formula)
    }

    /// Check every authoring invariant that the type system does not already enforce.
    ///
    /// # Errors
    ///
    /// Returns `FormulaError::Invalid` naming the first bad field, or
    /// `FormulaError::VersionMismatch` when the URL disagrees with the version.
    pub fn validate(&self) -> Result<(), FormulaError> {
        if !self.package.name.is_valid() {
            return Err(FormulaError::invalid(
                "package.name",
                format!(
                    "'{}' must be non-empty and use only [a-z0-9._+-]",
                    self.package.name
                ),
            ));
        }
        if !self.package.version.is_well_formed() {
            return Err(FormulaError::invalid(
                "package.version",
                format!(
                    "'{}' must start with a digit and contain no spaces",
                    self.package.version
                ),
            ));
        }
        if !self.package.homepage.is_empty() && !is_http_url(&self.package.homepage) {
            return Err(FormulaError::invalid(
                "package.homepage",
                "must start with http:// or https://",
            ));
        }

        let url = self.resolved_url();
        if !is_http_url(&url) {
            return Err(FormulaError::invalid(
                "source.url",
                "must start with http:// or https://",
            ));
        }
        if url.contains("{{") {
            return Err(FormulaError::invalid(
                "source.url",
                format!("unknown placeholder in '{url}'"),
            ));
        }
        if self.archive_filename().is_empty() {
            return Err(FormulaError::invalid(
                "source.url",
                "must end with a file name",
            ));
        }
        self.check_url_version(&url)?;

        validate_relative_path(&self.install.bin)?;

        let test = self.test_action();
        if test.command.first().is_none_or(String::is_empty) {
            return Err(FormulaError::invalid(
                "test.command",
                "must name a program to run",
            ));
        }

        Ok(())
    }

    /// Resolve the download URL for this formula's version.
    pub fn resolved_url(&self) -> String {
        self.source
            .url
            .replace(VERSION_PLACEHOLDER, self.package.version.as_str())
    }

    /// Last path segment of the resolved URL (query and fragment dropped).
    pub fn archive_filename(&self) -> String {
        let url = self.resolved_url();
        let path = url.split(['?', '#']).next().unwrap_or_default();
        path.rsplit('/').next().unwrap_or_default().to_string()
    }

    /// Declared archive format, or the one implied by the URL.
    pub fn format(&self) -> ArtifactFormat {
        self.source
            .format
            .unwrap_or_else(|| ArtifactFormat::detect(&self.archive_filename()))
    }

    /// The smoke test to run, falling back to `<bin> -v`.
    pub fn test_action(&self) -> TestAction {
        self.test
            .clone()
            .unwrap_or_else(|| TestAction::version_flag(self.install.installed_name()))
    }

    fn check_url_version(&self, url: &str) -> Result<(), FormulaError> {
        let declared = self.package.version.as_str();
        let path = url
            .split_once("://")
            .map_or(url, |(_, rest)| rest)
            .split(['?', '#'])
            .next()
            .unwrap_or_default();

        // Only whole path segments shaped like a release tag ("0.1.0", "v0.1.0") count.
        let embedded: Vec<&str> = path
            .split('/')
            .skip(1)
            .map(|seg| seg.strip_prefix('v').unwrap_or(seg))
            .filter(|seg| semver::Version::parse(seg).is_ok())
            .collect();

        if embedded.is_empty() || embedded.contains(&declared) {
            return Ok(());
        }

        Err(FormulaError::VersionMismatch {
            declared: declared.to_string(),
            found: embedded[0].to_string(),
        })
    }
}

impl std::str::FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}

fn validate_relative_path(bin: &str) -> Result<(), FormulaError> {
    if bin.is_empty() {
        return Err(FormulaError::invalid("install.bin", "must not be empty"));
    }
    let path = Path::new(bin);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(FormulaError::invalid(
            "install.bin",
            format!("'{bin}' must be a relative path inside the archive"),
        ));
    }
    Ok(())
}
