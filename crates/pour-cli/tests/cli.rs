//! End-to-end tests of the `pour` command-line binary.
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const GETAWSLOG_SHA256: &str = "ff03bc58610a4213a7c94cfeb37b4907f2777499ae0438f2696c6a69d63e2c61";

/// Test context with a private prefix and binary directory
struct TestContext {
    temp_dir: TempDir,
    prefix: PathBuf,
    bin_dir: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let prefix = temp_dir.path().join(".pour");
        let bin_dir = temp_dir.path().join("bin");
        Self {
            temp_dir,
            prefix,
            bin_dir,
        }
    }

    fn pour_cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_pour"));
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("POUR_HOME", &self.prefix);
        cmd.env("POUR_BIN_DIR", &self.bin_dir);
        cmd.env_remove("RUST_LOG");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.pour_cmd()
            .args(args)
            .output()
            .expect("failed to run pour")
    }

    fn write_formula(&self, name: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, content).expect("failed to write formula");
        path
    }
}

fn reference_formula() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../formula/getawslog.toml")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// A formula for a raw (unarchived) binary served by `base_url`.
fn raw_formula(base_url: &str, sha256: &str) -> String {
    format!(
        r#"
[package]
name = "getawslog"
version = "0.1.0"
description = "AWS assume role credential wrapper"
homepage = "https://github.com/masahide/getawslog"

[source]
url = "{base_url}/download/v{{{{version}}}}/getawslog"
sha256 = "{sha256}"

[install]
bin = "getawslog"
"#
    )
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.run(&["--help"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("Usage:"));
    assert!(out.contains("install"));
}

#[test]
fn test_version_command() {
    let ctx = TestContext::new();
    let output = ctx.run(&["--version"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("pour "));
}

#[test]
fn test_check_reference_formula() {
    let ctx = TestContext::new();
    let formula = reference_formula();
    let output = ctx.run(&["check", formula.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("getawslog"));
    assert!(out.contains(
        "https://github.com/masahide/getawslog/releases/download/v0.1.0/getawslog_Darwin_x86_64.tar.gz"
    ));
    assert!(out.contains(GETAWSLOG_SHA256));
    assert!(out.contains("{{bin}}/getawslog -v"));
    // Checking never touches the prefix.
    assert!(!ctx.prefix.exists());
}

#[test]
fn test_check_rejects_bad_checksum_length() {
    let ctx = TestContext::new();
    let content = std::fs::read_to_string(reference_formula())
        .unwrap()
        .replace(GETAWSLOG_SHA256, &format!("{GETAWSLOG_SHA256}0"));
    let path = ctx.write_formula("bad.toml", &content);

    let output = ctx.run(&["check", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("65"));
}

#[test]
fn test_hash_command() {
    let ctx = TestContext::new();
    let path = ctx.write_formula("payload.bin", "hello");

    let output = ctx.run(&["hash", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with(
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824  "
    ));
}

#[test]
fn test_info_not_installed() {
    let ctx = TestContext::new();
    let formula = reference_formula();
    let output = ctx.run(&["info", formula.to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("not installed"));
}

#[cfg(unix)]
#[test]
fn test_install_then_info_and_test() {
    let script = b"#!/bin/sh\nif [ \"$1\" = \"-v\" ]; then echo \"getawslog 0.1.0\"; exit 0; fi\nexit 1\n";
    let digest = pour_schema::Sha256Digest::compute(script);

    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/download/v0.1.0/getawslog")
        .with_status(200)
        .with_body(script.as_slice())
        .expect(1)
        .create();

    let ctx = TestContext::new();
    let path = ctx.write_formula("getawslog.toml", &raw_formula(&server.url(), digest.as_str()));
    let path = path.to_str().unwrap();

    let output = ctx.run(&["install", path]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(ctx.bin_dir.join("getawslog").is_file());
    assert!(ctx.prefix.join("receipts/getawslog.json").is_file());
    mock.assert();

    let output = ctx.run(&["info", path]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("installed 0.1.0"));

    let output = ctx.run(&["test", path]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).trim(), "getawslog 0.1.0");
}

#[test]
fn test_install_checksum_mismatch_fails() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/download/v0.1.0/getawslog")
        .with_status(200)
        .with_body("tampered")
        .create();

    let ctx = TestContext::new();
    let path = ctx.write_formula(
        "getawslog.toml",
        &raw_formula(&server.url(), GETAWSLOG_SHA256),
    );

    let output = ctx.run(&["install", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Integrity check failed"));
    assert!(!ctx.bin_dir.exists());
}

#[cfg(unix)]
#[test]
fn test_failed_smoke_test_is_not_reported_installed() {
    let script = b"#!/bin/sh\necho \"flag provided but not defined: $1\" >&2\nexit 2\n";
    let digest = pour_schema::Sha256Digest::compute(script);

    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/download/v0.1.0/getawslog")
        .with_status(200)
        .with_body(script.as_slice())
        .create();

    let ctx = TestContext::new();
    let path = ctx.write_formula("getawslog.toml", &raw_formula(&server.url(), digest.as_str()));
    let path = path.to_str().unwrap();

    let output = ctx.run(&["install", path]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Smoke test"));
    assert!(ctx.bin_dir.join("getawslog").is_file());
    assert!(!ctx.prefix.join("receipts/getawslog.json").exists());

    let output = ctx.run(&["info", path]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("unverified"));
}
