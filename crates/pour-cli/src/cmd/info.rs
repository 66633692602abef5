//! Info command

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use pour_core::{InstallReceipt, Layout};
use std::path::Path;

/// Show a formula together with its receipt, if it has been installed.
pub fn info(formula: &Path, layout: &Layout) -> Result<()> {
    let formula = super::load_formula(formula)?;
    let pkg = &formula.package;
    let receipt = InstallReceipt::load(layout, &pkg.name)
        .with_context(|| format!("Failed to read receipt for {}", pkg.name))?;

    let lw = 12;

    println!();
    println!(
        "  {} {}",
        pkg.name.as_str().white().bold(),
        pkg.version.as_str().dark_grey()
    );
    if !pkg.description.is_empty() {
        println!("  {}", pkg.description);
    }
    println!();

    if !pkg.homepage.is_empty() {
        println!("  {:<lw$}{}", "homepage", pkg.homepage);
    }
    println!("  {:<lw$}{}", "url", formula.resolved_url());
    println!("  {:<lw$}{}", "sha256", formula.source.sha256);

    let Some(receipt) = receipt else {
        let binary = layout.bin_dir.join(formula.install.installed_name());
        if binary.exists() {
            println!(
                "  {:<lw$}{}",
                "status",
                "present but unverified (last install failed)".yellow()
            );
            println!("  {:<lw$}{}", "path", binary.display());
        } else {
            println!("  {:<lw$}{}", "status", "not installed".dark_grey());
        }
        println!();
        return Ok(());
    };

    let mut status = format!("installed {}", receipt.version).green().to_string();
    if receipt.version != pkg.version {
        status = format!("installed {} (formula is {})", receipt.version, pkg.version)
            .yellow()
            .to_string();
    }
    println!("  {:<lw$}{status}", "status");
    println!("  {:<lw$}{}", "path", receipt.installed.display());
    println!(
        "  {:<lw$}{}",
        "date",
        receipt.installed_at.format("%Y-%m-%d %H:%M UTC")
    );

    if !receipt.installed.exists() {
        println!("  {} binary is missing from disk", "⚠".yellow());
    } else if !layout.is_in_bin_dir(&receipt.installed) {
        println!(
            "  {} installed outside {}",
            "⚠".yellow(),
            layout.bin_dir.display()
        );
    }
    println!();

    Ok(())
}
