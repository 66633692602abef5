//! Check command

use anyhow::{Result, bail};
use crossterm::style::Stylize;
use std::path::PathBuf;

use crate::ui::ConsoleReporter;

/// Validate formula files and print what each one would install.
pub fn check(formulas: &[PathBuf]) -> Result<()> {
    let console = ConsoleReporter::new(false);
    let mut invalid = 0usize;

    for path in formulas {
        let formula = match super::load_formula(path) {
            Ok(formula) => formula,
            Err(e) => {
                println!("{} {}: {e:#}", "✗".red(), path.display());
                invalid += 1;
                continue;
            }
        };

        console.success(&format!("{} is valid", path.display()));
        let lw = 10;
        println!("  {:<lw$}{}", "name", formula.package.name);
        println!("  {:<lw$}{}", "version", formula.package.version);
        println!("  {:<lw$}{}", "url", formula.resolved_url());
        println!("  {:<lw$}{}", "sha256", formula.source.sha256);
        println!("  {:<lw$}{}", "format", formula.format());
        println!("  {:<lw$}{}", "bin", formula.install.bin);
        println!("  {:<lw$}{}", "test", formula.test_action().command.join(" "));

        if formula.package.description.is_empty() {
            println!("  {} missing description", "⚠".yellow());
        }
        if formula.package.homepage.is_empty() {
            println!("  {} missing homepage", "⚠".yellow());
        }
    }

    if invalid > 0 {
        bail!("{invalid} of {} formula(s) invalid", formulas.len());
    }
    Ok(())
}
