use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

use crate::TARGET;

/// One `cargo` invocation in the check sequence.
struct Step {
    label: &'static str,
    args: &'static [&'static str],
    /// Failure aborts the sequence instead of printing a warning.
    required: bool,
}

const STEPS: &[Step] = &[
    Step {
        label: "hardware build (nRF9160)",
        args: &["check", "-p", "harness", "--target", TARGET, "--features", "hardware"],
        required: true,
    },
    Step {
        label: "host build (std)",
        args: &["check", "-p", "harness", "--features", "std"],
        required: true,
    },
    Step {
        label: "platform crate (no_std)",
        args: &["check", "-p", "platform", "--target", TARGET, "--no-default-features"],
        required: true,
    },
    Step {
        label: "clippy",
        args: &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        required: false,
    },
    Step {
        label: "formatting",
        args: &["fmt", "--all", "--check"],
        required: false,
    },
];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking harness builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for step in STEPS {
        println!("{}", format!("  Checking {}...", step.label).cyan());
        let start = Instant::now();

        let output = Command::new("cargo")
            .args(step.args)
            .output()
            .with_context(|| format!("Failed to run cargo for {}", step.label))?;

        if output.status.success() {
            println!(
                "{}",
                format!("  ✓ {} passed in {:.2}s", step.label, start.elapsed().as_secs_f64()).green()
            );
        } else if step.required {
            eprintln!("{}", format!("  ✗ {} failed", step.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{} failed", step.label);
        } else {
            eprintln!("{}", format!("  ⚠ {} reported issues", step.label).yellow().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        }
        println!();
    }

    println!(
        "{}",
        format!("✓ All checks completed in {:.2}s", total_start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    println!();

    Ok(())
}
