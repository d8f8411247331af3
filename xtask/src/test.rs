use anyhow::{Context, Result};
use colored::Colorize;
use std::process::{Command, Output};
use std::time::Instant;

/// Harness integration test binaries under `crates/harness/tests`.
const INTEGRATION_SUITES: &[&str] = &["integration_drivers", "integration_menu"];

pub fn run(unit_only: bool, integration_only: bool) -> Result<()> {
    println!();
    println!("{}", "🧪 Running host tests...".cyan().bold());
    println!();

    let total_start = Instant::now();

    if !integration_only {
        println!("{}", "  Running unit tests...".cyan());
        let start = Instant::now();
        let output = cargo(&["test", "--lib", "--workspace"]).context("Failed to run unit tests")?;
        report("Unit tests", &output, start)?;
    }

    if !unit_only {
        for suite in INTEGRATION_SUITES {
            println!("{}", format!("  Running {suite}...").cyan());
            let start = Instant::now();
            let output = cargo(&["test", "-p", "harness", "--test", suite])
                .with_context(|| format!("Failed to run {suite}"))?;
            report(suite, &output, start)?;
        }
    }

    println!("{}", "  Running doc tests...".cyan());
    let start = Instant::now();
    let output = cargo(&["test", "--doc", "--workspace"]).context("Failed to run doc tests")?;
    if output.status.success() {
        let summary = extract_test_summary(&String::from_utf8_lossy(&output.stdout));
        println!(
            "{}",
            format!("  ✓ Doc tests passed {} in {:.2}s", summary, start.elapsed().as_secs_f64()).green()
        );
    } else {
        // Doc failures are reported but do not fail the run.
        eprintln!("{}", "  ⚠ Doc tests failed".yellow().bold());
    }
    println!();

    println!(
        "{}",
        format!("✓ All tests completed in {:.2}s", total_start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    println!();

    Ok(())
}

fn cargo(args: &[&str]) -> std::io::Result<Output> {
    Command::new("cargo").args(args).output()
}

fn report(what: &str, output: &Output, start: Instant) -> Result<()> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !output.status.success() {
        eprintln!("{}", format!("  ✗ {what} failed").red().bold());
        eprintln!();
        for line in stdout.lines() {
            eprintln!("  {}", line);
        }
        anyhow::bail!("{what} failed");
    }
    println!(
        "{}",
        format!(
            "  ✓ {what} passed {} in {:.2}s",
            extract_test_summary(&stdout),
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();
    Ok(())
}

fn extract_test_summary(output: &str) -> String {
    // "test result: ok. 5 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out"
    for line in output.lines() {
        if let Some(summary) = line.split("test result:").nth(1) {
            return summary.trim().to_string();
        }
    }
    "(summary not available)".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_is_taken_from_result_line() {
        let out = "running 3 tests\ntest result: ok. 3 passed; 0 failed\n";
        assert_eq!(extract_test_summary(out), "ok. 3 passed; 0 failed");
    }

    #[test]
    fn missing_summary_is_reported() {
        assert_eq!(extract_test_summary("nothing here"), "(summary not available)");
    }
}
