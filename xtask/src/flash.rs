use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

use crate::{CHIP, TARGET};

fn binary_path(release: bool) -> String {
    let profile = if release { "release" } else { "debug" };
    format!("target/{TARGET}/{profile}/harness")
}

pub fn run(release: bool, quiet: bool) -> Result<()> {
    let mode = if release { "release" } else { "debug" };

    println!();
    println!("{}", format!("🔨 Building harness ({} mode)...", mode).cyan().bold());
    if quiet {
        println!("   {}", "DEFMT_LOG=off: no RTT output, probe can be detached".dimmed());
    }
    println!();

    let build_start = Instant::now();
    let mut build_cmd = Command::new("cargo");
    build_cmd
        .args(["build", "-p", "harness", "--target", TARGET, "--features", "hardware"]);
    if release {
        build_cmd.arg("--release");
    }
    if quiet {
        build_cmd.env("DEFMT_LOG", "off");
    }

    let build_output = build_cmd.output().context("Failed to run cargo build")?;

    if !build_output.status.success() {
        eprintln!("{}", "✗ Build failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&build_output.stderr));
        anyhow::bail!("Build failed");
    }

    println!(
        "{}",
        format!("✓ Build successful in {:.2}s", build_start.elapsed().as_secs_f64()).green()
    );
    println!();

    show_binary_size(release);
    println!();

    // The non-secure image needs the secure partition already on the chip.
    println!("{}", format!("📡 Flashing to {CHIP}...").cyan().bold());
    println!("   {}", "Connecting to probe...".dimmed());

    let flash_start = Instant::now();
    let flash_output = Command::new("probe-rs")
        .args(["download", "--chip", CHIP, "--probe-index", "0"])
        .arg(binary_path(release))
        .output()
        .context("Failed to run probe-rs. Is probe-rs installed? (cargo install probe-rs-tools)")?;

    if !flash_output.status.success() {
        eprintln!("{}", "✗ Flash failed".red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&flash_output.stderr));
        anyhow::bail!("Flash failed - check that the probe is connected and the secure partition is present");
    }

    println!(
        "{}",
        format!("✓ Flash successful in {:.2}s", flash_start.elapsed().as_secs_f64()).green()
    );
    println!();
    println!("{}", "The harness menu is on UARTE0 (P0.29 TX, P0.28 RX, 115200 8N1).".bold());
    if !quiet {
        println!("   {}", format!("Use 'probe-rs attach --chip {CHIP} {}' for RTT logs", binary_path(release)).dimmed());
    }
    println!();

    Ok(())
}

fn show_binary_size(release: bool) {
    let output = Command::new("rust-size").arg(binary_path(release)).arg("-A").output();

    if let Ok(out) = output {
        if out.status.success() {
            println!("{}", "📊 Binary size:".cyan());
            for line in String::from_utf8_lossy(&out.stdout).lines() {
                println!("   {}", line.dimmed());
            }
        }
    }
}
