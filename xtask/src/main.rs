// Desktop/tooling crate: unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod check;
mod flash;
mod test;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Application core of the nRF9160, non-secure partition.
pub const TARGET: &str = "thumbv8m.main-none-eabihf";
/// probe-rs chip name.
pub const CHIP: &str = "nRF9160_xxAA";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "nRF91 power harness development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the harness and flash it to the nRF9160 via probe-rs
    Flash {
        /// Build and flash release version
        #[arg(short, long)]
        release: bool,
        /// Compile out all defmt log strings (for current measurements)
        #[arg(long)]
        quiet: bool,
    },
    /// Check the hardware build, the no_std platform crate, clippy and fmt
    Check,
    /// Run host tests (unit, integration and doc)
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Flash { release, quiet } => flash::run(release, quiet),
        Commands::Check => check::run(),
        Commands::Test { unit, integration } => test::run(unit, integration),
    }
}
