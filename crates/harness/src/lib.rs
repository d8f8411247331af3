//! nRF91 Peripheral Power Harness
//!
//! Firmware for measuring the current draw and latency of the nRF9160 serial
//! peripherals. An operator picks a peripheral personality over the console,
//! then sends, receives or sleeps while a power analyser watches the rail.
//!
//! # Architecture
//!
//! ```text
//! Operator menu + diagnostics (menu, diag)
//!         ↓
//! Session + device dispatch (session, device)
//!         ↓
//! Drivers (drivers::*)
//!         ↓
//! Transfer state machine (transfer)
//!         ↓
//! Platform HAL traits (platform crate)
//!         ↓
//! nRF9160 registers (hardware, feature `hardware`)
//! ```
//!
//! # Features
//!
//! - `hardware` - Build for the nRF9160 non-secure partition
//! - `std` - Host build with `tracing` output and the simulated bench
//! - `defmt` - defmt logging
//!
//! # Hardware Target
//!
//! ```bash
//! cargo build --release --target thumbv8m.main-none-eabihf --features hardware
//! ```

#![cfg_attr(all(not(test), not(feature = "std")), no_std)]
// Upgrade relevant warns to deny; keep pedantic as warn (too noisy for firmware)
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Critical correctness: deny these
#![deny(clippy::await_holding_lock)] // holding a blocking Mutex across .await is a bug
#![deny(unsafe_op_in_unsafe_fn)]
// unsafe fn body is not implicitly unsafe block
// Logging discipline
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![warn(clippy::dbg_macro)] // dbg! should not be left in committed code
// Intentional allows for this codebase:
#![allow(clippy::module_name_repetitions)] // common in Rust crates; not a real issue
#![allow(clippy::missing_errors_doc)] // most errors are self-explanatory
// Pedantic lints too noisy for firmware application code:
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(async_fn_in_trait)]

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

pub mod config;
pub mod device;
pub mod diag;
pub mod drivers;
pub mod menu;
pub mod session;
pub mod transfer;

#[cfg(feature = "hardware")]
pub mod hardware;

pub use config::HarnessConfig;
pub use device::{Device, Profile};
pub use drivers::Rig;
pub use menu::Operator;
pub use session::{Session, TransferBuffers};
pub use transfer::{TransferMachine, WaitMode};

/// Install a `tracing` subscriber for host runs.
///
/// Honours `RUST_LOG`; defaults to `info`. Safe to call more than once.
#[cfg(feature = "std")]
pub fn init_host_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
