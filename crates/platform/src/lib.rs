//! Hardware Abstraction Layer for the nRF91 peripheral power harness
//!
//! This crate provides trait-based abstractions for the peripherals the
//! harness exercises, so the transfer logic can be developed and tested
//! without a board on the desk.
//!
//! # Architecture Layers
//!
//! ```text
//! Operator menu + diagnostics (harness crate)
//!         ↓
//! Transfer state machine + drivers (harness crate)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Raw nRF9160 registers (harness `hardware` module)
//! ```
//!
//! # Abstractions
//!
//! - [`TransferEngine`] - EasyDMA serial block (SPIM/SPIS/TWIM/TWIS/UARTE)
//! - [`PinBank`] - GPIO port pin configuration and levels
//! - [`EventRouter`] - GPIOTE edge watches, DPPI channels, idle timer
//! - [`PowerControl`] - SoC constant-latency / low-power switch
//! - [`Console`] - low-power operator console
//! - [`CompletionSignal`] - interrupt to task completion latch
//!
//! # Features
//!
//! - `std`: Enable standard library support and the simulated bench
//! - `defmt`: Enable defmt logging
//!
//! # Example
//!
//! ```no_run
//! use platform::{Task, TransferEngine};
//!
//! fn kick<E: TransferEngine>(engine: &mut E, data: &'static [u8]) {
//!     engine.completion().arm();
//!     // SAFETY: `data` is 'static and never written.
//!     unsafe { engine.load_tx(data) };
//!     engine.trigger(Task::StartTx);
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(async_fn_in_trait)] // Embassy no_std: single-threaded, Send bounds not needed

pub mod completion;
pub mod console;
pub mod engine;
pub mod gpio;
pub mod payload;
pub mod peripheral;
pub mod power;
pub mod routing;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

// Re-export main traits
pub use completion::{Completion, CompletionSignal};
pub use console::Console;
pub use engine::{Direction, EngineConfig, Task, TransferEngine, TransferError};
pub use power::{PowerControl, PowerMode};
pub use routing::{Channel, EventRouter, Polarity, Slot};

// Re-export GPIO types
pub use gpio::{Drive, Level, PinBank, PinConfig, PinDirection, Pull, Sense};

// Re-export peripheral types
pub use peripheral::{Bitrate, PeripheralKind, PinRoles, SpiMode};

// Re-export payload helpers
pub use payload::{fill_pattern, stamp_length, validate, RxReport};
