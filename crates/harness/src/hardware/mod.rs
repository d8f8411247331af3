//! nRF9160 hardware bindings.
//!
//! | Block   | Role                                    |
//! |---------|-----------------------------------------|
//! | SERIAL1 | [`Serial1`], the transfer engine        |
//! | P0      | [`Port0`]                               |
//! | GPIOTE1 | edge watches and PORT, in [`Fabric`]    |
//! | DPPIC   | event to task channels, in [`Fabric`]   |
//! | TIMER0  | UART idle timeout, in [`Fabric`]        |
//! | POWER   | [`PowerBlock`]                          |
//! | UARTE0  | [`LowPowerConsole`]                     |
//!
//! RTC1 belongs to the embassy time driver.

pub mod console;
#[allow(missing_docs)] // generated by bind_interrupts!
pub mod irq;
pub mod pins;
pub mod power;
pub mod regs;
pub mod routing;
pub mod serial;

pub use console::LowPowerConsole;
pub use pins::Port0;
pub use power::PowerBlock;
pub use routing::Fabric;
pub use serial::{Serial1, SERIAL1_DONE};
