//! Interrupt vector bindings.
//!
//! The vectors are emitted by `bind_interrupts!`; nothing needs to name
//! [`Irqs`] for them to be linked.

use embassy_nrf::interrupt::typelevel::{self, Handler};

use super::{console, routing, serial};

/// SERIAL1 handler.
pub struct Serial1Handler;

impl Handler<typelevel::UARTE1_SPIM1_SPIS1_TWIM1_TWIS1> for Serial1Handler {
    unsafe fn on_interrupt() {
        serial::on_serial1_interrupt();
    }
}

/// GPIOTE1 handler.
pub struct GpioteHandler;

impl Handler<typelevel::GPIOTE1> for GpioteHandler {
    unsafe fn on_interrupt() {
        routing::on_gpiote_interrupt();
    }
}

/// Console handler.
pub struct ConsoleHandler;

impl Handler<typelevel::UARTE0_SPIM0_SPIS0_TWIM0_TWIS0> for ConsoleHandler {
    unsafe fn on_interrupt() {
        console::on_console_interrupt();
    }
}

embassy_nrf::bind_interrupts!(pub struct Irqs {
    UARTE1_SPIM1_SPIS1_TWIM1_TWIS1 => Serial1Handler;
    GPIOTE1 => GpioteHandler;
    UARTE0_SPIM0_SPIS0_TWIM0_TWIS0 => ConsoleHandler;
});
