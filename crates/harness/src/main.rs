//! nRF91 Peripheral Power Harness - Main Entry Point
//!
//! Hardware-only entry point for the nRF9160 non-secure partition. A secure
//! image (TF-M or the SPM sample) must already be flashed to hand the
//! peripherals over.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::Delay;
use static_cell::ConstStaticCell;

use harness::hardware::{Fabric, LowPowerConsole, Port0, PowerBlock, Serial1};
use harness::{HarnessConfig, Operator, Rig, Session, TransferBuffers, TransferMachine};

// Logging and panic handler
use defmt_rtt as _;
use panic_probe as _;

// EasyDMA cannot read flash: the buffers must be in RAM.
static BUFFERS: ConstStaticCell<TransferBuffers> = ConstStaticCell::new(TransferBuffers::new());

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    // RTC1 time driver; the peripheral singletons are not used, the harness
    // drives registers directly.
    let _peripherals = embassy_nrf::init(embassy_nrf::config::Config::default());
    defmt::info!("nRF91 peripheral power harness v{=str}", env!("CARGO_PKG_VERSION"));

    let config = HarnessConfig::default();
    let mut pins = Port0::new();
    let console = LowPowerConsole::new(&mut pins);

    let machine = TransferMachine::new(Serial1::new(), config.wait_mode, config.timing.stop_ack);
    let rig = Rig::new(machine, pins, Fabric::new());
    let mut session = Session::new(rig, BUFFERS.take(), config);

    let mut operator = Operator::new(console, PowerBlock::new(), Delay);
    operator.greet();
    defmt::info!("console up, entering menu");

    loop {
        operator.cycle(&mut session).await;
    }
}
