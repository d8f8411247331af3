//! Shared bench setup for the harness integration tests.
#![allow(dead_code)]

use embassy_time::Duration;
use harness::{HarnessConfig, Rig, Session, TransferBuffers, TransferMachine};
use platform::mocks::{MockBench, MockEngine, MockPins, MockRouter};
use platform::CompletionSignal;

pub type BenchRig = Rig<MockEngine, MockPins, MockRouter>;
pub type BenchSession = Session<'static, MockEngine, MockPins, MockRouter>;

/// Install a test subscriber so `RUST_LOG=trace` shows the bench log.
pub fn logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Bench wiring with zero settle and lead-in delays and short windows.
pub fn fast_config() -> HarnessConfig {
    let mut config = HarnessConfig::instant();
    config.timing.twi_slave_window = Duration::from_millis(50);
    config.timing.uart_rx_window = Duration::from_millis(50);
    config.timing.stop_ack = Duration::from_millis(20);
    config
}

/// A rig over the bench with its own completion latch.
pub fn rig(bench: &MockBench, config: &HarnessConfig) -> BenchRig {
    let signal: &'static CompletionSignal = Box::leak(Box::new(CompletionSignal::new()));
    let machine = TransferMachine::new(bench.engine(signal), config.wait_mode, config.timing.stop_ack);
    Rig::new(machine, bench.pins(), bench.router())
}

/// A session over the bench.
pub fn session(bench: &MockBench, config: HarnessConfig) -> BenchSession {
    logging();
    let buffers: &'static mut TransferBuffers = Box::leak(Box::new(TransferBuffers::new()));
    Session::new(rig(bench, &config), buffers, config)
}

/// Size-stamped pattern payload, as a well-behaved peer sends it.
pub fn peer_payload(len: usize) -> Vec<u8> {
    let mut payload = vec![0u8; len];
    platform::fill_pattern(&mut payload);
    assert!(platform::stamp_length(&mut payload, len));
    payload
}

/// Index of the first op matching `pred`, panicking with `what` otherwise.
pub fn position<T>(ops: &[T], what: &str, pred: impl Fn(&T) -> bool) -> usize {
    ops.iter()
        .position(pred)
        .unwrap_or_else(|| panic!("{what} not recorded"))
}
