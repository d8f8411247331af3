//! Operator menu flows, driven by scripted key presses.
// Integration test file: expect/unwrap/panic are intentional test mechanisms.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
//!
//! Run with: cargo test -p harness --test integration_menu

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{fast_config, peer_payload, session, BenchSession};
use embedded_hal_async::delay::DelayNs;
use harness::diag::{GREEN, NORMAL, RED};
use harness::menu::{DEVICE_MENU, ESC};
use harness::{HarnessConfig, Operator};
use platform::mocks::{MockBench, MockConsole, MockPower, Response};
use platform::{PeripheralKind, PowerMode};

type BenchOperator<D> = Operator<MockConsole, MockPower, D>;

/// Records every millisecond pause instead of sleeping.
#[derive(Clone, Default)]
struct RecordingDelay {
    pauses: Arc<Mutex<Vec<u32>>>,
}

impl RecordingDelay {
    fn pauses(&self) -> Vec<u32> {
        self.pauses.lock().unwrap().clone()
    }
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.pauses.lock().unwrap().push(ns / 1_000_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.pauses.lock().unwrap().push(ms);
    }
}

fn bench_with(config: HarnessConfig) -> (MockBench, BenchSession, BenchOperator<embassy_time::Delay>) {
    let bench = MockBench::new();
    let session = session(&bench, config);
    let operator = Operator::new(bench.console(), bench.power(), embassy_time::Delay);
    (bench, session, operator)
}

/// Run one full select/test/disable cycle, failing if it waits for a key
/// that was never queued.
async fn cycle<D: DelayNs>(operator: &mut BenchOperator<D>, session: &mut BenchSession) {
    tokio::time::timeout(Duration::from_secs(5), operator.cycle(session))
        .await
        .expect("menu waited for a key that was never pressed");
}

/// Select SPI master @ 1 Mbps, send 1 KiB, disable.
#[tokio::test]
async fn test_spi_master_send_flow() {
    let (bench, mut session, mut operator) = bench_with(fast_config());
    bench.push_keys(&[b'd', b'3', ESC]);

    operator.greet();
    cycle(&mut operator, &mut session).await;

    let out = bench.console_output();
    assert!(out.starts_with("Sample has started\n"));
    assert!(out.contains("\nSelect peripheral:\n"));
    assert!(out.contains("  d. SPI master @ 1 Mbps\n"));
    assert!(out.contains("  ]. Low power mode (disable clock while idle)\n"));
    assert!(out.contains("Selected device 'SPI master @ 1 Mbps'\n"));
    assert!(out.contains("    SCK     P0.06\n"));
    assert!(out.contains("    CS      P0.07\n"));
    assert!(out.contains("  7. Receive 8 kbytes\n  Esc. Disable device\n"));
    assert!(out.contains("Selected test 'Send 1024 bytes'\n"));
    assert!(out.contains(&format!("Send 1024 bytes {GREEN}OK{NORMAL}\n")));
    assert!(out.contains("Disable device\n"));
    assert!(out.ends_with("'SPI master @ 1 Mbps' disabled\n"));
    assert_eq!(session.kind(), PeripheralKind::None);
    assert_eq!(bench.peer_received().len(), 1024);
}

/// '[' and ']' switch the POWER sub-mode without leaving the menu.
#[tokio::test]
async fn test_power_mode_keys() {
    let (bench, mut session, mut operator) = bench_with(fast_config());
    bench.push_keys(&[b'[', b']', b'[', b'a', ESC]);

    cycle(&mut operator, &mut session).await;

    let out = bench.console_output();
    assert!(out.contains("Switching to Constant latency mode\n"));
    assert!(out.contains("Switching to low power mode\n"));
    assert_eq!(bench.power_mode(), Some(PowerMode::ConstantLatency));
    assert_eq!(out.matches("\nSelect peripheral:\n").count(), 4);
    assert!(out.contains("Selected device 'None (measure idle power)'\n"));
}

/// Unknown keys are reported and the menu is shown again.
#[tokio::test]
async fn test_invalid_keys_reprompt() {
    let (bench, mut session, mut operator) = bench_with(fast_config());
    bench.push_keys(&[b'z', b'a', b'9', b'1', ESC]);

    cycle(&mut operator, &mut session).await;

    let out = bench.console_output();
    assert!(out.contains("Invalid selection 'z'\n"));
    assert!(out.contains("Invalid selection '9'\n"));
    assert!(out.contains("Selected test 'Sleep 10 s'\nTest done\n"));
    assert_eq!(out.matches("\nSelect test:\n").count(), 3);
}

/// Low-power UART receive prints the summary line and OK.
#[tokio::test]
async fn test_low_power_receive_report() {
    let (bench, mut session, mut operator) = bench_with(fast_config());
    bench.set_peer_payload(peer_payload(16));
    bench.push_keys(&[b'k', b'5', ESC]);

    cycle(&mut operator, &mut session).await;

    let out = bench.console_output();
    assert!(out.contains("    REQ     P0.02\n"));
    assert!(out.contains("    RDY     P0.03\n"));
    assert!(out.contains(&format!(
        "Received 16 bytes 00100203 04050607 ... {GREEN}OK{NORMAL}\n"
    )));
    assert!(!bench.engine_powered());
}

/// A short receive is flagged with the count it got.
#[tokio::test]
async fn test_short_receive_is_flagged() {
    let (bench, mut session, mut operator) = bench_with(fast_config());
    bench.set_peer_payload(peer_payload(10));
    bench.push_keys(&[b'h', b'5', ESC]);

    cycle(&mut operator, &mut session).await;

    let out = bench.console_output();
    assert!(out.contains(&format!("Received 10 bytes 000a0203 04050607 ... {RED}Instead of 16 bytes{NORMAL}\n")));
}

/// A bus error is printed as its negated ERRORSRC.
#[tokio::test]
async fn test_bus_error_is_printed() {
    let (bench, mut session, mut operator) = bench_with(fast_config());
    bench.set_response(Response::Fault(0x2));
    bench.push_keys(&[b'l', b'2', ESC]);

    cycle(&mut operator, &mut session).await;

    let out = bench.console_output();
    assert!(out.contains(&format!("{RED}Test returned -2{NORMAL}\n")));
    assert!(out.ends_with("'TWI master @ 100 kbps' disabled\n"));
}

/// An ERROR with an empty ERRORSRC still prints a failure code.
#[tokio::test]
async fn test_sourceless_bus_error_is_not_zero() {
    let (bench, mut session, mut operator) = bench_with(fast_config());
    bench.set_response(Response::Fault(0));
    bench.push_keys(&[b'l', b'2', ESC]);

    cycle(&mut operator, &mut session).await;

    let out = bench.console_output();
    assert!(out.contains(&format!("{RED}Test returned -5{NORMAL}\n")));
    assert!(!out.contains("Test returned 0"));
}

/// Every menu entry brings its device up on the bench and releases it.
#[test]
fn test_every_menu_entry_initialises() {
    let bench = MockBench::new();
    let mut session = session(&bench, fast_config());
    for entry in &DEVICE_MENU {
        session
            .select(entry.profile)
            .unwrap_or_else(|err| panic!("'{}' failed with {}", entry.label, err.code()));
        assert_eq!(session.kind(), entry.profile.kind(), "{}", entry.label);
    }
    session.deinit();
    assert!(!bench.engine_powered());
    assert!(bench.routing_idle());
}

/// Settle and sleep pauses come from the configuration.
#[tokio::test]
async fn test_pauses_follow_configuration() {
    let bench = MockBench::new();
    let mut session = session(&bench, HarnessConfig::default());
    let delay = RecordingDelay::default();
    let mut operator = Operator::new(bench.console(), bench.power(), delay.clone());
    bench.push_keys(&[b'a', b'1', ESC]);

    cycle(&mut operator, &mut session).await;

    assert_eq!(delay.pauses(), vec![1_000, 10_000, 1_000, 1_000]);
    assert!(bench.console_output().ends_with("'None (measure idle power)' disabled\n"));
}
