//! Driver integration tests against the simulated bench.
// Integration test file: expect/unwrap/panic are intentional test mechanisms.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]
//!
//! Run with: cargo test -p harness --test integration_drivers

mod common;

use std::time::Instant;

use common::{fast_config, peer_payload, position, rig, session};
use harness::{Device, Profile};
use platform::mocks::{MockBench, Op, Response};
use platform::{
    validate, Bitrate, Direction, Drive, Level, PinConfig, Polarity, Pull, RxReport, Slot, Task, TransferError,
};

const ENGINE_PROFILES: [Profile; 6] = [
    Profile::SpiMaster {
        bitrate: Bitrate::M1,
        extended_delay: false,
    },
    Profile::SpiSlave,
    Profile::TwiMaster { bitrate: Bitrate::K400 },
    Profile::TwiSlave,
    Profile::Uart {
        bitrate: Bitrate::M1,
        idle_timeout: false,
    },
    Profile::UartLowPower { bitrate: Bitrate::M1 },
];

/// SPI master at 1 Mbps sends 1024 bytes; the peer sees a valid payload
/// with header 0x04 0x00.
#[tokio::test]
async fn test_spi_master_1024_bytes_reach_peer_intact() {
    let bench = MockBench::new();
    let mut session = session(&bench, fast_config());
    session
        .select(Profile::SpiMaster {
            bitrate: Bitrate::M1,
            extended_delay: false,
        })
        .expect("spim init");

    let sent = session.send(1024).await.expect("send");

    assert_eq!(sent, 1024);
    let seen = bench.peer_received();
    assert_eq!(seen.len(), 1024);
    assert_eq!(&seen[..4], &[0x04, 0x00, 0x02, 0x03]);
    assert_eq!(validate(&seen, 1024, 1024), RxReport::Ok);
}

/// CS frames the transfer and the latch is armed before START.
#[tokio::test]
async fn test_spi_master_frames_start_with_chip_select() {
    let bench = MockBench::new();
    let config = fast_config();
    let cs = config.spi_master.cs;
    let mut session = session(&bench, config);
    session.select(ENGINE_PROFILES[0]).expect("spim init");
    bench.clear_ops();

    session.send(16).await.expect("send");

    let ops = bench.ops();
    let low = position(&ops, "CS low", |op| *op == Op::PinLevel(cs, Level::Low));
    let start = position(&ops, "START", |op| matches!(op, Op::Trigger { task: Task::Start, .. }));
    let high = position(&ops, "CS high", |op| *op == Op::PinLevel(cs, Level::High));
    assert!(low < start && start < high);
    assert!(ops.contains(&Op::Trigger {
        task: Task::Start,
        armed: true
    }));
}

/// Every engine-backed driver returns the requested size on success.
#[tokio::test]
async fn test_send_returns_requested_size() {
    for profile in ENGINE_PROFILES {
        for size in [16, 1024, 8190] {
            let bench = MockBench::new();
            let mut session = session(&bench, fast_config());
            session.select(profile).expect("init");
            let sent = session.send(size).await;
            assert_eq!(sent, Ok(size), "{profile:?} send({size})");
        }
    }
}

/// Receiving a stamped payload validates cleanly on every driver.
#[tokio::test]
async fn test_recv_of_peer_payload_validates() {
    for profile in ENGINE_PROFILES {
        let bench = MockBench::new();
        bench.set_peer_payload(peer_payload(1024));
        let mut session = session(&bench, fast_config());
        session.select(profile).expect("init");

        let received = session.recv(1024).await.expect("recv");

        assert_eq!(received, 1024, "{profile:?}");
        assert_eq!(validate(session.rx(), received, 1024), RxReport::Ok, "{profile:?}");
    }
}

/// Zero and oversized requests are rejected before the engine is touched.
#[tokio::test]
async fn test_length_bounds_are_enforced() {
    let bench = MockBench::new();
    let mut session = session(&bench, fast_config());
    session.select(ENGINE_PROFILES[4]).expect("uart init");
    bench.clear_ops();

    assert!(matches!(session.recv(0).await, Err(TransferError::InvalidLength { .. })));
    assert!(matches!(session.recv(9000).await, Err(TransferError::InvalidLength { .. })));
    assert!(bench.ops().iter().all(|op| !matches!(op, Op::LoadRx(_) | Op::Trigger { .. })));
}

/// MAXCNT is 13 bits wide: 8191 bytes is the largest transfer even though
/// the buffers hold 8192.
#[tokio::test]
async fn test_send_limit_is_maxcnt() {
    let bench = MockBench::new();
    let mut session = session(&bench, fast_config());
    session.select(ENGINE_PROFILES[4]).expect("uart init");

    assert_eq!(session.send(8191).await, Ok(8191));
    assert_eq!(
        session.send(8192).await,
        Err(TransferError::InvalidLength {
            requested: 8192,
            capacity: 8191,
        })
    );
}

/// The low-power receive keeps one spare byte, so it tops out at 8190.
#[tokio::test]
async fn test_low_power_recv_limit_leaves_spare_byte() {
    let bench = MockBench::new();
    bench.set_peer_payload(peer_payload(8190));
    let mut session = session(&bench, fast_config());
    session
        .select(Profile::UartLowPower { bitrate: Bitrate::M1 })
        .expect("init");
    bench.clear_ops();

    assert_eq!(session.recv(8190).await, Ok(8190));
    assert!(bench.ops().contains(&Op::LoadRx(8191)));
    assert_eq!(
        session.recv(8191).await,
        Err(TransferError::InvalidLength {
            requested: 8191,
            capacity: 8190,
        })
    );
}

/// deinit twice does not fault and leaves pin state unchanged.
#[test]
fn test_deinit_twice_leaves_pins_unchanged() {
    let profiles = ENGINE_PROFILES.into_iter().chain([
        Profile::Uart {
            bitrate: Bitrate::M1,
            idle_timeout: true,
        },
        Profile::GpioLoopback,
    ]);
    for profile in profiles {
        let bench = MockBench::new();
        let config = fast_config();
        let mut rig = rig(&bench, &config);
        let mut device = Device::from_profile(profile, &config);
        device.init(&mut rig).expect("init");

        device.deinit(&mut rig);
        let after_first = bench.pin_snapshot();
        let unlinks = bench.ops().iter().filter(|op| **op == Op::IdleUnlinked).count();
        device.deinit(&mut rig);

        assert_eq!(bench.pin_snapshot(), after_first, "{profile:?}");
        assert!(
            after_first.values().all(|(cfg, _)| *cfg == PinConfig::DISCONNECTED),
            "{profile:?} left a pin configured"
        );
        assert_eq!(
            bench.ops().iter().filter(|op| **op == Op::IdleUnlinked).count(),
            unlinks,
            "{profile:?} unlinked twice"
        );
        assert!(!bench.engine_powered());
        assert!(!bench.engine_listening());
    }
}

/// An unsupported rate fails init and releases the pins it touched.
#[test]
fn test_unsupported_bitrate_fails_init_cleanly() {
    let bench = MockBench::new();
    let mut session = session(&bench, fast_config());

    let result = session.select(Profile::SpiMaster {
        bitrate: Bitrate(3_000_000),
        extended_delay: false,
    });

    assert_eq!(result, Err(TransferError::UnsupportedBitrate(3_000_000)));
    assert_eq!(session.device(), &Device::None);
    assert!(bench
        .pin_snapshot()
        .values()
        .all(|(cfg, _)| *cfg == PinConfig::DISCONNECTED));
}

/// Low-power send: REQ route is live before REQ is released, torn down in
/// two phases afterwards, and the UART ends powered off.
#[tokio::test]
async fn test_low_power_send_ordering_and_teardown() {
    let bench = MockBench::new();
    let config = fast_config();
    let req = config.handshake.req;
    let (slot, channel) = (config.routing.req_slot, config.routing.req_channel);
    let mut session = session(&bench, config);
    session
        .select(Profile::UartLowPower { bitrate: Bitrate::M1 })
        .expect("init");
    assert!(!bench.engine_powered(), "engine must idle unpowered");
    bench.clear_ops();

    let sent = session.send(16).await.expect("send");
    assert_eq!(sent, 16);

    let ops = bench.ops();
    let steps = [
        position(&ops, "power on", |op| *op == Op::Power(true)),
        position(&ops, "watch", |op| *op == Op::Watch(slot, req, Polarity::HiToLo)),
        position(&ops, "publish", |op| *op == Op::Publish(slot, channel)),
        position(&ops, "subscribe", |op| *op == Op::Subscribe(Task::StartTx, channel)),
        position(&ops, "channel on", |op| *op == Op::ChannelOn(channel)),
        position(&ops, "REQ release", |op| {
            *op == Op::PinConfig(req, PinConfig::input(Pull::Up))
        }),
        position(&ops, "edge", |op| *op == Op::EdgeFired(slot)),
        position(&ops, "STARTTX", |op| {
            *op == Op::Trigger {
                task: Task::StartTx,
                armed: true,
            }
        }),
        position(&ops, "STOPTX", |op| matches!(op, Op::Trigger { task: Task::StopTx, .. })),
        position(&ops, "teardown phase one", |op| *op == Op::WatchDisabled(slot, req)),
        position(&ops, "teardown phase two", |op| *op == Op::WatchCleared(slot)),
        position(&ops, "unsubscribe", |op| *op == Op::Unsubscribe(Task::StartTx)),
        position(&ops, "channel off", |op| *op == Op::ChannelOff(channel)),
        position(&ops, "REQ low", |op| *op == Op::PinLevel(req, Level::Low)),
        position(&ops, "power off", |op| *op == Op::Power(false)),
    ];
    assert!(steps.windows(2).all(|w| w[0] < w[1]), "out of order: {steps:?}");

    assert!(!bench.engine_powered());
    assert!(bench.routing_idle());
    let (cfg, level) = bench.pin_snapshot()[&req];
    assert_eq!(cfg, PinConfig::output(Drive::S0S1).connected());
    assert_eq!(level, Level::Low);
}

/// Low-power receive: RDY pulse after STARTRX, RDY edge routed to STOPRX,
/// one spare byte of buffer.
#[tokio::test]
async fn test_low_power_recv_handshake() {
    let bench = MockBench::new();
    bench.set_peer_payload(peer_payload(16));
    let config = fast_config();
    let rdy = config.handshake.rdy;
    let (slot, channel) = (config.routing.rdy_slot, config.routing.rdy_channel);
    let mut session = session(&bench, config);
    session
        .select(Profile::UartLowPower { bitrate: Bitrate::M1 })
        .expect("init");
    bench.clear_ops();

    let received = session.recv(16).await.expect("recv");

    assert_eq!(received, 16);
    assert_eq!(validate(session.rx(), 16, 16), RxReport::Ok);
    let ops = bench.ops();
    assert!(ops.contains(&Op::LoadRx(17)));
    let steps = [
        position(&ops, "PORT listen", |op| *op == Op::PortListen),
        position(&ops, "power on", |op| *op == Op::Power(true)),
        position(&ops, "STARTRX", |op| {
            *op == Op::Trigger {
                task: Task::StartRx,
                armed: true,
            }
        }),
        position(&ops, "RDY pulse", |op| *op == Op::PinPulse(rdy)),
        position(&ops, "subscribe", |op| *op == Op::Subscribe(Task::StopRx, channel)),
        position(&ops, "teardown phase one", |op| *op == Op::WatchDisabled(slot, rdy)),
        position(&ops, "teardown phase two", |op| *op == Op::WatchCleared(slot)),
        position(&ops, "channel off", |op| *op == Op::ChannelOff(channel)),
        position(&ops, "power off", |op| *op == Op::Power(false)),
    ];
    assert!(steps.windows(2).all(|w| w[0] < w[1]), "out of order: {steps:?}");
    assert!(bench.routing_idle());
    assert!(!bench.engine_powered());
}

/// The PORT handler, not the waiting task, powers the receiver, starts it,
/// pulses RDY and routes RDY's falling edge to STOPRX.
#[tokio::test]
async fn test_low_power_recv_starts_receiver_in_port_handler() {
    let bench = MockBench::new();
    bench.set_peer_payload(peer_payload(16));
    let config = fast_config();
    let rdy = config.handshake.rdy;
    let (slot, channel) = (config.routing.rdy_slot, config.routing.rdy_channel);
    let mut session = session(&bench, config);
    session
        .select(Profile::UartLowPower { bitrate: Bitrate::M1 })
        .expect("init");
    bench.clear_ops();

    session.recv(16).await.expect("recv");

    let ops = bench.ops();
    let enter = position(&ops, "handler entry", |op| *op == Op::PortHandlerEnter);
    let exit = position(&ops, "handler exit", |op| *op == Op::PortHandlerExit);
    let in_handler = [
        ("power on", position(&ops, "power on", |op| *op == Op::Power(true))),
        (
            "STARTRX",
            position(&ops, "STARTRX", |op| {
                matches!(op, Op::Trigger { task: Task::StartRx, .. })
            }),
        ),
        ("RDY pulse", position(&ops, "RDY pulse", |op| *op == Op::PinPulse(rdy))),
        (
            "RDY watch",
            position(&ops, "RDY watch", |op| *op == Op::Watch(slot, rdy, Polarity::HiToLo)),
        ),
        ("publish", position(&ops, "publish", |op| *op == Op::Publish(slot, channel))),
        (
            "STOPRX subscribe",
            position(&ops, "subscribe", |op| *op == Op::Subscribe(Task::StopRx, channel)),
        ),
        ("channel on", position(&ops, "channel on", |op| *op == Op::ChannelOn(channel))),
    ];
    assert!(in_handler.windows(2).all(|w| w[0].1 < w[1].1), "out of order: {in_handler:?}");
    for (what, at) in in_handler {
        assert!(enter < at && at < exit, "{what} at {at}, handler ran {enter}..{exit}");
    }

    // The task side neither repeats nor pre-empts any of it.
    assert_eq!(ops.iter().filter(|op| **op == Op::Power(true)).count(), 1);
    assert_eq!(bench.trigger_count(Task::StartRx), 1);
    assert_eq!(ops.iter().filter(|op| matches!(op, Op::PinPulse(_))).count(), 1);
    assert_eq!(ops.iter().filter(|op| **op == Op::ChannelOn(channel)).count(), 1);
}

/// Low-power receive with no peer blocks.
#[tokio::test]
async fn test_low_power_recv_without_peer_blocks() {
    let bench = MockBench::new();
    bench.set_peer_present(false);
    let mut session = session(&bench, fast_config());
    session
        .select(Profile::UartLowPower { bitrate: Bitrate::M1 })
        .expect("init");

    let result = tokio::time::timeout(std::time::Duration::from_millis(200), session.recv(16)).await;

    assert!(result.is_err(), "recv returned without a peer: {result:?}");
    assert!(!bench.engine_powered(), "engine powered while waiting");
}

/// With a receive window configured, an idle low-power receive reports 0.
#[tokio::test]
async fn test_low_power_recv_window_reports_zero() {
    let bench = MockBench::new();
    bench.set_peer_present(false);
    let mut config = fast_config();
    config.timing.lp_rx_window = Some(embassy_time::Duration::from_millis(30));
    let mut session = session(&bench, config);
    session
        .select(Profile::UartLowPower { bitrate: Bitrate::M1 })
        .expect("init");

    assert_eq!(session.recv(16).await, Ok(0));
    // The machine is idle again: a second receive is not Busy.
    assert_eq!(session.recv(16).await, Ok(0));
    assert!(bench.routing_idle());
    assert!(!bench.ops().contains(&Op::PortHandlerEnter));
    assert!(!bench.engine_powered());
}

/// UART with idle timeout against a silent peer returns 0 within the window.
#[tokio::test]
async fn test_uart_idle_timeout_returns_zero_within_window() {
    let bench = MockBench::new();
    bench.set_response(Response::Silent);
    let config = fast_config();
    let window = config.timing.uart_rx_window;
    let mut session = session(&bench, config);
    session
        .select(Profile::Uart {
            bitrate: Bitrate::M1,
            idle_timeout: true,
        })
        .expect("init");
    assert!(bench.ops().contains(&Op::IdleLinked(1_000)));

    let started = Instant::now();
    let received = session.recv(16).await;
    let elapsed = started.elapsed();

    assert_eq!(received, Ok(0));
    assert!(
        elapsed < std::time::Duration::from_millis(window.as_millis() + 500),
        "took {elapsed:?}"
    );
    assert_eq!(bench.trigger_count(Task::StopRx), 1);

    session.deinit();
    assert!(bench.ops().contains(&Op::IdleUnlinked));
}

/// A silent peer that delivers some bytes before going quiet yields a
/// partial count.
#[tokio::test]
async fn test_uart_idle_timeout_reports_partial_count() {
    let bench = MockBench::new();
    bench.set_response(Response::Silent);
    bench.set_silent_partial(5);
    let mut session = session(&bench, fast_config());
    session
        .select(Profile::Uart {
            bitrate: Bitrate::M1,
            idle_timeout: true,
        })
        .expect("init");

    assert_eq!(session.recv(16).await, Ok(5));
}

/// TWI master bus error: ERRORSRC negated, STOP issued once.
#[tokio::test]
async fn test_twi_master_error_reports_source() {
    let bench = MockBench::new();
    bench.set_response(Response::Fault(0x2));
    let mut session = session(&bench, fast_config());
    session
        .select(Profile::TwiMaster { bitrate: Bitrate::K100 })
        .expect("init");

    let result = session.send(16).await;

    assert_eq!(result, Err(TransferError::Hardware(0x2)));
    assert_eq!(result.unwrap_err().code(), -2);
    assert_eq!(bench.trigger_count(Task::Stop), 1);

    // The next transfer is accepted again.
    bench.set_response(Response::Immediate);
    assert_eq!(session.send(16).await, Ok(16));
}

/// TWI slave addressed in the wrong direction.
#[tokio::test]
async fn test_twi_slave_wrong_direction() {
    let bench = MockBench::new();
    bench.set_master_direction(Direction::Receive);
    let mut session = session(&bench, fast_config());
    session.select(Profile::TwiSlave).expect("init");

    let result = session.send(16).await;

    assert_eq!(result, Err(TransferError::WrongDirection));
    assert_eq!(result.unwrap_err().code(), -53);
}

/// TWI slave with no master times out.
#[tokio::test]
async fn test_twi_slave_times_out_without_master() {
    let bench = MockBench::new();
    bench.set_peer_present(false);
    let mut session = session(&bench, fast_config());
    session.select(Profile::TwiSlave).expect("init");

    let result = session.recv(16).await;

    assert_eq!(result, Err(TransferError::TimedOut));
    assert_eq!(result.unwrap_err().code(), -116);
}

/// GPIO loopback: the interrupt drives the output low, slot torn down.
#[tokio::test]
async fn test_gpio_loopback_responds_on_output() {
    let bench = MockBench::new();
    let config = fast_config();
    let (input, output) = (config.loopback.input, config.loopback.output);
    let slot = Slot(0);
    let mut session = session(&bench, config);
    session.select(Profile::GpioLoopback).expect("init");
    assert!(session.device().hint().is_some());
    bench.clear_ops();

    assert_eq!(session.recv(16).await, Ok(0));

    let ops = bench.ops();
    let steps = [
        position(&ops, "output high", |op| *op == Op::PinLevel(output, Level::High)),
        position(&ops, "watch", |op| *op == Op::Watch(slot, input, Polarity::HiToLo)),
        position(&ops, "listen", |op| *op == Op::EdgeListen(slot)),
        position(&ops, "response", |op| *op == Op::PinLevel(output, Level::Low)),
        position(&ops, "fired", |op| *op == Op::EdgeFired(slot)),
        position(&ops, "teardown phase one", |op| *op == Op::WatchDisabled(slot, input)),
        position(&ops, "teardown phase two", |op| *op == Op::WatchCleared(slot)),
    ];
    assert!(steps.windows(2).all(|w| w[0] < w[1]), "out of order: {steps:?}");
    assert!(bench.routing_idle());
}

/// GPIO send pulses the output and reports 0 bytes.
#[tokio::test]
async fn test_gpio_send_pulses_output() {
    let bench = MockBench::new();
    let config = fast_config();
    let output = config.loopback.output;
    let mut session = session(&bench, config);
    session.select(Profile::GpioLoopback).expect("init");
    bench.clear_ops();

    assert_eq!(session.send(16).await, Ok(0));
    assert_eq!(
        bench.ops(),
        vec![Op::PinLevel(output, Level::High), Op::PinLevel(output, Level::Low)]
    );
}

/// Nothing selected: transfers succeed with 0 bytes and touch nothing.
#[tokio::test]
async fn test_no_device_moves_nothing() {
    let bench = MockBench::new();
    let mut session = session(&bench, fast_config());
    session.select(Profile::None).expect("none");
    bench.clear_ops();

    assert_eq!(session.send(16).await, Ok(0));
    assert_eq!(session.recv(16).await, Ok(0));
    assert!(bench.ops().is_empty());
}

/// A driver used without init reports it instead of touching hardware.
#[tokio::test]
async fn test_transfer_before_init_is_rejected() {
    let bench = MockBench::new();
    let config = fast_config();
    let mut rig = rig(&bench, &config);
    let mut buffers = Box::new(harness::TransferBuffers::new());
    let mut device = Device::from_profile(Profile::SpiSlave, &config);

    let result = device.send(&mut rig, &mut buffers, 16).await;

    assert_eq!(result, Err(TransferError::NotInitialised));
    assert!(bench.ops().is_empty());
}

/// Selecting a new device deinitialises the previous one first.
#[test]
fn test_reselect_releases_previous_device() {
    let bench = MockBench::new();
    let config = fast_config();
    let miso = config.spi_master.miso;
    let mut session = session(&bench, config);
    session.select(ENGINE_PROFILES[0]).expect("spim");
    bench.clear_ops();

    session.select(Profile::TwiSlave).expect("twis");

    let ops = bench.ops();
    let release = position(&ops, "release", |op| *op == Op::Release);
    let configure = position(&ops, "configure", |op| matches!(op, Op::Configure(_)));
    assert!(release < configure);
    assert!(ops.contains(&Op::PinConfig(miso, PinConfig::DISCONNECTED)));
}
