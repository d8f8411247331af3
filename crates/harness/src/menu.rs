//! Operator menu.
//!
//! One [`Operator::cycle`] is: pick a device (or a power mode), run tests
//! on it until Esc, then disable it.

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use platform::{Bitrate, Console, EventRouter, PinBank, PowerControl, PowerMode, TransferEngine};

use crate::device::Profile;
use crate::diag::{print_rx, say, GREEN, NORMAL, RED};
use crate::session::Session;

/// Esc key.
pub const ESC: u8 = 0x1B;

/// One line of the device menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Key that selects the entry.
    pub key: u8,
    /// Operator-facing name.
    pub label: &'static str,
    /// Driver configuration.
    pub profile: Profile,
}

const fn entry(key: u8, label: &'static str, profile: Profile) -> DeviceEntry {
    DeviceEntry { key, label, profile }
}

const fn spim(bitrate: Bitrate, extended_delay: bool) -> Profile {
    Profile::SpiMaster {
        bitrate,
        extended_delay,
    }
}

const fn uart(bitrate: Bitrate, idle_timeout: bool) -> Profile {
    Profile::Uart {
        bitrate,
        idle_timeout,
    }
}

/// Device menu, keys `a` to `p`.
pub static DEVICE_MENU: [DeviceEntry; 16] = [
    entry(b'a', "None (measure idle power)", Profile::None),
    entry(
        b'b',
        "SPI master @ 125 kbps with increased CSN to CLK delay",
        spim(Bitrate::K125, true),
    ),
    entry(
        b'c',
        "SPI master @ 1 Mbps with increased CSN to CLK delay",
        spim(Bitrate::M1, true),
    ),
    entry(b'd', "SPI master @ 1 Mbps", spim(Bitrate::M1, false)),
    entry(
        b'e',
        "SPI master @ 8 Mbps with increased CSN to CLK delay",
        spim(Bitrate::M8, true),
    ),
    entry(b'f', "SPI slave", Profile::SpiSlave),
    entry(b'g', "UART @ 115.2 kbps", uart(Bitrate::BAUD_115200, false)),
    entry(b'h', "UART @ 1 Mbps", uart(Bitrate::M1, false)),
    entry(b'i', "UART @ 2 Mbps", uart(Bitrate::M2, false)),
    entry(b'j', "UART with RX timeout @ 1 Mbps", uart(Bitrate::M1, true)),
    entry(
        b'k',
        "UART with enable pins @ 1 Mbps",
        Profile::UartLowPower { bitrate: Bitrate::M1 },
    ),
    entry(
        b'l',
        "TWI master @ 100 kbps",
        Profile::TwiMaster {
            bitrate: Bitrate::K100,
        },
    ),
    entry(
        b'm',
        "TWI master @ 250 kbps",
        Profile::TwiMaster {
            bitrate: Bitrate::K250,
        },
    ),
    entry(
        b'n',
        "TWI master @ 400 kbps",
        Profile::TwiMaster {
            bitrate: Bitrate::K400,
        },
    ),
    entry(b'o', "TWI slave", Profile::TwiSlave),
    entry(b'p', "GPIO interrupt response timing", Profile::GpioLoopback),
];

/// What a test menu entry does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestAction {
    /// Idle for the sleep-test duration.
    Sleep,
    /// Send this many bytes.
    Send(usize),
    /// Receive this many bytes.
    Receive(usize),
}

/// One line of the test menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestEntry {
    /// Operator-facing name.
    pub label: &'static str,
    /// Action.
    pub action: TestAction,
}

/// Test menu, keys `1` to `7`.
pub static TEST_MENU: [TestEntry; 7] = [
    TestEntry {
        label: "Sleep 10 s",
        action: TestAction::Sleep,
    },
    TestEntry {
        label: "Send 16 bytes",
        action: TestAction::Send(16),
    },
    TestEntry {
        label: "Send 1024 bytes",
        action: TestAction::Send(1024),
    },
    TestEntry {
        label: "Send 8 kbytes",
        action: TestAction::Send(8190),
    },
    TestEntry {
        label: "Receive 16 bytes",
        action: TestAction::Receive(16),
    },
    TestEntry {
        label: "Receive 1024 bytes",
        action: TestAction::Receive(1024),
    },
    TestEntry {
        label: "Receive 8 kbytes",
        action: TestAction::Receive(8190),
    },
];

/// Meaning of a key pressed at the device prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKey {
    /// A device entry.
    Device(&'static DeviceEntry),
    /// A power mode switch.
    Power(PowerMode),
    /// Anything else.
    Invalid(u8),
}

/// Decode a key pressed at the device prompt.
pub fn parse_device_key(key: u8) -> DeviceKey {
    match key {
        b'[' => DeviceKey::Power(PowerMode::ConstantLatency),
        b']' => DeviceKey::Power(PowerMode::LowPower),
        _ => DEVICE_MENU
            .iter()
            .find(|e| e.key == key)
            .map_or(DeviceKey::Invalid(key), DeviceKey::Device),
    }
}

/// Meaning of a key pressed at the test prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestKey {
    /// A test entry.
    Run(&'static TestEntry),
    /// Esc.
    Disable,
    /// Anything else.
    Invalid(u8),
}

/// Decode a key pressed at the test prompt.
pub fn parse_test_key(key: u8) -> TestKey {
    if key == ESC {
        return TestKey::Disable;
    }
    key.checked_sub(b'1')
        .and_then(|i| TEST_MENU.get(usize::from(i)))
        .map_or(TestKey::Invalid(key), TestKey::Run)
}

/// Menu front end: console, power switch and a delay source.
pub struct Operator<C, W, D> {
    console: C,
    power: W,
    delay: D,
}

impl<C, W, D> Operator<C, W, D>
where
    C: Console,
    W: PowerControl,
    D: DelayNs,
{
    /// Bundle the operator-side hardware.
    pub fn new(console: C, power: W, delay: D) -> Self {
        Self { console, power, delay }
    }

    /// Boot banner.
    pub fn greet(&mut self) {
        say!(self.console, "Sample has started\n");
    }

    /// Console, for tests and the boot banner.
    pub fn console(&mut self) -> &mut C {
        &mut self.console
    }

    /// Prompt until a device is selected and initialised.
    ///
    /// Power mode keys and invalid keys re-prompt. Returns the selected
    /// entry, or `None` if init failed.
    pub async fn select_device<E, P, R>(&mut self, session: &mut Session<'_, E, P, R>) -> Option<&'static DeviceEntry>
    where
        E: TransferEngine,
        P: PinBank,
        R: EventRouter,
    {
        loop {
            say!(self.console, "\nSelect peripheral:\n");
            for entry in &DEVICE_MENU {
                say!(self.console, "  {}. {}\n", char::from(entry.key), entry.label);
            }
            say!(self.console, "Configuration:\n");
            say!(self.console, "  [. Constant latency (keep clock on)\n");
            say!(self.console, "  ]. Low power mode (disable clock while idle)\n");

            let key = self.console.read_key().await;
            match parse_device_key(key) {
                DeviceKey::Power(mode) => {
                    say!(self.console, "Switching to {}\n", mode.describe());
                    self.power.set_mode(mode);
                }
                DeviceKey::Invalid(key) => {
                    say!(self.console, "Invalid selection '{}'\n", char::from(key));
                }
                DeviceKey::Device(entry) => {
                    say!(self.console, "Selected device '{}'\n", entry.label);
                    if let Err(err) = session.select(entry.profile) {
                        say!(self.console, "{RED}Init failed {}{NORMAL}\n", err.code());
                        return None;
                    }
                    for pin in session.device().pins() {
                        say!(self.console, "    {:<7} P0.{:02}\n", pin.role, pin.pin);
                    }
                    if let Some(hint) = session.device().hint() {
                        say!(self.console, "{}\n", hint);
                    }
                    return Some(entry);
                }
            }
        }
    }

    /// Prompt for and run one test. Returns `false` on Esc.
    pub async fn run_test<E, P, R>(&mut self, session: &mut Session<'_, E, P, R>) -> bool
    where
        E: TransferEngine,
        P: PinBank,
        R: EventRouter,
    {
        say!(self.console, "\nSelect test:\n");
        for (key, entry) in (b'1'..).zip(TEST_MENU.iter()) {
            say!(self.console, "  {}. {}\n", char::from(key), entry.label);
        }
        say!(self.console, "  Esc. Disable device\n");

        let key = self.console.read_key().await;
        let entry = match parse_test_key(key) {
            TestKey::Disable => {
                say!(self.console, "Disable device\n");
                return false;
            }
            TestKey::Invalid(key) => {
                say!(self.console, "Invalid selection '{}'\n", char::from(key));
                return true;
            }
            TestKey::Run(entry) => entry,
        };
        say!(self.console, "Selected test '{}'\n", entry.label);

        let settle = session.config().timing.settle;
        self.pause(settle).await;
        let result = match entry.action {
            TestAction::Sleep => {
                let sleep = session.config().timing.sleep_test;
                self.pause(sleep).await;
                Ok(0)
            }
            TestAction::Send(size) => session.send(size).await,
            TestAction::Receive(size) => session.recv(size).await,
        };
        self.pause(settle).await;

        match (result, entry.action) {
            (Ok(0), _) => say!(self.console, "Test done\n"),
            (Err(err), _) => say!(self.console, "{RED}Test returned {}{NORMAL}\n", err.code()),
            (Ok(received), TestAction::Receive(size)) => {
                print_rx(&mut self.console, session.rx(), received, size);
            }
            (Ok(sent), TestAction::Send(size)) if sent != size => {
                say!(self.console, "Send {} bytes {RED}instead of {} bytes{NORMAL}\n", sent, size);
            }
            (Ok(sent), _) => say!(self.console, "Send {} bytes {GREEN}OK{NORMAL}\n", sent),
        }
        true
    }

    /// Select a device, run tests until Esc, then disable it.
    pub async fn cycle<E, P, R>(&mut self, session: &mut Session<'_, E, P, R>)
    where
        E: TransferEngine,
        P: PinBank,
        R: EventRouter,
    {
        let Some(entry) = self.select_device(session).await else {
            return;
        };
        while self.run_test(session).await {}
        session.deinit();
        let settle = session.config().timing.settle;
        self.pause(settle).await;
        say!(self.console, "'{}' disabled\n", entry.label);
    }

    async fn pause(&mut self, duration: Duration) {
        let ms = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        if ms > 0 {
            self.delay.delay_ms(ms).await;
        }
    }
}
