//! Harness configuration.
//!
//! Pin numbers, bus addresses, routing resources and timing constants for
//! every driver. [`HarnessConfig::default`] describes the nRF9160 DK wiring
//! used on the power analyser bench.
//!
//! | Driver        | Pins (P0.xx)                        |
//! |---------------|-------------------------------------|
//! | SPI master    | SCK 6, MOSI 2, MISO 3, CS 7         |
//! | SPI slave     | SCK 6, MOSI 2, MISO 3, CSN 7        |
//! | TWI           | SCL 2, SDA 3                        |
//! | UART          | TXD 6, RXD 7                        |
//! | UART handshake| REQ 2, RDY 3                        |
//! | GPIO loopback | input 8 (BUTTON1), output 0 (LED1)  |

use embassy_time::Duration;
use platform::{Channel, Slot};

use crate::transfer::WaitMode;

/// SPI pin assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiPins {
    /// Clock
    pub sck: u8,
    /// Master out
    pub mosi: u8,
    /// Master in
    pub miso: u8,
    /// Chip select (manual on the master, hardware CSN on the slave)
    pub cs: u8,
}

/// TWI pin assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwiPins {
    /// Clock
    pub scl: u8,
    /// Data
    pub sda: u8,
}

/// UART pin assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartPins {
    /// Transmit
    pub txd: u8,
    /// Receive
    pub rxd: u8,
}

/// Handshake line pair of the low-power UART.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakePins {
    /// Driven by the sender while it has data queued.
    pub req: u8,
    /// Driven by the receiver while its UART is powered and armed.
    pub rdy: u8,
}

/// GPIO loopback pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopbackPins {
    /// Watched for a falling edge.
    pub input: u8,
    /// Driven low by the interrupt handler.
    pub output: u8,
}

/// GPIOTE slots and DPPI channels reserved by the drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingPlan {
    /// Watch on REQ while sending.
    pub req_slot: Slot,
    /// REQ falling edge to STARTTX.
    pub req_channel: Channel,
    /// Watch on RDY while receiving.
    pub rdy_slot: Slot,
    /// RDY falling edge to STOPRX.
    pub rdy_channel: Channel,
    /// RXDRDY to idle timer START and CLEAR.
    pub idle_restart: Channel,
    /// Idle timer COMPARE0 to STOPRX.
    pub idle_expire: Channel,
    /// Watch on the loopback input.
    pub loopback_slot: Slot,
}

/// Timing constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Settle delay before and after each test action.
    pub settle: Duration,
    /// Length of the "sleep" test action.
    pub sleep_test: Duration,
    /// SPI master delay before each transfer so the slave is armed first.
    pub spi_lead_in: Duration,
    /// CS low to first clock edge.
    pub csn_to_clk_us: u32,
    /// CS low to first clock edge, "increased delay" variants.
    pub csn_to_clk_extended_us: u32,
    /// Last clock edge to CS high.
    pub clk_to_csn_us: u32,
    /// TWI slave wait for a master to address us.
    pub twi_slave_window: Duration,
    /// UART idle gap that ends a reception, in microseconds.
    pub uart_idle_us: u32,
    /// Upper bound on an idle-timeout receive that never sees a byte.
    pub uart_rx_window: Duration,
    /// Low-power UART receive window. `None` blocks until the peer signals.
    pub lp_rx_window: Option<Duration>,
    /// Bound on the wait for a stop acknowledgement.
    pub stop_ack: Duration,
    /// Width of the GPIO "send" pulse.
    pub gpio_pulse: Duration,
}

/// Complete harness configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessConfig {
    /// SPI master pins.
    pub spi_master: SpiPins,
    /// SPI slave pins.
    pub spi_slave: SpiPins,
    /// TWI pins (master and slave).
    pub twi: TwiPins,
    /// 7-bit TWI address: target of the master, own address of the slave.
    pub twi_address: u8,
    /// UART pins.
    pub uart: UartPins,
    /// Low-power UART handshake pins.
    pub handshake: HandshakePins,
    /// GPIO loopback pins.
    pub loopback: LoopbackPins,
    /// Routing resources.
    pub routing: RoutingPlan,
    /// Timing constants.
    pub timing: Timing,
    /// How send/recv wait for completion.
    pub wait_mode: WaitMode,
}

impl HarnessConfig {
    /// Bench wiring with every delay set to zero, for host tests.
    pub fn instant() -> Self {
        let mut config = Self::default();
        config.timing = Timing {
            settle: Duration::from_ticks(0),
            sleep_test: Duration::from_ticks(0),
            spi_lead_in: Duration::from_ticks(0),
            csn_to_clk_us: 0,
            csn_to_clk_extended_us: 0,
            clk_to_csn_us: 0,
            gpio_pulse: Duration::from_ticks(0),
            ..config.timing
        };
        config
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            spi_master: SpiPins {
                sck: 6,
                mosi: 2,
                miso: 3,
                cs: 7,
            },
            spi_slave: SpiPins {
                sck: 6,
                mosi: 2,
                miso: 3,
                cs: 7,
            },
            twi: TwiPins { scl: 2, sda: 3 },
            twi_address: 42,
            uart: UartPins { txd: 6, rxd: 7 },
            handshake: HandshakePins { req: 2, rdy: 3 },
            loopback: LoopbackPins {
                input: 8,
                output: 0,
            },
            routing: RoutingPlan {
                req_slot: Slot(0),
                req_channel: Channel(1),
                rdy_slot: Slot(1),
                rdy_channel: Channel(2),
                idle_restart: Channel(1),
                idle_expire: Channel(2),
                loopback_slot: Slot(0),
            },
            timing: Timing {
                settle: Duration::from_secs(1),
                sleep_test: Duration::from_secs(10),
                spi_lead_in: Duration::from_secs(2),
                csn_to_clk_us: 1,
                csn_to_clk_extended_us: 100,
                clk_to_csn_us: 1,
                twi_slave_window: Duration::from_secs(60),
                uart_idle_us: 1_000,
                uart_rx_window: Duration::from_secs(10),
                lp_rx_window: None,
                stop_ack: Duration::from_millis(100),
                gpio_pulse: Duration::from_secs(1),
            },
            wait_mode: WaitMode::Sleep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_wiring_matches_bench() {
        let config = HarnessConfig::default();
        assert_eq!(config.twi_address, 42);
        assert_eq!(config.handshake, HandshakePins { req: 2, rdy: 3 });
        assert_eq!(config.timing.lp_rx_window, None);
    }

    #[test]
    fn instant_keeps_windows() {
        let config = HarnessConfig::instant();
        assert_eq!(config.timing.settle, Duration::from_ticks(0));
        assert_eq!(config.timing.twi_slave_window, Duration::from_secs(60));
    }
}
