//! Peripheral kinds, bitrates and their register encodings.
//!
//! The register encodings are those of the nRF9160 SPIM, TWIM and UARTE
//! blocks. They live here, not in the hardware module, so the mapping can be
//! property-tested on the host.

/// Peripheral personalities the harness can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PeripheralKind {
    /// Nothing selected; idle power baseline.
    None,
    /// SPIM with manual chip select.
    SpiMaster,
    /// SPIS with hardware CSN.
    SpiSlave,
    /// TWIM.
    TwiMaster,
    /// TWIS.
    TwiSlave,
    /// UARTE, always powered while selected.
    Uart,
    /// UARTE powered only during a REQ/RDY handshake.
    UartLowPower,
    /// GPIOTE edge to output pin response.
    GpioLoopback,
}

impl PeripheralKind {
    /// Short name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SpiMaster => "spim",
            Self::SpiSlave => "spis",
            Self::TwiMaster => "twim",
            Self::TwiSlave => "twis",
            Self::Uart => "uarte",
            Self::UartLowPower => "uarte-lp",
            Self::GpioLoopback => "gpio",
        }
    }

    /// Whether the serial block is used at all.
    pub const fn uses_engine(self) -> bool {
        !matches!(self, Self::None | Self::GpioLoopback)
    }
}

/// Bus clock or baud rate in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bitrate(pub u32);

impl Bitrate {
    /// 100 kHz (TWI standard mode).
    pub const K100: Self = Self(100_000);
    /// 125 kHz.
    pub const K125: Self = Self(125_000);
    /// 250 kHz.
    pub const K250: Self = Self(250_000);
    /// 400 kHz (TWI fast mode).
    pub const K400: Self = Self(400_000);
    /// 115200 baud.
    pub const BAUD_115200: Self = Self(115_200);
    /// 1 MHz / 1 Mbaud.
    pub const M1: Self = Self(1_000_000);
    /// 2 Mbaud.
    pub const M2: Self = Self(2_000_000);
    /// 8 MHz.
    pub const M8: Self = Self(8_000_000);

    /// Rate in Hz.
    pub const fn hz(self) -> u32 {
        self.0
    }

    /// SPIM FREQUENCY register value.
    pub fn spim_frequency(self) -> Option<u32> {
        match self.0 {
            125_000 => Some(0x0200_0000),
            250_000 => Some(0x0400_0000),
            500_000 => Some(0x0800_0000),
            1_000_000 => Some(0x1000_0000),
            2_000_000 => Some(0x2000_0000),
            4_000_000 => Some(0x4000_0000),
            8_000_000 => Some(0x8000_0000),
            _ => None,
        }
    }

    /// TWIM FREQUENCY register value.
    pub fn twim_frequency(self) -> Option<u32> {
        match self.0 {
            100_000 => Some(0x0198_0000),
            250_000 => Some(0x0400_0000),
            400_000 => Some(0x0640_0000),
            _ => None,
        }
    }

    /// UARTE BAUDRATE register value.
    ///
    /// Standard rates use the datasheet encodings. Other rates up to 8 Mbaud
    /// use `round(baud * 2^32 / 16 MHz)` with the low 12 bits cleared, which
    /// is how the datasheet values are derived and how 2 Mbaud is reached.
    pub fn uarte_baudrate(self) -> Option<u32> {
        let value = match self.0 {
            1_200 => 0x0004_F000,
            2_400 => 0x0009_D000,
            4_800 => 0x0013_B000,
            9_600 => 0x0027_5000,
            14_400 => 0x003A_F000,
            19_200 => 0x004E_A000,
            28_800 => 0x0075_C000,
            38_400 => 0x009D_0000,
            57_600 => 0x00EB_0000,
            115_200 => 0x01D6_0000,
            230_400 => 0x03B0_0000,
            250_000 => 0x0400_0000,
            460_800 => 0x0740_0000,
            921_600 => 0x0F00_0000,
            1_000_000 => 0x1000_0000,
            hz => return Self::uarte_baud_formula(hz),
        };
        Some(value)
    }

    fn uarte_baud_formula(hz: u32) -> Option<u32> {
        const UARTE_CLOCK: u64 = 16_000_000;
        const HALF_CLOCK: u64 = 8_000_000;
        if hz == 0 || u64::from(hz) > HALF_CLOCK {
            return None;
        }
        let scaled = u64::from(hz).checked_shl(32)?;
        let rounded = scaled.checked_add(HALF_CLOCK)?.checked_div(UARTE_CLOCK)?;
        u32::try_from(rounded).ok().map(|v| v & 0xFFFF_F000)
    }

    /// Register value for the given personality, if it takes a rate.
    pub fn register_for(self, kind: PeripheralKind) -> Option<u32> {
        match kind {
            PeripheralKind::SpiMaster => self.spim_frequency(),
            PeripheralKind::TwiMaster => self.twim_frequency(),
            PeripheralKind::Uart | PeripheralKind::UartLowPower => self.uarte_baudrate(),
            PeripheralKind::None
            | PeripheralKind::SpiSlave
            | PeripheralKind::TwiSlave
            | PeripheralKind::GpioLoopback => None,
        }
    }
}

/// SPI clock polarity/phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiMode {
    /// CPOL=0, CPHA=0
    Mode0,
    /// CPOL=0, CPHA=1
    Mode1,
    /// CPOL=1, CPHA=0
    Mode2,
    /// CPOL=1, CPHA=1 (clock idles high, sample on trailing edge)
    Mode3,
}

impl SpiMode {
    /// SPIM/SPIS CONFIG value, MSB first.
    pub const fn config_bits(self) -> u32 {
        const CPHA: u32 = 1 << 1;
        const CPOL: u32 = 1 << 2;
        match self {
            Self::Mode0 => 0,
            Self::Mode1 => CPHA,
            Self::Mode2 => CPOL,
            Self::Mode3 => CPOL | CPHA,
        }
    }
}

/// PSEL assignment for a serial block.
///
/// Roles are named by signal direction so one struct covers every
/// personality:
///
/// | kind | clock | data_out | data_in | select |
/// |------|-------|----------|---------|--------|
/// | SPIM | SCK   | MOSI     | MISO    | -      |
/// | SPIS | SCK   | MISO     | MOSI    | CSN    |
/// | TWI  | SCL   | SDA      | -       | -      |
/// | UART | -     | TXD      | RXD     | -      |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinRoles {
    /// Clock line.
    pub clock: Option<u8>,
    /// Line this device drives.
    pub data_out: Option<u8>,
    /// Line this device samples.
    pub data_in: Option<u8>,
    /// Slave select line handled by hardware.
    pub select: Option<u8>,
}

impl PinRoles {
    /// No pins connected.
    pub const fn none() -> Self {
        Self {
            clock: None,
            data_out: None,
            data_in: None,
            select: None,
        }
    }

    /// SPI master. Chip select is driven as a GPIO, not through PSEL.
    pub const fn spi_master(sck: u8, mosi: u8, miso: u8) -> Self {
        Self {
            clock: Some(sck),
            data_out: Some(mosi),
            data_in: Some(miso),
            select: None,
        }
    }

    /// SPI slave.
    pub const fn spi_slave(sck: u8, mosi: u8, miso: u8, csn: u8) -> Self {
        Self {
            clock: Some(sck),
            data_out: Some(miso),
            data_in: Some(mosi),
            select: Some(csn),
        }
    }

    /// TWI master or slave.
    pub const fn twi(scl: u8, sda: u8) -> Self {
        Self {
            clock: Some(scl),
            data_out: Some(sda),
            data_in: None,
            select: None,
        }
    }

    /// UART without flow control.
    pub const fn uart(txd: u8, rxd: u8) -> Self {
        Self {
            clock: None,
            data_out: Some(txd),
            data_in: Some(rxd),
            select: None,
        }
    }
}
