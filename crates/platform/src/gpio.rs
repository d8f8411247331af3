//! GPIO port pin configuration.
//!
//! [`PinConfig`] mirrors the nRF PIN_CNF register field by field, because
//! the point of the harness is to measure what each field costs: a connected
//! input buffer, a pull resistor or a SENSE comparator all draw current.

/// Pin level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    /// High (logic 1)
    High,
    /// Low (logic 0)
    Low,
}

impl From<bool> for Level {
    fn from(value: bool) -> Self {
        if value {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl From<Level> for bool {
    fn from(value: Level) -> Self {
        matches!(value, Level::High)
    }
}

/// PIN_CNF.DIR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinDirection {
    /// Input
    Input,
    /// Output
    Output,
}

/// PIN_CNF.PULL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    /// No pull
    None,
    /// Pull down
    Down,
    /// Pull up
    Up,
}

/// PIN_CNF.DRIVE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Drive {
    /// Standard 0, standard 1
    S0S1,
    /// High drive 0, high drive 1
    H0H1,
    /// Standard 0, disconnect 1 (open drain)
    S0D1,
    /// High drive 0, disconnect 1 (open drain)
    H0D1,
}

/// PIN_CNF.SENSE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Sense {
    /// Sense disabled
    Disabled,
    /// Sense for high level
    High,
    /// Sense for low level
    Low,
}

/// One PIN_CNF value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    /// Direction.
    pub direction: PinDirection,
    /// Input buffer connected.
    pub input_connected: bool,
    /// Pull resistor.
    pub pull: Pull,
    /// Drive strength.
    pub drive: Drive,
    /// SENSE comparator for the PORT event.
    pub sense: Sense,
}

impl PinConfig {
    /// Reset state: input, buffer disconnected, nothing else. Draws nothing.
    pub const DISCONNECTED: Self = Self {
        direction: PinDirection::Input,
        input_connected: false,
        pull: Pull::None,
        drive: Drive::S0S1,
        sense: Sense::Disabled,
    };

    /// Push-pull output with the input buffer disconnected.
    pub const fn output(drive: Drive) -> Self {
        Self {
            direction: PinDirection::Output,
            input_connected: false,
            pull: Pull::None,
            drive,
            sense: Sense::Disabled,
        }
    }

    /// Input with the buffer connected.
    pub const fn input(pull: Pull) -> Self {
        Self {
            direction: PinDirection::Input,
            input_connected: true,
            pull,
            drive: Drive::S0S1,
            sense: Sense::Disabled,
        }
    }

    /// Keep the input buffer connected (needed to read back an output).
    pub const fn connected(mut self) -> Self {
        self.input_connected = true;
        self
    }

    /// Disconnect the input buffer.
    pub const fn disconnected(mut self) -> Self {
        self.input_connected = false;
        self
    }

    /// Set the pull resistor.
    pub const fn with_pull(mut self, pull: Pull) -> Self {
        self.pull = pull;
        self
    }

    /// Set the drive strength.
    pub const fn with_drive(mut self, drive: Drive) -> Self {
        self.drive = drive;
        self
    }

    /// Enable the SENSE comparator.
    pub const fn with_sense(mut self, sense: Sense) -> Self {
        self.sense = sense;
        self
    }

    /// Encode as a PIN_CNF register value.
    pub const fn to_bits(self) -> u32 {
        let dir = match self.direction {
            PinDirection::Input => 0,
            PinDirection::Output => 1,
        };
        let input = if self.input_connected { 0 } else { 1 << 1 };
        let pull = match self.pull {
            Pull::None => 0,
            Pull::Down => 1 << 2,
            Pull::Up => 3 << 2,
        };
        let drive = match self.drive {
            Drive::S0S1 => 0,
            Drive::H0H1 => 3 << 8,
            Drive::S0D1 => 6 << 8,
            Drive::H0D1 => 7 << 8,
        };
        let sense = match self.sense {
            Sense::Disabled => 0,
            Sense::High => 2 << 16,
            Sense::Low => 3 << 16,
        };
        dir | input | pull | drive | sense
    }

    /// Decode a PIN_CNF register value. Reserved encodings fall back to the
    /// nearest documented one.
    pub const fn from_bits(bits: u32) -> Self {
        Self {
            direction: if bits & 1 == 0 {
                PinDirection::Input
            } else {
                PinDirection::Output
            },
            input_connected: bits & (1 << 1) == 0,
            pull: match (bits >> 2) & 0b11 {
                1 => Pull::Down,
                3 => Pull::Up,
                _ => Pull::None,
            },
            drive: match (bits >> 8) & 0b111 {
                3 => Drive::H0H1,
                6 => Drive::S0D1,
                7 => Drive::H0D1,
                _ => Drive::S0S1,
            },
            sense: match (bits >> 16) & 0b11 {
                2 => Sense::High,
                3 => Sense::Low,
                _ => Sense::Disabled,
            },
        }
    }
}

impl Default for PinConfig {
    fn default() -> Self {
        Self::DISCONNECTED
    }
}

/// One GPIO port.
pub trait PinBank {
    /// Write PIN_CNF.
    fn configure(&mut self, pin: u8, config: PinConfig);

    /// Read PIN_CNF back.
    fn config(&self, pin: u8) -> PinConfig;

    /// Drive the output latch (OUTSET / OUTCLR).
    fn set_level(&mut self, pin: u8, level: Level);

    /// Sample the input (IN).
    fn level(&self, pin: u8) -> Level;

    /// Return a pin to [`PinConfig::DISCONNECTED`].
    fn disconnect(&mut self, pin: u8) {
        self.configure(pin, PinConfig::DISCONNECTED);
    }

    /// Drive `level` on the latch, then make the pin an output.
    ///
    /// Latch first so the pin never glitches to the previous level.
    fn drive(&mut self, pin: u8, level: Level, config: PinConfig) {
        self.set_level(pin, level);
        self.configure(pin, config);
    }
}
