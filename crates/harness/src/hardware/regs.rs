//! Raw register access for the nRF9160 non-secure peripheral window.
//!
//! The harness measures what each register write costs, so it drives the
//! blocks directly instead of through the embassy-nrf drivers. Every block
//! is a fixed base address plus byte offsets from the product
//! specification.

/// One peripheral instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    base: usize,
}

impl Block {
    /// Block at `base`.
    pub const fn at(base: usize) -> Self {
        Self { base }
    }

    /// Absolute address of a register, as DPPI and EasyDMA see it.
    pub const fn addr(self, offset: usize) -> usize {
        self.base.wrapping_add(offset)
    }

    /// Volatile read.
    #[inline]
    pub fn read(self, offset: usize) -> u32 {
        // SAFETY: `base` is one of the fixed peripheral addresses below and
        // every offset used is a word-aligned register of that block.
        unsafe { core::ptr::read_volatile(self.addr(offset) as *const u32) }
    }

    /// Volatile write.
    #[inline]
    pub fn write(self, offset: usize, value: u32) {
        // SAFETY: as in `read`.
        unsafe { core::ptr::write_volatile(self.addr(offset) as *mut u32, value) }
    }

    /// Trigger a task register.
    #[inline]
    pub fn trigger(self, task: usize) {
        self.write(task, 1);
    }

    /// Read and clear an event register. Returns whether it was set.
    #[inline]
    pub fn take(self, event: usize) -> bool {
        if self.read(event) == 0 {
            return false;
        }
        self.write(event, 0);
        // Read back so the clear lands before the handler returns.
        let _ = self.read(event);
        true
    }
}

/// SERIAL1: SPIM1 / SPIS1 / TWIM1 / TWIS1 / UARTE1.
pub const SERIAL1: Block = Block::at(0x4000_9000);
/// SERIAL0 as UARTE0, the operator console.
pub const UARTE0: Block = Block::at(0x4000_8000);
/// GPIO port P0.
pub const P0: Block = Block::at(0x4084_2500);
/// GPIOTE1, the non-secure GPIOTE instance.
pub const GPIOTE1: Block = Block::at(0x4003_1000);
/// DPPI controller.
pub const DPPIC: Block = Block::at(0x4001_7000);
/// TIMER0.
pub const TIMER0: Block = Block::at(0x4000_F000);
/// POWER.
pub const POWER: Block = Block::at(0x4000_5000);

/// PSEL value for "not connected".
pub const PSEL_DISCONNECTED: u32 = 0xFFFF_FFFF;

/// SUBSCRIBE/PUBLISH enable bit.
pub const DPPI_EN: u32 = 1 << 31;

/// Offset of a SUBSCRIBE register from its task register.
pub const SUBSCRIBE: usize = 0x080;
/// Offset of a PUBLISH register from its event register.
pub const PUBLISH: usize = 0x080;

/// Offsets shared by the serial personalities.
#[allow(missing_docs)]
pub mod serial {
    pub const TASKS_STARTRX: usize = 0x000;
    pub const TASKS_STOPRX: usize = 0x004;
    pub const TASKS_STARTTX: usize = 0x008;
    pub const TASKS_STOPTX: usize = 0x00C;
    pub const TASKS_START: usize = 0x010;
    pub const TASKS_STOP: usize = 0x014;
    pub const TASKS_RESUME: usize = 0x020;
    pub const TASKS_RELEASE: usize = 0x028;
    pub const TASKS_PREPARERX: usize = 0x030;
    pub const TASKS_PREPARETX: usize = 0x034;

    pub const EVENTS_STOPPED: usize = 0x104;
    pub const EVENTS_RXDRDY: usize = 0x108;
    pub const EVENTS_ENDRX: usize = 0x110;
    pub const EVENTS_END: usize = 0x118;
    pub const EVENTS_ENDTX: usize = 0x120;
    pub const EVENTS_ERROR: usize = 0x124;
    pub const EVENTS_ACQUIRED: usize = 0x128;
    pub const EVENTS_RXTO: usize = 0x144;
    pub const EVENTS_RXSTARTED: usize = 0x14C;
    pub const EVENTS_TXSTARTED: usize = 0x150;
    pub const EVENTS_TXSTOPPED: usize = 0x158;
    pub const EVENTS_WRITE: usize = 0x164;
    pub const EVENTS_READ: usize = 0x168;

    pub const SHORTS: usize = 0x200;
    pub const INTEN: usize = 0x300;
    pub const INTENSET: usize = 0x304;
    pub const INTENCLR: usize = 0x308;
    pub const ERRORSRC_UARTE: usize = 0x480;
    pub const ERRORSRC_TWIM: usize = 0x4C4;
    pub const ERRORSRC_TWIS: usize = 0x4D0;
    pub const ENABLE: usize = 0x500;
    /// PSEL[0..4]: meaning depends on the personality.
    pub const PSEL: [usize; 4] = [0x508, 0x50C, 0x510, 0x514];
    pub const FREQUENCY: usize = 0x524;
    pub const BAUDRATE: usize = 0x524;
    pub const RXD_PTR: usize = 0x534;
    pub const RXD_MAXCNT: usize = 0x538;
    pub const RXD_AMOUNT: usize = 0x53C;
    pub const TXD_PTR: usize = 0x544;
    pub const TXD_MAXCNT: usize = 0x548;
    pub const TXD_AMOUNT: usize = 0x54C;
    pub const SPI_CONFIG: usize = 0x554;
    pub const SPIS_DEF: usize = 0x55C;
    pub const UARTE_CONFIG: usize = 0x56C;
    pub const TWI_ADDRESS: usize = 0x588;
    pub const TWIS_CONFIG: usize = 0x594;
    pub const ORC: usize = 0x5C0;
}

/// GPIO port offsets.
#[allow(missing_docs)]
pub mod gpio {
    pub const OUTSET: usize = 0x008;
    pub const OUTCLR: usize = 0x00C;
    pub const IN: usize = 0x010;
    pub const PIN_CNF: usize = 0x200;
}

/// GPIOTE offsets.
#[allow(missing_docs)]
pub mod gpiote {
    pub const EVENTS_IN: usize = 0x100;
    pub const EVENTS_PORT: usize = 0x17C;
    pub const PUBLISH_IN: usize = 0x180;
    pub const INTENSET: usize = 0x304;
    pub const INTENCLR: usize = 0x308;
    pub const CONFIG: usize = 0x510;
    /// INTEN bit for PORT.
    pub const PORT: u32 = 1 << 31;
}

/// DPPIC offsets.
#[allow(missing_docs)]
pub mod dppic {
    pub const CHENSET: usize = 0x504;
    pub const CHENCLR: usize = 0x508;
}

/// TIMER offsets.
#[allow(missing_docs)]
pub mod timer {
    pub const TASKS_START: usize = 0x000;
    pub const TASKS_STOP: usize = 0x004;
    pub const TASKS_CLEAR: usize = 0x00C;
    pub const SUBSCRIBE_START: usize = 0x080;
    pub const SUBSCRIBE_CLEAR: usize = 0x08C;
    pub const EVENTS_COMPARE0: usize = 0x140;
    pub const PUBLISH_COMPARE0: usize = 0x1C0;
    pub const SHORTS: usize = 0x200;
    pub const MODE: usize = 0x504;
    pub const BITMODE: usize = 0x508;
    pub const PRESCALER: usize = 0x510;
    pub const CC0: usize = 0x540;
    /// COMPARE0 -> STOP shortcut.
    pub const COMPARE0_STOP: u32 = 1 << 8;
}

/// POWER offsets.
#[allow(missing_docs)]
pub mod power {
    pub const TASKS_CONSTLAT: usize = 0x078;
    pub const TASKS_LOWPWR: usize = 0x07C;
}

/// Word offset of indexed register `n` in an array starting at `first`.
pub const fn indexed(first: usize, n: u8) -> usize {
    first.wrapping_add((n as usize).wrapping_mul(4))
}
