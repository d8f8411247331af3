//! GPIOTE1, DPPIC and TIMER0 as an [`EventRouter`].
//!
//! Edge and PORT interrupts are handled in [`on_gpiote_interrupt`], which
//! masks the source, runs the optional response and wakes the waiting task.

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use platform::routing::{EdgeResponse, IdleTimeout, PortResponse};
use platform::{Channel, EventRouter, Level, Polarity, Slot, Task};

use super::pins::{bit, pulse_low};
use super::regs::{
    dppic, gpio, gpiote as g, indexed, serial, timer as t, Block, DPPIC, GPIOTE1, P0, PUBLISH, SERIAL1,
    SUBSCRIBE, TIMER0,
};
use super::serial::{power_on_active, task_offset};

const SLOTS: usize = 8;

/// CONFIG.MODE
const MODE_EVENT: u32 = 1;
const MODE_DISABLED: u32 = 0;

/// Response word: bit 31 valid, bit 8 level, bits 0..8 pin.
const RESPONSE_VALID: u32 = 1 << 31;
const RESPONSE_HIGH: u32 = 1 << 8;

static PORT_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();
static PORT_RESPONSE: Mutex<CriticalSectionRawMutex, Cell<Option<PortResponse>>> = Mutex::new(Cell::new(None));
static EDGE_SIGNALS: [Signal<CriticalSectionRawMutex, ()>; SLOTS] = [const { Signal::new() }; SLOTS];
static EDGE_RESPONSES: [AtomicU32; SLOTS] = [const { AtomicU32::new(0) }; SLOTS];

fn config_word(mode: u32, pin: u8, polarity: Polarity) -> u32 {
    mode | u32::from(pin).wrapping_shl(8) | polarity.bits().wrapping_shl(16)
}

fn slot_index(slot: Slot) -> usize {
    usize::from(slot.0)
}

/// GPIOTE1 + DPPIC + TIMER0.
pub struct Fabric {
    gpiote: Block,
    dppic: Block,
    timer: Block,
    uarte: Block,
}

impl Fabric {
    /// Take the routing blocks and enable the GPIOTE1 interrupt.
    ///
    /// Individual sources stay masked until a driver listens.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let fabric = Self {
            gpiote: GPIOTE1,
            dppic: DPPIC,
            timer: TIMER0,
            uarte: SERIAL1,
        };
        fabric.gpiote.write(g::INTENCLR, 0xFFFF_FFFF);
        let irq = interrupt::GPIOTE1;
        irq.unpend();
        irq.set_priority(Priority::P2);
        // SAFETY: the handler only touches GPIOTE1, P0, SERIAL1, DPPIC and
        // the statics above.
        unsafe { irq.enable() };
        fabric
    }
}

impl EventRouter for Fabric {
    fn watch_edge(&mut self, slot: Slot, pin: u8, polarity: Polarity) {
        self.gpiote
            .write(indexed(g::CONFIG, slot.0), config_word(MODE_EVENT, pin, polarity));
    }

    fn publish_edge(&mut self, slot: Slot, channel: Channel) {
        self.gpiote.write(indexed(g::PUBLISH_IN, slot.0), channel.bind_bits());
    }

    fn subscribe_task(&mut self, task: Task, channel: Channel) {
        self.uarte
            .write(task_offset(task).wrapping_add(SUBSCRIBE), channel.bind_bits());
    }

    fn enable_channel(&mut self, channel: Channel) {
        self.dppic.write(dppic::CHENSET, channel.mask());
    }

    fn disable_watch(&mut self, slot: Slot, pin: u8) {
        // PSEL kept so the input circuit is released cleanly.
        self.gpiote
            .write(indexed(g::CONFIG, slot.0), MODE_DISABLED | u32::from(pin).wrapping_shl(8));
    }

    fn clear_watch(&mut self, slot: Slot) {
        self.gpiote.write(indexed(g::CONFIG, slot.0), 0);
        self.gpiote.write(indexed(g::PUBLISH_IN, slot.0), 0);
    }

    fn unsubscribe_task(&mut self, task: Task) {
        self.uarte.write(task_offset(task).wrapping_add(SUBSCRIBE), 0);
    }

    fn disable_channel(&mut self, channel: Channel) {
        self.dppic.write(dppic::CHENCLR, channel.mask());
    }

    fn listen_port(&mut self, response: Option<PortResponse>) {
        PORT_RESPONSE.lock(|cell| cell.set(response));
        PORT_SIGNAL.reset();
        self.gpiote.write(g::EVENTS_PORT, 0);
        self.gpiote.write(g::INTENSET, g::PORT);
    }

    fn unlisten_port(&mut self) {
        self.gpiote.write(g::INTENCLR, g::PORT);
        self.gpiote.write(g::EVENTS_PORT, 0);
        PORT_RESPONSE.lock(|cell| cell.set(None));
    }

    async fn wait_port(&mut self) {
        PORT_SIGNAL.wait().await;
    }

    fn listen_edge(&mut self, slot: Slot, response: Option<EdgeResponse>) {
        let index = slot_index(slot);
        let word = response.map_or(0, |r| {
            let level = if r.level == Level::High { RESPONSE_HIGH } else { 0 };
            RESPONSE_VALID | level | u32::from(r.pin)
        });
        if let Some(cell) = EDGE_RESPONSES.get(index) {
            cell.store(word, Ordering::Release);
        }
        if let Some(signal) = EDGE_SIGNALS.get(index) {
            signal.reset();
        }
        self.gpiote.write(indexed(g::EVENTS_IN, slot.0), 0);
        self.gpiote.write(g::INTENSET, bit(slot.0));
    }

    fn unlisten_edge(&mut self, slot: Slot) {
        self.gpiote.write(g::INTENCLR, bit(slot.0));
        self.gpiote.write(indexed(g::EVENTS_IN, slot.0), 0);
        if let Some(cell) = EDGE_RESPONSES.get(slot_index(slot)) {
            cell.store(0, Ordering::Release);
        }
    }

    async fn wait_edge(&mut self, slot: Slot) {
        if let Some(signal) = EDGE_SIGNALS.get(slot_index(slot)) {
            signal.wait().await;
        }
    }

    fn link_idle_timeout(&mut self, timeout: IdleTimeout) {
        let timer = self.timer;
        timer.trigger(t::TASKS_STOP);
        timer.trigger(t::TASKS_CLEAR);
        timer.write(t::MODE, 0);
        // 32 bit, 16 MHz / 2^4 = 1 MHz
        timer.write(t::BITMODE, 3);
        timer.write(t::PRESCALER, 4);
        timer.write(t::CC0, timeout.micros);
        timer.write(t::SHORTS, t::COMPARE0_STOP);

        // Every byte restarts the window.
        self.uarte.write(
            serial::EVENTS_RXDRDY.wrapping_add(PUBLISH),
            timeout.restart.bind_bits(),
        );
        timer.write(t::SUBSCRIBE_START, timeout.restart.bind_bits());
        timer.write(t::SUBSCRIBE_CLEAR, timeout.restart.bind_bits());

        // Expiry stops the receiver.
        timer.write(t::PUBLISH_COMPARE0, timeout.expire.bind_bits());
        self.uarte.write(
            task_offset(timeout.stop).wrapping_add(SUBSCRIBE),
            timeout.expire.bind_bits(),
        );

        self.dppic
            .write(dppic::CHENSET, timeout.restart.mask() | timeout.expire.mask());
    }

    fn unlink_idle_timeout(&mut self, timeout: IdleTimeout) {
        self.dppic
            .write(dppic::CHENCLR, timeout.restart.mask() | timeout.expire.mask());
        self.uarte.write(serial::EVENTS_RXDRDY.wrapping_add(PUBLISH), 0);
        self.uarte.write(task_offset(timeout.stop).wrapping_add(SUBSCRIBE), 0);
        let timer = self.timer;
        timer.write(t::SUBSCRIBE_START, 0);
        timer.write(t::SUBSCRIBE_CLEAR, 0);
        timer.write(t::PUBLISH_COMPARE0, 0);
        timer.write(t::SHORTS, 0);
        timer.trigger(t::TASKS_STOP);
        timer.write(t::EVENTS_COMPARE0, 0);
    }
}

/// GPIOTE1 interrupt body.
pub(crate) fn on_gpiote_interrupt() {
    let regs = GPIOTE1;

    if regs.take(g::EVENTS_PORT) {
        regs.write(g::INTENCLR, g::PORT);
        if let Some(response) = PORT_RESPONSE.lock(Cell::take) {
            respond_to_port(response);
        }
        PORT_SIGNAL.signal(());
    }

    let armed = regs.read(g::INTENSET);
    for (index, (signal, response)) in EDGE_SIGNALS.iter().zip(EDGE_RESPONSES.iter()).enumerate() {
        let Ok(slot) = u8::try_from(index) else {
            break;
        };
        if armed & bit(slot) == 0 || !regs.take(indexed(g::EVENTS_IN, slot)) {
            continue;
        }
        let word = response.load(Ordering::Acquire);
        if word & RESPONSE_VALID != 0 {
            let pin = (word & 0xFF) as u8;
            let offset = if word & RESPONSE_HIGH != 0 {
                gpio::OUTSET
            } else {
                gpio::OUTCLR
            };
            P0.write(offset, bit(pin));
        }
        regs.write(g::INTENCLR, bit(slot));
        signal.signal(());
    }
}

/// Receiver side of the REQ/RDY handshake: start the engine, hand RDY to the
/// peer, then let RDY's falling edge stop the engine.
fn respond_to_port(response: PortResponse) {
    let PortResponse {
        start,
        ready,
        slot,
        channel,
        stop,
    } = response;
    power_on_active();
    SERIAL1.trigger(task_offset(start));
    pulse_low(ready);

    GPIOTE1.write(
        indexed(g::CONFIG, slot.0),
        config_word(MODE_EVENT, ready, Polarity::HiToLo),
    );
    GPIOTE1.write(indexed(g::PUBLISH_IN, slot.0), channel.bind_bits());
    SERIAL1.write(task_offset(stop).wrapping_add(SUBSCRIBE), channel.bind_bits());
    DPPIC.write(dppic::CHENSET, channel.mask());
}
