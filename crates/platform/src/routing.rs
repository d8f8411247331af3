//! Event routing: GPIOTE edge watches, DPPI channels and the idle timer.
//!
//! The nRF91 can connect a hardware *event* directly to a hardware *task*
//! through a DPPI channel: the event publishes on the channel, the task
//! subscribes to it, and the channel is enabled. No interrupt, no CPU wake.
//!
//! ```text
//!   GPIOTE CONFIG[slot] ──PUBLISH_IN[slot]──► DPPI channel ──SUBSCRIBE──► UARTE task
//! ```
//!
//! # Teardown
//!
//! A GPIOTE slot in event mode keeps its input sampling circuit alive. Going
//! straight from event mode to `CONFIG = 0` can leave that circuit partially
//! active and drawing tens of microamps. The slot must first be set to
//! disabled mode with PSEL still pointing at the pin, and only then cleared.
//! [`EventRouter::unlink_edge`] performs the two phases in that order.

use crate::engine::Task;

/// GPIOTE configuration slot (CONFIG[n]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Slot(pub u8);

/// DPPI channel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel(pub u8);

impl Channel {
    /// CHENSET / CHENCLR bit mask.
    pub const fn mask(self) -> u32 {
        1u32.wrapping_shl(self.0 as u32)
    }

    /// PUBLISH_x / SUBSCRIBE_x register value: channel plus enable bit.
    pub const fn bind_bits(self) -> u32 {
        (1u32 << 31) | self.0 as u32
    }
}

/// GPIOTE edge polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Rising edge
    LoToHi,
    /// Falling edge
    HiToLo,
    /// Both edges
    Toggle,
}

impl Polarity {
    /// CONFIG.POLARITY field value.
    pub const fn bits(self) -> u32 {
        match self {
            Self::LoToHi => 1,
            Self::HiToLo => 2,
            Self::Toggle => 3,
        }
    }
}

/// Pin to drive from the interrupt handler when an edge watch fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeResponse {
    /// Output pin.
    pub pin: u8,
    /// Level to drive.
    pub level: crate::gpio::Level,
}

/// Work the PORT interrupt handler does for a receiver woken by its peer,
/// before it wakes the waiting task:
///
/// 1. power the engine and trigger `start`;
/// 2. pulse `ready` low, telling the peer the receiver is listening;
/// 3. route `ready`'s next falling edge through `slot` and `channel` to
///    `stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortResponse {
    /// Engine task triggered once powered.
    pub start: Task,
    /// Handshake line pulsed low, then watched.
    pub ready: u8,
    /// GPIOTE slot watching `ready`.
    pub slot: Slot,
    /// Channel carrying the falling edge.
    pub channel: Channel,
    /// Engine task subscribed to `channel`.
    pub stop: Task,
}

/// Idle-timeout link: an engine event restarts a timer, the timer's compare
/// event stops the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IdleTimeout {
    /// Compare value in microseconds (1 MHz timer).
    pub micros: u32,
    /// Channel carrying "byte received" to timer START and CLEAR.
    pub restart: Channel,
    /// Channel carrying timer COMPARE0 to the engine stop task.
    pub expire: Channel,
    /// Engine task stopped on expiry.
    pub stop: Task,
}

/// GPIOTE + DPPIC + TIMER routing fabric.
pub trait EventRouter {
    /// Put `slot` in event mode on `pin`.
    fn watch_edge(&mut self, slot: Slot, pin: u8, polarity: Polarity);

    /// Publish `slot`'s IN event on `channel`.
    fn publish_edge(&mut self, slot: Slot, channel: Channel);

    /// Subscribe an engine task to `channel`.
    fn subscribe_task(&mut self, task: Task, channel: Channel);

    /// CHENSET.
    fn enable_channel(&mut self, channel: Channel);

    /// Teardown phase one: CONFIG = disabled mode, PSEL kept on `pin`.
    fn disable_watch(&mut self, slot: Slot, pin: u8);

    /// Teardown phase two: CONFIG = 0 and PUBLISH_IN = 0.
    fn clear_watch(&mut self, slot: Slot);

    /// Clear the engine task's SUBSCRIBE register.
    fn unsubscribe_task(&mut self, task: Task);

    /// CHENCLR.
    fn disable_channel(&mut self, channel: Channel);

    /// Clear EVENTS_PORT, enable the PORT interrupt and unmask the IRQ.
    /// When it fires the handler masks PORT, runs `response` and then wakes
    /// the waiter.
    ///
    /// PORT uses the pins' SENSE comparators, which idle far below an IN[n]
    /// watch.
    fn listen_port(&mut self, response: Option<PortResponse>);

    /// Disable the PORT interrupt, clear EVENTS_PORT and drop any pending
    /// response. A handler that already ran still leaves its wakeup behind.
    fn unlisten_port(&mut self);

    /// Suspend until the PORT interrupt fires. Resolves at most once per
    /// [`listen_port`](Self::listen_port), after the response has run.
    fn wait_port(&mut self) -> impl core::future::Future<Output = ()>;

    /// Enable the IN[slot] interrupt. When it fires the handler drives
    /// `response` first, then masks IN[slot] and wakes the waiter.
    fn listen_edge(&mut self, slot: Slot, response: Option<EdgeResponse>);

    /// Mask the IN[slot] interrupt.
    fn unlisten_edge(&mut self, slot: Slot);

    /// Suspend until the IN[slot] interrupt fires.
    fn wait_edge(&mut self, slot: Slot) -> impl core::future::Future<Output = ()>;

    /// Configure the idle timer and wire both channels.
    fn link_idle_timeout(&mut self, timeout: IdleTimeout);

    /// Undo [`link_idle_timeout`](Self::link_idle_timeout).
    fn unlink_idle_timeout(&mut self, timeout: IdleTimeout);

    /// Route an edge on `pin` to an engine task through `channel`.
    ///
    /// The channel is enabled last, so the route is live only once every
    /// hop is configured.
    fn link_edge(&mut self, slot: Slot, pin: u8, polarity: Polarity, channel: Channel, task: Task) {
        self.watch_edge(slot, pin, polarity);
        self.publish_edge(slot, channel);
        self.subscribe_task(task, channel);
        self.enable_channel(channel);
    }

    /// Two-phase teardown of a route built by [`link_edge`](Self::link_edge).
    fn unlink_edge(&mut self, slot: Slot, pin: u8, channel: Channel, task: Task) {
        self.disable_watch(slot, pin);
        self.clear_watch(slot);
        self.unsubscribe_task(task);
        self.disable_channel(channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_bits() {
        assert_eq!(Channel(1).mask(), 0b10);
        assert_eq!(Channel(2).bind_bits(), 0x8000_0002);
    }

    #[test]
    fn polarity_field() {
        assert_eq!(Polarity::HiToLo.bits(), 2);
    }
}
