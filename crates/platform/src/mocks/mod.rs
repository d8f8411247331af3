//! Simulated test bench
//!
//! A [`MockBench`] models one nRF91 and the device on the other end of the
//! wires. It hands out a [`MockEngine`], [`MockPins`], [`MockRouter`],
//! [`MockPower`] and [`MockConsole`] that all share one state, so a pin
//! release seen by the router can trigger an engine task the way DPPI would.
//!
//! Every register-level action is appended to an ordered [`Op`] log that
//! tests assert on.

#![cfg(any(test, feature = "std"))]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use crate::completion::{Completion, CompletionSignal, LatchState};
use crate::console::Console;
use crate::engine::{Direction, EngineConfig, Event, Task, TransferEngine, TransferError};
use crate::gpio::{Drive, Level, PinBank, PinConfig, PinDirection, Pull};
use crate::peripheral::PeripheralKind;
use crate::power::{PowerControl, PowerMode};
use crate::routing::{Channel, EdgeResponse, EventRouter, IdleTimeout, Polarity, PortResponse, Slot};

/// How the simulated engine finishes a started transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Raise the completion synchronously inside the start task.
    Immediate,
    /// Raise the completion from another thread after a delay.
    Delayed(Duration),
    /// Never complete on its own; a stop task ends the transfer with the
    /// configured partial count.
    Silent,
    /// Raise ERROR with this ERRORSRC; a stop task then raises STOPPED.
    Fault(u32),
}

/// One recorded register-level action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Engine configured for a personality.
    Configure(PeripheralKind),
    /// Engine configuration released.
    Release,
    /// ENABLE written.
    Power(bool),
    /// Engine interrupts enabled.
    Listen,
    /// Engine interrupts masked.
    Unlisten,
    /// TXD.MAXCNT written.
    LoadTx(usize),
    /// RXD.MAXCNT written.
    LoadRx(usize),
    /// Task triggered; `armed` records whether the completion latch was
    /// pending at that instant.
    Trigger {
        /// Task
        task: Task,
        /// Latch was armed
        armed: bool,
    },
    /// PIN_CNF written.
    PinConfig(u8, PinConfig),
    /// OUTSET / OUTCLR.
    PinLevel(u8, Level),
    /// Short low pulse, driven from the PORT handler.
    PinPulse(u8),
    /// GPIOTE CONFIG in event mode.
    Watch(Slot, u8, Polarity),
    /// PUBLISH_IN.
    Publish(Slot, Channel),
    /// Engine SUBSCRIBE.
    Subscribe(Task, Channel),
    /// CHENSET.
    ChannelOn(Channel),
    /// Teardown phase one.
    WatchDisabled(Slot, u8),
    /// Teardown phase two.
    WatchCleared(Slot),
    /// Engine SUBSCRIBE cleared.
    Unsubscribe(Task),
    /// CHENCLR.
    ChannelOff(Channel),
    /// PORT interrupt enabled.
    PortListen,
    /// PORT interrupt disabled.
    PortUnlisten,
    /// PORT handler entered. Ops up to [`Op::PortHandlerExit`] ran in
    /// interrupt context.
    PortHandlerEnter,
    /// PORT handler returned.
    PortHandlerExit,
    /// IN[n] interrupt enabled.
    EdgeListen(Slot),
    /// IN[n] interrupt disabled.
    EdgeUnlisten(Slot),
    /// The simulated peer produced an edge on a watched pin.
    EdgeFired(Slot),
    /// Idle timer linked.
    IdleLinked(u32),
    /// Idle timer unlinked.
    IdleUnlinked,
    /// POWER task.
    PowerMode(PowerMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchMode {
    Event,
    Disabled,
}

#[derive(Debug, Clone, Copy)]
struct Watch {
    pin: u8,
    mode: WatchMode,
}

struct EngineModel {
    signal: Option<&'static CompletionSignal>,
    kind: PeripheralKind,
    powered: bool,
    listening: bool,
    response: Response,
    tx: Vec<u8>,
    rx_len: usize,
    tx_amount: usize,
    rx_amount: usize,
    in_flight: bool,
    error_src: Option<u32>,
    silent_partial: usize,
    stop_acked: bool,
    last_started: Option<Direction>,
}

struct PeerModel {
    present: bool,
    payload: Option<Vec<u8>>,
    received: Vec<u8>,
    master_direction: Option<Direction>,
}

struct BenchState {
    ops: Vec<Op>,
    engine: EngineModel,
    peer: PeerModel,
    pins: BTreeMap<u8, (PinConfig, Level)>,
    watches: BTreeMap<u8, Watch>,
    publish: BTreeMap<u8, Channel>,
    subscribe: Vec<(Task, Channel)>,
    channels: BTreeSet<u8>,
    fired: BTreeSet<u8>,
    port_listening: bool,
    power_mode: Option<PowerMode>,
    console_out: String,
    keys: VecDeque<u8>,
}

impl BenchState {
    fn new() -> Self {
        Self {
            ops: Vec::new(),
            engine: EngineModel {
                signal: None,
                kind: PeripheralKind::None,
                powered: false,
                listening: false,
                response: Response::Immediate,
                tx: Vec::new(),
                rx_len: 0,
                tx_amount: 0,
                rx_amount: 0,
                in_flight: false,
                error_src: None,
                silent_partial: 0,
                stop_acked: true,
                last_started: None,
            },
            peer: PeerModel {
                present: true,
                payload: None,
                received: Vec::new(),
                master_direction: None,
            },
            pins: BTreeMap::new(),
            watches: BTreeMap::new(),
            publish: BTreeMap::new(),
            subscribe: Vec::new(),
            channels: BTreeSet::new(),
            fired: BTreeSet::new(),
            port_listening: false,
            power_mode: None,
            console_out: String::new(),
            keys: VecDeque::new(),
        }
    }

    fn record(&mut self, op: Op) {
        tracing::trace!(?op, "bench");
        self.ops.push(op);
    }

    fn pin(&self, pin: u8) -> (PinConfig, Level) {
        self.pins
            .get(&pin)
            .copied()
            .unwrap_or((PinConfig::DISCONNECTED, Level::Low))
    }

    /// A line the local side does not hold low, so the peer may move it.
    fn released(&self, pin: u8) -> bool {
        let (config, level) = self.pin(pin);
        match config.direction {
            PinDirection::Input => true,
            PinDirection::Output => {
                matches!(config.drive, Drive::S0D1 | Drive::H0D1) && level == Level::High
            }
        }
    }

    fn is_start(&self, task: Task) -> Option<(bool, bool)> {
        // (transmit side, receive side)
        match task {
            Task::Start | Task::Release => Some((true, true)),
            Task::StartTx => Some((true, false)),
            Task::StartRx => Some((false, true)),
            _ => None,
        }
    }

    fn trigger(&mut self, task: Task, shared: &Arc<Mutex<BenchState>>) {
        let armed = self
            .engine
            .signal
            .is_some_and(|s| s.peek() == LatchState::Pending);
        self.record(Op::Trigger { task, armed });

        if let Some((tx, rx)) = self.is_start(task) {
            self.begin(tx, rx, shared);
            return;
        }

        match task {
            Task::Stop | Task::StopTx | Task::StopRx => self.stop(),
            _ => {}
        }
    }

    fn begin(&mut self, tx: bool, rx: bool, shared: &Arc<Mutex<BenchState>>) {
        let engine = &mut self.engine;
        if tx {
            engine.tx_amount = engine.tx.len();
            self.peer.received.clone_from(&engine.tx);
            engine.last_started = Some(Direction::Transmit);
        }
        if rx {
            let available = self.peer.payload.as_ref().map_or(engine.rx_len, Vec::len);
            engine.rx_amount = available.min(engine.rx_len);
            if !tx {
                engine.last_started = Some(Direction::Receive);
            }
        }

        engine.in_flight = true;
        let response = engine.response;
        match response {
            Response::Immediate => self.finish(Completion::Done),
            Response::Delayed(after) => {
                let shared = Arc::clone(shared);
                std::thread::spawn(move || {
                    std::thread::sleep(after);
                    let mut state = lock(&shared);
                    if state.engine.in_flight {
                        state.finish(Completion::Done);
                    }
                });
            }
            Response::Silent => {
                self.engine.tx_amount = 0;
                self.engine.rx_amount = 0;
            }
            Response::Fault(src) => {
                self.engine.error_src = Some(src);
                self.engine.in_flight = false;
                self.raise(Completion::Error);
            }
        }
    }

    fn stop(&mut self) {
        if !self.engine.stop_acked {
            return;
        }
        if self.engine.in_flight {
            if self.engine.response == Response::Silent {
                self.engine.rx_amount = self.engine.silent_partial.min(self.engine.rx_len);
                self.engine.tx_amount = 0;
            }
            self.finish(Completion::Done);
        } else if matches!(self.engine.response, Response::Fault(_)) {
            // STOPPED after an error.
            self.raise(Completion::Done);
        }
    }

    fn finish(&mut self, completion: Completion) {
        self.engine.in_flight = false;
        self.raise(completion);
    }

    fn raise(&mut self, completion: Completion) {
        if let Some(signal) = self.engine.signal {
            signal.complete(completion);
        }
    }

    /// Fire every fully wired route whose watched line the peer can move.
    fn evaluate_routes(&mut self, shared: &Arc<Mutex<BenchState>>) {
        if !self.peer.present {
            return;
        }
        let mut to_fire = Vec::new();
        for channel in &self.channels {
            if self.fired.contains(channel) {
                continue;
            }
            let Some((slot, watch)) = self.publish.iter().find_map(|(slot, ch)| {
                (ch.0 == *channel)
                    .then(|| self.watches.get(slot).map(|w| (*slot, *w)))
                    .flatten()
            }) else {
                continue;
            };
            if watch.mode != WatchMode::Event || !self.released(watch.pin) {
                continue;
            }
            let tasks: Vec<Task> = self
                .subscribe
                .iter()
                .filter(|(_, ch)| ch.0 == *channel)
                .map(|(task, _)| *task)
                .collect();
            if !tasks.is_empty() {
                to_fire.push((*channel, slot, tasks));
            }
        }
        for (channel, slot, tasks) in to_fire {
            self.fired.insert(channel);
            self.record(Op::EdgeFired(Slot(slot)));
            for task in tasks {
                self.trigger(task, shared);
            }
        }
    }
}

impl BenchState {
    /// Body of the PORT handler for a woken receiver.
    fn respond_to_port(&mut self, response: PortResponse, shared: &Arc<Mutex<BenchState>>) {
        let PortResponse {
            start,
            ready,
            slot,
            channel,
            stop,
        } = response;
        self.engine.powered = true;
        self.record(Op::Power(true));
        self.trigger(start, shared);
        self.record(Op::PinPulse(ready));

        self.watches.insert(
            slot.0,
            Watch {
                pin: ready,
                mode: WatchMode::Event,
            },
        );
        self.record(Op::Watch(slot, ready, Polarity::HiToLo));
        self.publish.insert(slot.0, channel);
        self.record(Op::Publish(slot, channel));
        self.subscribe.retain(|(t, _)| *t != stop);
        self.subscribe.push((stop, channel));
        self.record(Op::Subscribe(stop, channel));
        self.channels.insert(channel.0);
        self.fired.remove(&channel.0);
        self.record(Op::ChannelOn(channel));
        self.evaluate_routes(shared);
    }
}

fn lock(shared: &Arc<Mutex<BenchState>>) -> MutexGuard<'_, BenchState> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulated board plus peer device.
#[derive(Clone)]
pub struct MockBench {
    state: Arc<Mutex<BenchState>>,
    port: Arc<Signal<CriticalSectionRawMutex, ()>>,
    edge: Arc<Signal<CriticalSectionRawMutex, ()>>,
}

impl MockBench {
    /// New bench with a present peer and immediate completions.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BenchState::new())),
            port: Arc::new(Signal::new()),
            edge: Arc::new(Signal::new()),
        }
    }

    /// Engine bound to `signal`.
    pub fn engine(&self, signal: &'static CompletionSignal) -> MockEngine {
        lock(&self.state).engine.signal = Some(signal);
        MockEngine {
            state: Arc::clone(&self.state),
        }
    }

    /// GPIO port.
    pub fn pins(&self) -> MockPins {
        MockPins {
            state: Arc::clone(&self.state),
        }
    }

    /// GPIOTE / DPPI / TIMER fabric.
    pub fn router(&self) -> MockRouter {
        MockRouter {
            state: Arc::clone(&self.state),
            port: Arc::clone(&self.port),
            edge: Arc::clone(&self.edge),
        }
    }

    /// POWER block.
    pub fn power(&self) -> MockPower {
        MockPower {
            state: Arc::clone(&self.state),
        }
    }

    /// Operator console.
    pub fn console(&self) -> MockConsole {
        MockConsole {
            state: Arc::clone(&self.state),
        }
    }

    /// Choose how started transfers finish.
    pub fn set_response(&self, response: Response) {
        lock(&self.state).engine.response = response;
    }

    /// Bytes a [`Response::Silent`] transfer reports after being stopped.
    pub fn set_silent_partial(&self, bytes: usize) {
        lock(&self.state).engine.silent_partial = bytes;
    }

    /// With `false`, stop tasks are recorded but never raise STOPPED or
    /// end the transfer.
    pub fn set_stop_acknowledged(&self, acked: bool) {
        lock(&self.state).engine.stop_acked = acked;
    }

    /// Connect or disconnect the peer device.
    pub fn set_peer_present(&self, present: bool) {
        lock(&self.state).peer.present = present;
    }

    /// Bytes the peer sends when we receive.
    pub fn set_peer_payload(&self, payload: Vec<u8>) {
        lock(&self.state).peer.payload = Some(payload);
    }

    /// Force the direction a TWI master uses against our slave.
    pub fn set_master_direction(&self, direction: Direction) {
        lock(&self.state).peer.master_direction = Some(direction);
    }

    /// Bytes the peer received from the last transmit.
    pub fn peer_received(&self) -> Vec<u8> {
        lock(&self.state).peer.received.clone()
    }

    /// Queue operator key presses.
    pub fn push_keys(&self, keys: &[u8]) {
        lock(&self.state).keys.extend(keys.iter().copied());
    }

    /// Everything printed on the console so far.
    pub fn console_output(&self) -> String {
        lock(&self.state).console_out.clone()
    }

    /// Snapshot of the op log.
    pub fn ops(&self) -> Vec<Op> {
        lock(&self.state).ops.clone()
    }

    /// Empty the op log.
    pub fn clear_ops(&self) {
        lock(&self.state).ops.clear();
    }

    /// PIN_CNF and latch of every pin touched so far.
    pub fn pin_snapshot(&self) -> BTreeMap<u8, (PinConfig, Level)> {
        lock(&self.state).pins.clone()
    }

    /// Engine ENABLE state.
    pub fn engine_powered(&self) -> bool {
        lock(&self.state).engine.powered
    }

    /// Engine interrupts enabled.
    pub fn engine_listening(&self) -> bool {
        lock(&self.state).engine.listening
    }

    /// Any GPIOTE slot still configured, channel enabled or PORT listening.
    pub fn routing_idle(&self) -> bool {
        let state = lock(&self.state);
        state.watches.is_empty()
            && state.publish.is_empty()
            && state.subscribe.is_empty()
            && state.channels.is_empty()
            && !state.port_listening
    }

    /// Last POWER task triggered.
    pub fn power_mode(&self) -> Option<PowerMode> {
        lock(&self.state).power_mode
    }

    /// Count of triggers of `task`.
    pub fn trigger_count(&self, task: Task) -> usize {
        lock(&self.state)
            .ops
            .iter()
            .filter(|op| matches!(op, Op::Trigger { task: t, .. } if *t == task))
            .count()
    }
}

impl Default for MockBench {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulated EasyDMA serial block.
pub struct MockEngine {
    state: Arc<Mutex<BenchState>>,
}

impl TransferEngine for MockEngine {
    fn completion(&self) -> &'static CompletionSignal {
        static UNBOUND: CompletionSignal = CompletionSignal::new();
        lock(&self.state).engine.signal.unwrap_or(&UNBOUND)
    }

    fn configure(&mut self, config: &EngineConfig) -> Result<(), TransferError> {
        if let Some(bitrate) = config.bitrate {
            if config.kind.uses_engine()
                && !matches!(config.kind, PeripheralKind::SpiSlave | PeripheralKind::TwiSlave)
                && bitrate.register_for(config.kind).is_none()
            {
                return Err(TransferError::UnsupportedBitrate(bitrate.hz()));
            }
        }
        let mut state = lock(&self.state);
        state.engine.kind = config.kind;
        state.record(Op::Configure(config.kind));
        Ok(())
    }

    fn release(&mut self) {
        let mut state = lock(&self.state);
        state.engine.kind = PeripheralKind::None;
        state.record(Op::Release);
    }

    fn set_powered(&mut self, on: bool) {
        let mut state = lock(&self.state);
        state.engine.powered = on;
        state.record(Op::Power(on));
    }

    fn is_powered(&self) -> bool {
        lock(&self.state).engine.powered
    }

    fn listen(&mut self) {
        let mut state = lock(&self.state);
        state.engine.listening = true;
        state.record(Op::Listen);
    }

    fn unlisten(&mut self) {
        let mut state = lock(&self.state);
        state.engine.listening = false;
        state.record(Op::Unlisten);
    }

    unsafe fn load_tx(&mut self, data: &[u8]) {
        let shared = Arc::clone(&self.state);
        let mut state = lock(&self.state);
        state.engine.tx = data.to_vec();
        state.record(Op::LoadTx(data.len()));
        if state.engine.kind == PeripheralKind::TwiSlave && !data.is_empty() {
            state.twi_slave_transaction(Direction::Transmit, &shared);
        }
    }

    unsafe fn load_rx(&mut self, buf: &mut [u8]) {
        let shared = Arc::clone(&self.state);
        let mut state = lock(&self.state);
        if let Some(payload) = state.peer.payload.as_ref() {
            let n = payload.len().min(buf.len());
            if let (Some(dst), Some(src)) = (buf.get_mut(..n), payload.get(..n)) {
                dst.copy_from_slice(src);
            }
        }
        state.engine.rx_len = buf.len();
        state.record(Op::LoadRx(buf.len()));
        if state.engine.kind == PeripheralKind::TwiSlave && !buf.is_empty() {
            state.twi_slave_transaction(Direction::Receive, &shared);
        }
    }

    fn trigger(&mut self, task: Task) {
        let shared = Arc::clone(&self.state);
        lock(&self.state).trigger(task, &shared);
    }

    fn amount(&self, direction: Direction) -> usize {
        let state = lock(&self.state);
        match direction {
            Direction::Transmit => state.engine.tx_amount,
            Direction::Receive => state.engine.rx_amount,
        }
    }

    fn take_error(&mut self) -> Option<u32> {
        lock(&self.state).engine.error_src.take()
    }

    fn take_event(&mut self, event: Event) -> bool {
        let mut state = lock(&self.state);
        let hit = matches!(
            (event, state.engine.last_started),
            (Event::TxStarted, Some(Direction::Transmit))
                | (Event::RxStarted, Some(Direction::Receive))
        );
        if hit {
            state.engine.last_started = None;
        }
        hit
    }
}

impl BenchState {
    /// A TWI master addresses our slave once a buffer is prepared.
    fn twi_slave_transaction(&mut self, prepared: Direction, shared: &Arc<Mutex<BenchState>>) {
        if !self.peer.present {
            return;
        }
        let direction = self.peer.master_direction.unwrap_or(prepared);
        match direction {
            Direction::Transmit => self.begin(true, false, shared),
            Direction::Receive => self.begin(false, true, shared),
        }
    }
}

/// Simulated GPIO port.
pub struct MockPins {
    state: Arc<Mutex<BenchState>>,
}

impl PinBank for MockPins {
    fn configure(&mut self, pin: u8, config: PinConfig) {
        let shared = Arc::clone(&self.state);
        let mut state = lock(&self.state);
        let level = state.pin(pin).1;
        state.pins.insert(pin, (config, level));
        state.record(Op::PinConfig(pin, config));
        state.evaluate_routes(&shared);
    }

    fn config(&self, pin: u8) -> PinConfig {
        lock(&self.state).pin(pin).0
    }

    fn set_level(&mut self, pin: u8, level: Level) {
        let shared = Arc::clone(&self.state);
        let mut state = lock(&self.state);
        let config = state.pin(pin).0;
        state.pins.insert(pin, (config, level));
        state.record(Op::PinLevel(pin, level));
        state.evaluate_routes(&shared);
    }

    fn level(&self, pin: u8) -> Level {
        let state = lock(&self.state);
        let (config, latch) = state.pin(pin);
        match config.direction {
            PinDirection::Output => latch,
            PinDirection::Input => Level::from(config.pull == Pull::Up),
        }
    }
}

/// Simulated GPIOTE, DPPIC and TIMER0.
pub struct MockRouter {
    state: Arc<Mutex<BenchState>>,
    port: Arc<Signal<CriticalSectionRawMutex, ()>>,
    edge: Arc<Signal<CriticalSectionRawMutex, ()>>,
}

impl MockRouter {
    fn with_routes(&mut self, op: Op, f: impl FnOnce(&mut BenchState)) {
        let shared = Arc::clone(&self.state);
        let mut state = lock(&self.state);
        f(&mut *state);
        state.record(op);
        state.evaluate_routes(&shared);
    }
}

impl EventRouter for MockRouter {
    fn watch_edge(&mut self, slot: Slot, pin: u8, polarity: Polarity) {
        self.with_routes(Op::Watch(slot, pin, polarity), |s| {
            s.watches.insert(
                slot.0,
                Watch {
                    pin,
                    mode: WatchMode::Event,
                },
            );
        });
    }

    fn publish_edge(&mut self, slot: Slot, channel: Channel) {
        self.with_routes(Op::Publish(slot, channel), |s| {
            s.publish.insert(slot.0, channel);
        });
    }

    fn subscribe_task(&mut self, task: Task, channel: Channel) {
        self.with_routes(Op::Subscribe(task, channel), |s| {
            s.subscribe.retain(|(t, _)| *t != task);
            s.subscribe.push((task, channel));
        });
    }

    fn enable_channel(&mut self, channel: Channel) {
        self.with_routes(Op::ChannelOn(channel), |s| {
            s.channels.insert(channel.0);
            s.fired.remove(&channel.0);
        });
    }

    fn disable_watch(&mut self, slot: Slot, pin: u8) {
        let mut state = lock(&self.state);
        state.watches.insert(
            slot.0,
            Watch {
                pin,
                mode: WatchMode::Disabled,
            },
        );
        state.record(Op::WatchDisabled(slot, pin));
    }

    fn clear_watch(&mut self, slot: Slot) {
        let mut state = lock(&self.state);
        state.watches.remove(&slot.0);
        state.publish.remove(&slot.0);
        state.record(Op::WatchCleared(slot));
    }

    fn unsubscribe_task(&mut self, task: Task) {
        let mut state = lock(&self.state);
        state.subscribe.retain(|(t, _)| *t != task);
        state.record(Op::Unsubscribe(task));
    }

    fn disable_channel(&mut self, channel: Channel) {
        let mut state = lock(&self.state);
        state.channels.remove(&channel.0);
        state.record(Op::ChannelOff(channel));
    }

    fn listen_port(&mut self, response: Option<PortResponse>) {
        let shared = Arc::clone(&self.state);
        let mut state = lock(&self.state);
        self.port.reset();
        state.port_listening = true;
        state.record(Op::PortListen);
        if !state.peer.present {
            return;
        }
        // Peer releases REQ: our RDY line rises and SENSE trips PORT.
        state.port_listening = false;
        state.record(Op::PortHandlerEnter);
        if let Some(response) = response {
            state.respond_to_port(response, &shared);
        }
        state.record(Op::PortHandlerExit);
        self.port.signal(());
    }

    fn unlisten_port(&mut self) {
        let mut state = lock(&self.state);
        state.port_listening = false;
        state.record(Op::PortUnlisten);
    }

    async fn wait_port(&mut self) {
        self.port.wait().await;
    }

    fn listen_edge(&mut self, slot: Slot, response: Option<EdgeResponse>) {
        let mut state = lock(&self.state);
        state.record(Op::EdgeListen(slot));
        if state.peer.present {
            if let Some(response) = response {
                let config = state.pin(response.pin).0;
                state.pins.insert(response.pin, (config, response.level));
                state.record(Op::PinLevel(response.pin, response.level));
            }
            state.record(Op::EdgeFired(slot));
            self.edge.signal(());
        }
    }

    fn unlisten_edge(&mut self, slot: Slot) {
        lock(&self.state).record(Op::EdgeUnlisten(slot));
    }

    async fn wait_edge(&mut self, _slot: Slot) {
        self.edge.wait().await;
    }

    fn link_idle_timeout(&mut self, timeout: IdleTimeout) {
        lock(&self.state).record(Op::IdleLinked(timeout.micros));
    }

    fn unlink_idle_timeout(&mut self, _timeout: IdleTimeout) {
        lock(&self.state).record(Op::IdleUnlinked);
    }
}

/// Simulated POWER block.
pub struct MockPower {
    state: Arc<Mutex<BenchState>>,
}

impl PowerControl for MockPower {
    fn set_mode(&mut self, mode: PowerMode) {
        let mut state = lock(&self.state);
        state.power_mode = Some(mode);
        state.record(Op::PowerMode(mode));
    }

    fn mode(&self) -> Option<PowerMode> {
        lock(&self.state).power_mode
    }
}

/// Simulated operator console.
pub struct MockConsole {
    state: Arc<Mutex<BenchState>>,
}

impl Console for MockConsole {
    fn print(&mut self, args: core::fmt::Arguments<'_>) {
        use core::fmt::Write as _;
        let _ = lock(&self.state).console_out.write_fmt(args);
    }

    async fn read_key(&mut self) -> u8 {
        loop {
            if let Some(key) = lock(&self.state).keys.pop_front() {
                return key;
            }
            embassy_time::Timer::after_millis(1).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn leak() -> &'static CompletionSignal {
        Box::leak(Box::new(CompletionSignal::new()))
    }

    #[test]
    fn immediate_response_completes_inside_start() {
        let bench = MockBench::new();
        let signal = leak();
        let mut engine = bench.engine(signal);
        signal.arm();
        // SAFETY: mock engine copies the data immediately.
        unsafe { engine.load_tx(&[1, 2, 3]) };
        engine.trigger(Task::StartTx);
        assert_eq!(signal.settled(), Some(Completion::Done));
        assert_eq!(engine.amount(Direction::Transmit), 3);
        assert_eq!(bench.peer_received(), vec![1, 2, 3]);
    }

    #[test]
    fn silent_transfer_completes_on_stop() {
        let bench = MockBench::new();
        bench.set_response(Response::Silent);
        bench.set_silent_partial(4);
        let signal = leak();
        let mut engine = bench.engine(signal);
        let mut buf = [0u8; 16];
        signal.arm();
        // SAFETY: buf outlives the engine use below.
        unsafe { engine.load_rx(&mut buf) };
        engine.trigger(Task::StartRx);
        assert_eq!(signal.settled(), None);
        engine.trigger(Task::StopRx);
        assert_eq!(signal.settled(), Some(Completion::Done));
        assert_eq!(engine.amount(Direction::Receive), 4);
    }

    #[test]
    fn route_fires_when_line_released() {
        let bench = MockBench::new();
        let signal = leak();
        let _engine = bench.engine(signal);
        let mut pins = bench.pins();
        let mut router = bench.router();
        pins.drive(2, Level::Low, PinConfig::output(Drive::S0S1).connected());
        router.link_edge(Slot(0), 2, Polarity::HiToLo, Channel(1), Task::StartTx);
        assert_eq!(bench.trigger_count(Task::StartTx), 0);
        pins.configure(2, PinConfig::input(Pull::Up));
        assert_eq!(bench.trigger_count(Task::StartTx), 1);
    }

    #[test]
    fn port_response_runs_inside_handler() {
        let bench = MockBench::new();
        let signal = leak();
        let _engine = bench.engine(signal);
        let mut router = bench.router();
        signal.arm();
        router.listen_port(Some(PortResponse {
            start: Task::StartRx,
            ready: 5,
            slot: Slot(1),
            channel: Channel(2),
            stop: Task::StopRx,
        }));
        let ops = bench.ops();
        assert_eq!(
            ops.iter().take(3).copied().collect::<Vec<_>>(),
            vec![Op::PortListen, Op::PortHandlerEnter, Op::Power(true)]
        );
        assert_eq!(ops.last(), Some(&Op::PortHandlerExit));
        assert!(ops.contains(&Op::Trigger {
            task: Task::StartRx,
            armed: true
        }));
        assert!(bench.engine_powered());
    }

    #[test]
    fn trigger_records_armed_latch() {
        let bench = MockBench::new();
        let signal = leak();
        let mut engine = bench.engine(signal);
        signal.complete(Completion::Done);
        engine.trigger(Task::Stop);
        signal.arm();
        engine.trigger(Task::Start);
        assert_eq!(
            bench.ops(),
            vec![
                Op::Trigger {
                    task: Task::Stop,
                    armed: false
                },
                Op::Trigger {
                    task: Task::Start,
                    armed: true
                },
            ]
        );
    }
}
