//! Transfer state machine.
//!
//! ```text
//! Uninitialized ──init──► Idle ──arm──► Armed ──settle──► Idle ──deinit──► Uninitialized
//! ```
//!
//! Only [`TransferMachine::arm`] enters `Armed`. [`TransferMachine::settle`]
//! leaves it, or [`TransferMachine::abandon`] when nothing was started.
//! `settle` resolves one of three ways:
//!
//! - **completion**: the interrupt latched `Done`, the hardware amount is
//!   returned;
//! - **error**: the interrupt latched `Error`, ERRORSRC is read and cleared,
//!   the stop task runs and its acknowledgement is awaited, then
//!   [`TransferError::Hardware`] is returned;
//! - **timeout**: the deadline passed while the latch was still pending.
//!   The timeout claims the latch, triggers the stop task once and returns
//!   the partial amount the hardware reports.
//!
//! A completion that races the deadline wins if it latched first; the
//! timeout path only runs cleanup when its claim succeeds.
//!
//! If either cleanup path gets no stop acknowledgement within the ack
//! window, `settle` fails with [`TransferError::StopUnacknowledged`] and the
//! machine stays `Armed`: the engine may still be writing the buffer. Only
//! [`TransferMachine::deinit`] clears that state.

use embassy_futures::select::{select, Either};
use embassy_time::{with_timeout, Duration, Timer};
use platform::{Completion, CompletionSignal, Direction, EngineConfig, Task, TransferEngine, TransferError};

/// How the caller is suspended while a transfer is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitMode {
    /// Sleep until the completion interrupt wakes the task.
    Sleep,
    /// Poll the latch without sleeping. Exists to measure the cost of
    /// busy-waiting against [`WaitMode::Sleep`].
    BusyPoll,
}

/// What a settled deadline means for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeoutPolicy {
    /// Stop early and return the partial count.
    Partial,
    /// Return [`TransferError::TimedOut`].
    Fail,
}

/// How one transfer is started, bounded and stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    /// Which amount register reports the result.
    pub direction: Direction,
    /// Task that starts the transfer. `None` when the peer starts it.
    pub start: Option<Task>,
    /// Task that ends the transfer early.
    pub stop: Option<Task>,
    /// Give up after this long.
    pub deadline: Option<Duration>,
    /// What the deadline means.
    pub on_timeout: TimeoutPolicy,
}

impl Plan {
    /// Start with `start`, wait with no deadline.
    pub const fn new(direction: Direction, start: Task) -> Self {
        Self {
            direction,
            start: Some(start),
            stop: None,
            deadline: None,
            on_timeout: TimeoutPolicy::Partial,
        }
    }

    /// Wait for a peer-started transfer.
    pub const fn peer_started(direction: Direction) -> Self {
        Self {
            direction,
            start: None,
            stop: None,
            deadline: None,
            on_timeout: TimeoutPolicy::Partial,
        }
    }

    /// Task used to stop the engine after an error or a timeout.
    pub const fn stop_with(mut self, task: Task) -> Self {
        self.stop = Some(task);
        self
    }

    /// Bound the wait.
    pub const fn deadline(mut self, after: Duration, policy: TimeoutPolicy) -> Self {
        self.deadline = Some(after);
        self.on_timeout = policy;
        self
    }

    /// Bound the wait only if `after` is set.
    pub const fn maybe_deadline(self, after: Option<Duration>, policy: TimeoutPolicy) -> Self {
        match after {
            Some(after) => self.deadline(after, policy),
            None => self,
        }
    }
}

/// Result of a settled transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Outcome {
    /// Hardware-reported byte count.
    pub amount: usize,
    /// The deadline ended the transfer.
    pub timed_out: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum State {
    Uninitialized,
    Idle,
    Armed,
}

/// Drives one [`TransferEngine`] through its transfer lifecycle.
pub struct TransferMachine<E> {
    engine: E,
    state: State,
    wait: WaitMode,
    stop_ack: Duration,
}

impl<E: TransferEngine> TransferMachine<E> {
    /// Wrap an engine. The machine starts `Uninitialized`.
    pub fn new(engine: E, wait: WaitMode, stop_ack: Duration) -> Self {
        Self {
            engine,
            state: State::Uninitialized,
            wait,
            stop_ack,
        }
    }

    /// Configure the engine and bind its interrupt.
    ///
    /// `powered` leaves the engine enabled between transfers. The low-power
    /// UART passes `false` and powers it per transfer.
    pub fn init(&mut self, config: &EngineConfig, powered: bool) -> Result<(), TransferError> {
        if self.state != State::Uninitialized {
            return Err(TransferError::Busy);
        }
        self.engine.configure(config)?;
        self.engine.listen();
        self.engine.set_powered(powered);
        self.state = State::Idle;
        debug!("engine up as {}", config.kind.name());
        Ok(())
    }

    /// Mask interrupts, power down and release the engine.
    ///
    /// Harmless when already uninitialized.
    pub fn deinit(&mut self) {
        if self.state == State::Uninitialized {
            return;
        }
        self.engine.unlisten();
        self.engine.set_powered(false);
        self.engine.release();
        self.state = State::Uninitialized;
    }

    /// `true` between [`init`](Self::init) and [`deinit`](Self::deinit).
    pub fn is_initialised(&self) -> bool {
        self.state != State::Uninitialized
    }

    /// `true` while a transfer is in flight.
    pub fn is_armed(&self) -> bool {
        self.state == State::Armed
    }

    /// Change how the caller waits.
    pub fn set_wait_mode(&mut self, wait: WaitMode) {
        self.wait = wait;
    }

    /// Borrow the engine, for buffer loads and driver-specific tasks.
    pub fn engine(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Clear the completion latch. Must run before any task that can raise
    /// the completion.
    pub fn arm(&mut self) -> Result<(), TransferError> {
        match self.state {
            State::Uninitialized => Err(TransferError::NotInitialised),
            State::Armed => Err(TransferError::Busy),
            State::Idle => {
                self.engine.completion().arm();
                self.state = State::Armed;
                Ok(())
            }
        }
    }

    /// Return an armed machine to idle when the transfer was never started.
    pub fn abandon(&mut self) {
        if self.state == State::Armed {
            self.state = State::Idle;
        }
    }

    /// [`arm`](Self::arm), trigger the plan's start task, then
    /// [`settle`](Self::settle).
    pub async fn run(&mut self, plan: &Plan) -> Result<Outcome, TransferError> {
        self.arm()?;
        if let Some(start) = plan.start {
            self.engine.trigger(start);
        }
        self.settle(plan).await
    }

    /// Wait for the armed transfer to complete, fail or time out.
    pub async fn settle(&mut self, plan: &Plan) -> Result<Outcome, TransferError> {
        if self.state != State::Armed {
            return Err(TransferError::NotInitialised);
        }
        let signal = self.engine.completion();

        let (completion, timed_out) = match plan.deadline {
            None => (self.wait_on(signal).await, false),
            Some(after) => {
                let raced = select(self.wait_on(signal), Timer::after(after)).await;
                match raced {
                    Either::First(completion) => (completion, false),
                    Either::Second(()) => self.expire(signal, plan).await?,
                }
            }
        };

        let result = match completion {
            Completion::Error => Err(self.recover(signal, plan).await?),
            Completion::Done if timed_out && plan.on_timeout == TimeoutPolicy::Fail => {
                Err(TransferError::TimedOut)
            }
            Completion::Done => Ok(Outcome {
                amount: self.engine.amount(plan.direction),
                timed_out,
            }),
        };
        self.state = State::Idle;
        result
    }

    async fn wait_on(&self, signal: &'static CompletionSignal) -> Completion {
        match self.wait {
            WaitMode::Sleep => signal.wait().await,
            WaitMode::BusyPoll => signal.spin().await,
        }
    }

    /// Deadline passed. Claim the latch, stop once, wait for the ack.
    async fn expire(
        &mut self,
        signal: &'static CompletionSignal,
        plan: &Plan,
    ) -> Result<(Completion, bool), TransferError> {
        if !signal.expire() {
            // The interrupt landed first; its outcome stands.
            return Ok((self.wait_on(signal).await, false));
        }
        debug!("transfer deadline passed");
        if let Some(stop) = plan.stop {
            self.stop(signal, stop).await?;
        }
        Ok((Completion::Done, true))
    }

    /// Error latched. Clear ERRORSRC, stop the engine, report.
    async fn recover(&mut self, signal: &'static CompletionSignal, plan: &Plan) -> Result<TransferError, TransferError> {
        let source = self.engine.take_error();
        warn!("engine error, ERRORSRC {}", source.unwrap_or(0));
        if let Some(stop) = plan.stop {
            signal.arm();
            self.stop(signal, stop).await?;
        }
        Ok(TransferError::from_errorsrc(source))
    }

    /// Trigger `task` and wait for the engine to acknowledge it.
    async fn stop(&mut self, signal: &'static CompletionSignal, task: Task) -> Result<(), TransferError> {
        self.engine.trigger(task);
        if with_timeout(self.stop_ack, self.wait_on(signal)).await.is_err() {
            warn!("no stop acknowledgement, engine left armed");
            return Err(TransferError::StopUnacknowledged);
        }
        Ok(())
    }
}

/// Reject zero-length and oversized requests.
pub fn check_length(requested: usize, capacity: usize) -> Result<(), TransferError> {
    let capacity = capacity.min(platform::engine::MAX_COUNT);
    if requested == 0 || requested > capacity {
        return Err(TransferError::InvalidLength {
            requested,
            capacity,
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use platform::mocks::{MockBench, MockEngine, Op, Response};
    use platform::PeripheralKind;

    use super::*;

    fn machine(bench: &MockBench) -> TransferMachine<MockEngine> {
        let signal: &'static CompletionSignal = Box::leak(Box::new(CompletionSignal::new()));
        let mut machine = TransferMachine::new(bench.engine(signal), WaitMode::Sleep, Duration::from_millis(50));
        machine
            .init(&EngineConfig::new(PeripheralKind::TwiMaster), true)
            .unwrap();
        machine
    }

    #[tokio::test]
    async fn completes_with_hardware_amount() {
        let bench = MockBench::new();
        let mut machine = machine(&bench);
        let data = [0u8; 32];
        // SAFETY: the mock copies the buffer on load.
        unsafe { machine.engine().load_tx(&data) };
        let outcome = machine.run(&Plan::new(Direction::Transmit, Task::StartTx)).await.unwrap();
        assert_eq!(outcome, Outcome { amount: 32, timed_out: false });
        assert!(!machine.is_armed());
    }

    #[tokio::test]
    async fn latch_is_armed_before_start() {
        let bench = MockBench::new();
        let mut machine = machine(&bench);
        bench.clear_ops();
        machine.run(&Plan::new(Direction::Transmit, Task::StartTx)).await.unwrap();
        assert_eq!(
            bench.ops().first(),
            Some(&Op::Trigger { task: Task::StartTx, armed: true })
        );
    }

    #[tokio::test]
    async fn error_stops_once_and_reports_source() {
        let bench = MockBench::new();
        bench.set_response(Response::Fault(2));
        let mut machine = machine(&bench);
        let plan = Plan::new(Direction::Transmit, Task::StartTx).stop_with(Task::Stop);
        let err = machine.run(&plan).await.unwrap_err();
        assert_eq!(err, TransferError::Hardware(2));
        assert_eq!(err.code(), -2);
        assert_eq!(bench.trigger_count(Task::Stop), 1);
        assert!(!machine.is_armed());
    }

    #[tokio::test]
    async fn timeout_returns_partial_count() {
        let bench = MockBench::new();
        bench.set_response(Response::Silent);
        bench.set_silent_partial(0);
        let mut machine = machine(&bench);
        let mut buf = [0u8; 16];
        // SAFETY: `buf` outlives the transfer.
        unsafe { machine.engine().load_rx(&mut buf) };
        let plan = Plan::new(Direction::Receive, Task::StartRx)
            .stop_with(Task::StopRx)
            .deadline(Duration::from_millis(30), TimeoutPolicy::Partial);

        let started = std::time::Instant::now();
        let outcome = machine.run(&plan).await.unwrap();
        assert!(started.elapsed() < std::time::Duration::from_millis(500));
        assert_eq!(outcome, Outcome { amount: 0, timed_out: true });
        assert_eq!(bench.trigger_count(Task::StopRx), 1);
    }

    #[tokio::test]
    async fn error_without_source_is_unknown_fault() {
        let bench = MockBench::new();
        bench.set_response(Response::Fault(0));
        let mut machine = machine(&bench);
        let plan = Plan::new(Direction::Transmit, Task::StartTx).stop_with(Task::Stop);
        let err = machine.run(&plan).await.unwrap_err();
        assert_eq!(err, TransferError::UnknownFault);
        assert_ne!(err.code(), 0);
        assert!(!machine.is_armed());
    }

    #[tokio::test]
    async fn unacknowledged_stop_after_timeout_keeps_machine_armed() {
        let bench = MockBench::new();
        bench.set_response(Response::Silent);
        bench.set_stop_acknowledged(false);
        let mut machine = machine(&bench);
        let mut buf = [0u8; 16];
        // SAFETY: `buf` outlives the transfer.
        unsafe { machine.engine().load_rx(&mut buf) };
        let plan = Plan::new(Direction::Receive, Task::StartRx)
            .stop_with(Task::StopRx)
            .deadline(Duration::from_millis(10), TimeoutPolicy::Partial);

        assert_eq!(machine.run(&plan).await, Err(TransferError::StopUnacknowledged));
        assert_eq!(bench.trigger_count(Task::StopRx), 1);
        assert!(machine.is_armed());
        assert_eq!(machine.arm(), Err(TransferError::Busy));

        machine.deinit();
        assert!(!machine.is_initialised());
        machine
            .init(&EngineConfig::new(PeripheralKind::TwiMaster), true)
            .unwrap();
        assert!(machine.arm().is_ok());
    }

    #[tokio::test]
    async fn unacknowledged_stop_after_error_keeps_machine_armed() {
        let bench = MockBench::new();
        bench.set_response(Response::Fault(2));
        bench.set_stop_acknowledged(false);
        let mut machine = machine(&bench);
        let plan = Plan::new(Direction::Transmit, Task::StartTx).stop_with(Task::Stop);
        assert_eq!(machine.run(&plan).await, Err(TransferError::StopUnacknowledged));
        assert!(machine.is_armed());
    }

    #[tokio::test]
    async fn timeout_can_fail() {
        let bench = MockBench::new();
        bench.set_response(Response::Silent);
        let mut machine = machine(&bench);
        let plan = Plan::peer_started(Direction::Receive)
            .deadline(Duration::from_millis(10), TimeoutPolicy::Fail);
        machine.arm().unwrap();
        assert_eq!(machine.settle(&plan).await, Err(TransferError::TimedOut));
    }

    #[tokio::test]
    async fn completion_before_deadline_wins() {
        let bench = MockBench::new();
        bench.set_response(Response::Delayed(std::time::Duration::from_millis(5)));
        let mut machine = machine(&bench);
        let plan = Plan::new(Direction::Transmit, Task::StartTx)
            .stop_with(Task::StopTx)
            .deadline(Duration::from_secs(2), TimeoutPolicy::Partial);
        let outcome = machine.run(&plan).await.unwrap();
        assert!(!outcome.timed_out);
        assert_eq!(bench.trigger_count(Task::StopTx), 0);
    }

    #[tokio::test]
    async fn busy_poll_observes_completion() {
        let bench = MockBench::new();
        bench.set_response(Response::Delayed(std::time::Duration::from_millis(5)));
        let mut machine = machine(&bench);
        machine.set_wait_mode(WaitMode::BusyPoll);
        let outcome = machine.run(&Plan::new(Direction::Transmit, Task::StartTx)).await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn hundred_immediate_completions_are_all_seen() {
        let bench = MockBench::new();
        let mut machine = machine(&bench);
        let data = [0u8; 4];
        for _ in 0..100 {
            // SAFETY: the mock copies the buffer on load.
            unsafe { machine.engine().load_tx(&data) };
            let outcome = tokio::time::timeout(
                std::time::Duration::from_secs(1),
                machine.run(&Plan::new(Direction::Transmit, Task::StartTx)),
            )
            .await
            .expect("missed wakeup");
            assert_eq!(outcome.unwrap().amount, 4);
        }
    }

    #[test]
    fn arm_requires_init_and_rejects_double_arm() {
        let bench = MockBench::new();
        let signal: &'static CompletionSignal = Box::leak(Box::new(CompletionSignal::new()));
        let mut machine = TransferMachine::new(bench.engine(signal), WaitMode::Sleep, Duration::from_millis(1));
        assert_eq!(machine.arm(), Err(TransferError::NotInitialised));
        machine
            .init(&EngineConfig::new(PeripheralKind::Uart), true)
            .unwrap();
        machine.arm().unwrap();
        assert_eq!(machine.arm(), Err(TransferError::Busy));
    }

    #[test]
    fn init_twice_needs_deinit() {
        let bench = MockBench::new();
        let mut machine = machine(&bench);
        let config = EngineConfig::new(PeripheralKind::TwiMaster);
        assert_eq!(machine.init(&config, true), Err(TransferError::Busy));
        machine.deinit();
        machine.deinit();
        assert!(machine.init(&config, true).is_ok());
    }

    #[test]
    fn length_bounds() {
        assert!(check_length(16, 8192).is_ok());
        assert!(check_length(0, 8192).is_err());
        assert!(check_length(8192, 8192).is_err());
        assert!(check_length(8191, 8192).is_ok());
    }

    proptest::proptest! {
        #[test]
        fn accepted_lengths_fit_buffer_and_maxcnt(requested in 0usize..20_000, capacity in 0usize..20_000) {
            let ok = check_length(requested, capacity).is_ok();
            let fits = requested > 0 && requested <= capacity && requested <= platform::engine::MAX_COUNT;
            proptest::prop_assert_eq!(ok, fits);
        }
    }
}
