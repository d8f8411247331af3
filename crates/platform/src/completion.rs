//! Interrupt to task completion latch.
//!
//! A [`CompletionSignal`] bridges a peripheral interrupt handler and the
//! single task blocked on a transfer. It combines an atomic latch, which
//! records *what* happened, with an [`embassy_sync::signal::Signal`], which
//! wakes the waiter.
//!
//! # Ordering
//!
//! [`CompletionSignal::arm`] must run strictly before the hardware task that
//! can raise the completion is triggered. A completion that lands between
//! `arm` and the first poll of [`CompletionSignal::wait`] is kept in the
//! latch and observed immediately, so no wakeup is lost.
//!
//! # Race between completion and timeout
//!
//! The latch only ever moves *up* the ordering
//! `Pending < TimedOut < Done < Error`. A timeout claims the transfer with
//! [`CompletionSignal::expire`], a compare-and-swap from `Pending`. If the
//! interrupt got there first the swap fails and the completion wins. Exactly
//! one of the two paths therefore owns the cleanup.

use core::sync::atomic::{AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

const PENDING: u8 = 0;
const TIMED_OUT: u8 = 1;
const DONE: u8 = 2;
const ERROR: u8 = 3;

/// Terminal outcome reported by an interrupt handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Completion {
    /// The engine finished the transfer (END, ENDTX, ENDRX, STOPPED).
    Done,
    /// The engine raised its ERROR event.
    Error,
}

impl Completion {
    const fn code(self) -> u8 {
        match self {
            Self::Done => DONE,
            Self::Error => ERROR,
        }
    }
}

/// Current latch state, as seen by [`CompletionSignal::peek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LatchState {
    /// Armed, nothing happened yet.
    Pending,
    /// A timeout claimed the transfer and is waiting for the stop ack.
    TimedOut,
    /// Terminal completion.
    Settled(Completion),
}

/// Single-slot completion latch shared by one interrupt handler and one
/// waiter.
pub struct CompletionSignal {
    state: AtomicU8,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl CompletionSignal {
    /// Create an armed signal. Usable in a `static`.
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(PENDING),
            wake: Signal::new(),
        }
    }

    /// Clear any previous outcome. Call before starting the hardware task.
    pub fn arm(&self) {
        self.wake.reset();
        self.state.store(PENDING, Ordering::Release);
    }

    /// Record a completion and wake the waiter. Interrupt-safe.
    ///
    /// A later, lower-ranked completion never overwrites an earlier error.
    pub fn complete(&self, completion: Completion) {
        self.state.fetch_max(completion.code(), Ordering::AcqRel);
        self.wake.signal(());
    }

    /// Claim the transfer for the timeout path.
    ///
    /// Returns `true` if the latch was still pending, in which case the
    /// caller must stop the engine and await the stop acknowledgement.
    /// Returns `false` if a completion already landed.
    pub fn expire(&self) -> bool {
        self.state
            .compare_exchange(PENDING, TIMED_OUT, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Snapshot of the latch.
    pub fn peek(&self) -> LatchState {
        match self.state.load(Ordering::Acquire) {
            PENDING => LatchState::Pending,
            TIMED_OUT => LatchState::TimedOut,
            DONE => LatchState::Settled(Completion::Done),
            _ => LatchState::Settled(Completion::Error),
        }
    }

    /// Terminal completion, if one has been latched.
    pub fn settled(&self) -> Option<Completion> {
        match self.peek() {
            LatchState::Settled(completion) => Some(completion),
            LatchState::Pending | LatchState::TimedOut => None,
        }
    }

    /// Suspend until a terminal completion is latched.
    ///
    /// The task sleeps between interrupts; the executor parks the core in
    /// WFE while nothing is runnable.
    pub async fn wait(&self) -> Completion {
        loop {
            if let Some(completion) = self.settled() {
                return completion;
            }
            self.wake.wait().await;
        }
    }

    /// Busy-poll variant of [`wait`](Self::wait), kept for power comparison.
    ///
    /// Yields to the executor on each poll so other tasks still run, but the
    /// core never sleeps.
    pub async fn spin(&self) -> Completion {
        loop {
            if let Some(completion) = self.settled() {
                return completion;
            }
            embassy_futures::yield_now().await;
        }
    }
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completion_before_wait_is_not_lost() {
        let signal = CompletionSignal::new();
        signal.arm();
        signal.complete(Completion::Done);
        assert_eq!(signal.wait().await, Completion::Done);
    }

    #[test]
    fn arm_clears_previous_outcome() {
        let signal = CompletionSignal::new();
        signal.complete(Completion::Error);
        signal.arm();
        assert_eq!(signal.peek(), LatchState::Pending);
    }

    #[test]
    fn expire_wins_only_while_pending() {
        let signal = CompletionSignal::new();
        signal.arm();
        assert!(signal.expire());
        assert_eq!(signal.peek(), LatchState::TimedOut);
        // A second claim must fail: only one cleanup path.
        assert!(!signal.expire());
    }

    #[test]
    fn completion_beats_timeout() {
        let signal = CompletionSignal::new();
        signal.arm();
        signal.complete(Completion::Done);
        assert!(!signal.expire());
        assert_eq!(signal.settled(), Some(Completion::Done));
    }

    #[test]
    fn stop_ack_after_timeout_settles() {
        let signal = CompletionSignal::new();
        signal.arm();
        assert!(signal.expire());
        signal.complete(Completion::Done);
        assert_eq!(signal.settled(), Some(Completion::Done));
    }

    #[test]
    fn error_is_sticky() {
        let signal = CompletionSignal::new();
        signal.arm();
        signal.complete(Completion::Error);
        signal.complete(Completion::Done);
        assert_eq!(signal.settled(), Some(Completion::Error));
    }

    #[tokio::test]
    async fn spin_observes_completion() {
        let signal = CompletionSignal::new();
        signal.arm();
        signal.complete(Completion::Done);
        assert_eq!(signal.spin().await, Completion::Done);
    }
}
