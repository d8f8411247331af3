//! UART, powered for as long as it is selected.
//!
//! With the idle timeout enabled, every received byte restarts TIMER0
//! through DPPI and the timer's COMPARE0 triggers STOPRX, so a reception
//! ends on a line idle gap instead of a full buffer. The routes are set up
//! at init and torn down at deinit; the CPU is not involved per byte.

use embassy_time::Duration;
use platform::routing::IdleTimeout;
use platform::{
    Bitrate, Direction, Drive, EngineConfig, EventRouter, PeripheralKind, PinBank, PinConfig, PinRoles, Pull, Task,
    TransferEngine, TransferError,
};

use super::{ensure_ready, pin_list, release_pins, rx_window, tx_window, PinList, Rig};
use crate::config::{HarnessConfig, UartPins};
use crate::session::TransferBuffers;
use crate::transfer::{Plan, TimeoutPolicy};

/// UARTE driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Uart {
    pins: UartPins,
    bitrate: Bitrate,
    idle: Option<IdleTimeout>,
    window: Duration,
    linked: bool,
}

impl Uart {
    /// Driver at `bitrate`. `idle_timeout` ends receptions on a line idle
    /// gap.
    pub fn new(config: &HarnessConfig, bitrate: Bitrate, idle_timeout: bool) -> Self {
        let idle = idle_timeout.then_some(IdleTimeout {
            micros: config.timing.uart_idle_us,
            restart: config.routing.idle_restart,
            expire: config.routing.idle_expire,
            stop: Task::StopRx,
        });
        Self {
            pins: config.uart,
            bitrate,
            idle,
            window: config.timing.uart_rx_window,
            linked: false,
        }
    }

    /// Configured baud rate.
    pub fn bitrate(&self) -> Bitrate {
        self.bitrate
    }

    /// Whether receptions end on an idle gap.
    pub fn has_idle_timeout(&self) -> bool {
        self.idle.is_some()
    }

    /// RXD input, engine up, TXD output, idle routes linked.
    pub fn init<E, P, R>(&mut self, rig: &mut Rig<E, P, R>) -> Result<(), TransferError>
    where
        E: TransferEngine,
        P: PinBank,
        R: EventRouter,
    {
        let UartPins { txd, rxd } = self.pins;
        rig.pins.configure(rxd, PinConfig::input(Pull::None));
        let config = EngineConfig::new(PeripheralKind::Uart)
            .with_bitrate(self.bitrate)
            .with_pins(PinRoles::uart(txd, rxd));
        rig.machine.init(&config, true)?;
        rig.pins.configure(txd, PinConfig::output(Drive::S0S1));
        if let Some(idle) = self.idle {
            rig.router.link_idle_timeout(idle);
            self.linked = true;
        }
        Ok(())
    }

    /// Transmit `size` bytes, then STOPTX.
    pub async fn send<E, P, R>(
        &mut self,
        rig: &mut Rig<E, P, R>,
        buffers: &mut TransferBuffers,
        size: usize,
    ) -> Result<usize, TransferError>
    where
        E: TransferEngine,
        P: PinBank,
        R: EventRouter,
    {
        ensure_ready(&rig.machine)?;
        let tx = tx_window(&buffers.tx, size)?;
        // SAFETY: the transfer settles before the buffer is touched again.
        unsafe { rig.machine.engine().load_tx(tx) };
        let outcome = rig
            .machine
            .run(&Plan::new(Direction::Transmit, Task::StartTx).stop_with(Task::StopTx))
            .await;
        rig.machine.engine().trigger(Task::StopTx);
        Ok(outcome?.amount)
    }

    /// Receive up to `size` bytes.
    ///
    /// Without the idle timeout this waits for a full buffer. With it, a
    /// reception that never sees a first byte is stopped after the receive
    /// window and reports 0.
    pub async fn recv<E, P, R>(
        &mut self,
        rig: &mut Rig<E, P, R>,
        buffers: &mut TransferBuffers,
        size: usize,
    ) -> Result<usize, TransferError>
    where
        E: TransferEngine,
        P: PinBank,
        R: EventRouter,
    {
        ensure_ready(&rig.machine)?;
        let rx = rx_window(&mut buffers.rx, size)?;
        // SAFETY: as in `send`.
        unsafe { rig.machine.engine().load_rx(rx) };
        let window = self.idle.map(|_| self.window);
        let plan = Plan::new(Direction::Receive, Task::StartRx)
            .stop_with(Task::StopRx)
            .maybe_deadline(window, TimeoutPolicy::Partial);
        Ok(rig.machine.run(&plan).await?.amount)
    }

    /// Unlink the idle routes, engine off, pins back to reset.
    pub fn deinit<E, P, R>(&mut self, rig: &mut Rig<E, P, R>)
    where
        E: TransferEngine,
        P: PinBank,
        R: EventRouter,
    {
        if let (Some(idle), true) = (self.idle, self.linked) {
            rig.router.unlink_idle_timeout(idle);
            self.linked = false;
        }
        rig.machine.deinit();
        release_pins(&mut rig.pins, &[self.pins.txd, self.pins.rxd]);
    }

    /// Pin assignment printout.
    pub fn pins(&self) -> PinList {
        pin_list(&[("TXD", self.pins.txd), ("RXD", self.pins.rxd)])
    }
}
