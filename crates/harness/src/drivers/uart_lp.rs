//! Low-power UART with a REQ/RDY handshake.
//!
//! The UARTE stays disabled between transfers. Two extra lines gate it:
//!
//! ```text
//! sender                                  receiver
//! ------                                  --------
//! REQ output low (idle)                   RDY open drain, SENSE high
//! load TX, power on
//! REQ falling edge -> STARTTX linked
//! release REQ (input, pull-up)  ───────►  RDY rises, PORT handler:
//!                                           power on, STARTRX
//!                               ◄───────    pulse RDY low
//! STARTTX fires on the edge                 RDY falling edge -> STOPRX linked
//! ENDTX, STOPTX                           ENDRX
//! unlink, REQ low, power off              unlink, power off
//! ```
//!
//! The receiver's power-on, STARTRX, RDY pulse and STOPRX link all run in
//! the PORT interrupt handler (see [`PortResponse`]). The waiting task only
//! settles the transfer and tears the route down.
//!
//! Routes are always torn down in two phases: first the GPIOTE slot is put
//! in disabled mode with its pin still selected, then the slot, the
//! publish and subscribe registers and the channel are cleared. Clearing
//! the slot in one step lets the pin glitch and fire a spurious edge.

use embassy_futures::poll_once;
use embassy_time::{with_timeout, Duration};
use platform::engine::MAX_COUNT;
use platform::routing::PortResponse;
use platform::{
    Bitrate, Direction, Drive, EngineConfig, EventRouter, Level, PeripheralKind, PinBank, PinConfig, PinRoles, Polarity,
    Pull, Sense, Task, TransferEngine, TransferError,
};

use super::{ensure_ready, pin_list, release_pins, rx_window, tx_window, PinList, Rig};
use crate::config::{HandshakePins, HarnessConfig, RoutingPlan, UartPins};
use crate::session::TransferBuffers;
use crate::transfer::{check_length, Plan};

/// REQ while held: output low, input buffer connected so the line can be
/// read back.
const REQ_HELD: PinConfig = PinConfig::output(Drive::S0S1).connected();

/// REQ once released to the peer.
const REQ_RELEASED: PinConfig = PinConfig::input(Pull::Up);

/// RDY idle: open drain high with SENSE armed for the peer's release.
const RDY_IDLE: PinConfig = PinConfig::output(Drive::S0D1).connected().with_sense(Sense::High);

/// UARTE driver gated by the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowPowerUart {
    uart: UartPins,
    handshake: HandshakePins,
    routing: RoutingPlan,
    bitrate: Bitrate,
    window: Option<Duration>,
}

impl LowPowerUart {
    /// Driver at `bitrate` on the configured UART and handshake pins.
    pub fn new(config: &HarnessConfig, bitrate: Bitrate) -> Self {
        Self {
            uart: config.uart,
            handshake: config.handshake,
            routing: config.routing,
            bitrate,
            window: config.timing.lp_rx_window,
        }
    }

    /// Configured baud rate.
    pub fn bitrate(&self) -> Bitrate {
        self.bitrate
    }

    /// Configure the UARTE but leave it powered down, REQ held low, RDY
    /// idle high.
    pub fn init<E, P, R>(&mut self, rig: &mut Rig<E, P, R>) -> Result<(), TransferError>
    where
        E: TransferEngine,
        P: PinBank,
    {
        let UartPins { txd, rxd } = self.uart;
        rig.pins.configure(rxd, PinConfig::input(Pull::None));
        let config = EngineConfig::new(PeripheralKind::UartLowPower)
            .with_bitrate(self.bitrate)
            .with_pins(PinRoles::uart(txd, rxd));
        rig.machine.init(&config, false)?;
        rig.pins.configure(txd, PinConfig::output(Drive::S0S1));
        rig.pins.drive(self.handshake.req, Level::Low, REQ_HELD);
        rig.pins.drive(self.handshake.rdy, Level::High, RDY_IDLE);
        Ok(())
    }

    /// Send `size` bytes once the peer answers REQ with an RDY edge.
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
        let req = self.handshake.req;
        let RoutingPlan {
            req_slot, req_channel, ..
        } = self.routing;

        let engine = rig.machine.engine();
        // SAFETY: the transfer settles before the buffer is touched again.
        unsafe { engine.load_tx(tx) };
        engine.set_powered(true);
        rig.machine.arm()?;
        rig.router
            .link_edge(req_slot, req, Polarity::HiToLo, req_channel, Task::StartTx);
        rig.pins.configure(req, REQ_RELEASED);

        let outcome = rig.machine.settle(&Plan::peer_started(Direction::Transmit)).await;

        rig.machine.engine().trigger(Task::StopTx);
        rig.router.unlink_edge(req_slot, req, req_channel, Task::StartTx);
        rig.pins.drive(req, Level::Low, REQ_HELD);
        rig.machine.engine().set_powered(false);
        Ok(outcome?.amount)
    }

    /// Receive up to `size` bytes when the peer requests a transfer.
    ///
    /// The buffer is one byte larger than `size` so the transfer is ended
    /// by the peer's RDY edge, never by a full buffer. That spare byte caps
    /// `size` at one below MAXCNT. Blocks until the
    /// peer signals unless a receive window is configured, in which case
    /// an idle window reports 0.
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
        // One spare byte below MAXCNT.
        check_length(size, buffers.rx.len().min(MAX_COUNT).saturating_sub(1))?;
        let rx = rx_window(&mut buffers.rx, size.saturating_add(1))?;
        let RoutingPlan {
            rdy_slot, rdy_channel, ..
        } = self.routing;
        let rdy = self.handshake.rdy;

        // SAFETY: the transfer settles before the buffer is touched again.
        unsafe { rig.machine.engine().load_rx(rx) };
        rig.machine.arm()?;
        rig.router.listen_port(Some(PortResponse {
            start: Task::StartRx,
            ready: rdy,
            slot: rdy_slot,
            channel: rdy_channel,
            stop: Task::StopRx,
        }));
        let woke = match self.window {
            None => {
                rig.router.wait_port().await;
                true
            }
            Some(window) => with_timeout(window, rig.router.wait_port()).await.is_ok(),
        };
        rig.router.unlisten_port();
        // The handler may have run between the timeout and the mask.
        let requested = woke || poll_once(rig.router.wait_port()).is_ready();
        if !requested {
            debug!("no transfer request within the receive window");
            rig.machine.abandon();
            return Ok(0);
        }

        let outcome = rig.machine.settle(&Plan::peer_started(Direction::Receive)).await;

        rig.router.unlink_edge(rdy_slot, rdy, rdy_channel, Task::StopRx);
        rig.machine.engine().set_powered(false);
        Ok(outcome?.amount)
    }

    /// Engine released, all four lines back to reset.
    pub fn deinit<E, P, R>(&mut self, rig: &mut Rig<E, P, R>)
    where
        E: TransferEngine,
        P: PinBank,
    {
        rig.machine.deinit();
        release_pins(
            &mut rig.pins,
            &[self.uart.txd, self.uart.rxd, self.handshake.req, self.handshake.rdy],
        );
    }

    /// Pin assignment printout.
    pub fn pins(&self) -> PinList {
        pin_list(&[
            ("TXD", self.uart.txd),
            ("RXD", self.uart.rxd),
            ("REQ", self.handshake.req),
            ("RDY", self.handshake.rdy),
        ])
    }
}
