//! The active device plus the hardware and buffers it runs on.

use platform::{fill_pattern, stamp_length, EventRouter, PeripheralKind, PinBank, TransferEngine, TransferError};

use crate::config::HarnessConfig;
use crate::device::{Device, Profile};
use crate::drivers::Rig;

/// Size of each transfer buffer.
pub const BUFFER_LEN: usize = 8 * 1024;

/// Transmit and receive buffers.
///
/// EasyDMA only reaches RAM, so on hardware this lives in a static cell
/// rather than being built from constants in flash.
pub struct TransferBuffers {
    /// Outgoing payload, pattern-filled once.
    pub tx: [u8; BUFFER_LEN],
    /// Incoming payload.
    pub rx: [u8; BUFFER_LEN],
}

impl TransferBuffers {
    /// Zeroed buffers.
    pub const fn new() -> Self {
        Self {
            tx: [0; BUFFER_LEN],
            rx: [0; BUFFER_LEN],
        }
    }
}

impl Default for TransferBuffers {
    fn default() -> Self {
        Self::new()
    }
}

/// Device selection and transfers.
///
/// At most one device is active. Selecting a new one always deinitialises
/// the previous one first.
pub struct Session<'b, E, P, R> {
    rig: Rig<E, P, R>,
    buffers: &'b mut TransferBuffers,
    config: HarnessConfig,
    device: Device,
}

impl<'b, E, P, R> Session<'b, E, P, R>
where
    E: TransferEngine,
    P: PinBank,
    R: EventRouter,
{
    /// Take the hardware and buffers. The transmit pattern is written here.
    pub fn new(mut rig: Rig<E, P, R>, buffers: &'b mut TransferBuffers, config: HarnessConfig) -> Self {
        fill_pattern(&mut buffers.tx);
        rig.machine.set_wait_mode(config.wait_mode);
        Self {
            rig,
            buffers,
            config,
            device: Device::None,
        }
    }

    /// Deinitialise the current device and bring up `profile`.
    ///
    /// On failure the new device's pins are released again and the session
    /// is left with no device.
    pub fn select(&mut self, profile: Profile) -> Result<(), TransferError> {
        self.deinit();
        let mut device = Device::from_profile(profile, &self.config);
        if let Err(err) = device.init(&mut self.rig) {
            warn!("{} init failed: {}", profile.kind().name(), err.code());
            device.deinit(&mut self.rig);
            return Err(err);
        }
        info!("{} ready", profile.kind().name());
        self.device = device;
        Ok(())
    }

    /// Stamp the length header and send `size` bytes.
    pub async fn send(&mut self, size: usize) -> Result<usize, TransferError> {
        if !stamp_length(&mut self.buffers.tx, size) {
            return Err(TransferError::InvalidLength {
                requested: size,
                capacity: BUFFER_LEN,
            });
        }
        self.device.send(&mut self.rig, self.buffers, size).await
    }

    /// Receive up to `size` bytes into the receive buffer.
    pub async fn recv(&mut self, size: usize) -> Result<usize, TransferError> {
        self.device.recv(&mut self.rig, self.buffers, size).await
    }

    /// Deinitialise the current device. Safe to call with nothing selected.
    pub fn deinit(&mut self) {
        self.device.deinit(&mut self.rig);
        self.device = Device::None;
    }

    /// Active device.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Active peripheral personality.
    pub fn kind(&self) -> PeripheralKind {
        self.device.kind()
    }

    /// Received bytes.
    pub fn rx(&self) -> &[u8] {
        &self.buffers.rx
    }

    /// Configuration the session was built with.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Underlying hardware, for inspection.
    pub fn rig(&mut self) -> &mut Rig<E, P, R> {
        &mut self.rig
    }
}
