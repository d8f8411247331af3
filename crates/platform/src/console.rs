//! Operator console abstraction

/// Line-oriented operator console.
///
/// On hardware this is UARTE0, enabled only for the duration of each print
/// or key read so it does not show up in the idle current.
pub trait Console {
    /// Format and transmit `args`, returning once the last byte is on the
    /// wire.
    fn print(&mut self, args: core::fmt::Arguments<'_>);

    /// Wait for one key press (async, power-efficient).
    fn read_key(&mut self) -> impl core::future::Future<Output = u8>;
}
