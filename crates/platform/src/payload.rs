//! Test payload convention.
//!
//! ```text
//! byte 0      byte 1        byte 2  byte 3  ...  byte i
//! len >> 8    len & 0xFF    0x02    0x03    ...  i & 0xFF
//! ```
//!
//! The generator fills the whole transmit buffer with `i & 0xFF` once at
//! boot and stamps the two header bytes before every send. The validator
//! checks the count, then the header, then the pattern, and reports the
//! first failure only.

/// Fill `buf` with `buf[i] = i & 0xFF`.
pub fn fill_pattern(buf: &mut [u8]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        #[allow(clippy::cast_possible_truncation)] // truncation is the pattern
        {
            *byte = i as u8;
        }
    }
}

/// Write `len` big-endian into `buf[0..2]`.
///
/// Returns `false`, leaving `buf` untouched, if `buf` is shorter than two
/// bytes or `len` does not fit the 16-bit header.
pub fn stamp_length(buf: &mut [u8], len: usize) -> bool {
    let Ok(len) = u16::try_from(len) else {
        return false;
    };
    match buf.get_mut(..2) {
        Some(header) => {
            header.copy_from_slice(&len.to_be_bytes());
            true
        }
        None => false,
    }
}

/// Length announced by the header, if the buffer holds one.
pub fn header_length(buf: &[u8]) -> Option<usize> {
    match buf {
        [hi, lo, ..] => Some(usize::from(u16::from_be_bytes([*hi, *lo]))),
        _ => None,
    }
}

/// Result of validating a received payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxReport {
    /// Count, header and pattern all match.
    Ok,
    /// The engine reported a different count than requested.
    CountMismatch {
        /// Bytes the engine reported.
        received: usize,
        /// Bytes the test asked for.
        expected: usize,
    },
    /// The header disagrees with the received count.
    HeaderMismatch {
        /// Length found in bytes 0..2 (0 if fewer than two bytes arrived).
        header: usize,
    },
    /// First pattern byte that is wrong.
    ByteMismatch {
        /// Offset into the buffer.
        index: usize,
        /// `index & 0xFF`
        expected: u8,
        /// What arrived.
        got: u8,
    },
}

impl RxReport {
    /// No mismatch of any kind.
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Validate `received` bytes of `rx` against a request for `expected`.
pub fn validate(rx: &[u8], received: usize, expected: usize) -> RxReport {
    if received != expected {
        return RxReport::CountMismatch { received, expected };
    }

    let header = header_length(rx).unwrap_or(0);
    if header != received {
        return RxReport::HeaderMismatch { header };
    }

    let body = rx.get(..received).unwrap_or(rx);
    for (index, got) in body.iter().copied().enumerate().skip(2) {
        #[allow(clippy::cast_possible_truncation)] // truncation is the pattern
        let expected = index as u8;
        if got != expected {
            return RxReport::ByteMismatch {
                index,
                expected,
                got,
            };
        }
    }

    RxReport::Ok
}
