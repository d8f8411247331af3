//! Operator-facing diagnostics.

use platform::{validate, Console, RxReport};

/// ANSI red.
pub const RED: &str = "\x1b[0;31m";
/// ANSI green.
pub const GREEN: &str = "\x1b[0;32m";
/// ANSI reset.
pub const NORMAL: &str = "\x1b[0m";

/// `print!` for a [`Console`].
macro_rules! say {
    ($console:expr, $($arg:tt)*) => {
        $console.print(format_args!($($arg)*))
    };
}
pub(crate) use say;

/// Print the receive summary line and the first failed check.
pub fn print_rx<C: Console>(console: &mut C, rx: &[u8], received: usize, expected: usize) -> RxReport {
    let mut head = [0u8; 8];
    for (dst, src) in head.iter_mut().zip(rx.iter().take(received)) {
        *dst = *src;
    }
    let [b0, b1, b2, b3, b4, b5, b6, b7] = head;
    say!(
        console,
        "Received {} bytes {:02x}{:02x}{:02x}{:02x} {:02x}{:02x}{:02x}{:02x} ... ",
        received,
        b0,
        b1,
        b2,
        b3,
        b4,
        b5,
        b6,
        b7
    );

    let report = validate(rx, received, expected);
    match report {
        RxReport::CountMismatch { expected, .. } => {
            say!(console, "{RED}Instead of {expected} bytes{NORMAL}\n");
        }
        RxReport::HeaderMismatch { header } => {
            say!(console, "{RED}Packet header indicates {header} bytes{NORMAL}\n");
        }
        RxReport::ByteMismatch { index, expected, got } => {
            say!(
                console,
                "{RED}Mismatch in byte {index} expected {expected:02x} got {got:02x}{NORMAL}\n"
            );
        }
        RxReport::Ok => say!(console, "{GREEN}OK{NORMAL}\n"),
    }
    report
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use platform::mocks::MockBench;
    use platform::{fill_pattern, stamp_length};

    use super::*;

    #[test]
    fn good_payload_prints_ok() {
        let bench = MockBench::new();
        let mut console = bench.console();
        let mut rx = [0u8; 1024];
        fill_pattern(&mut rx);
        stamp_length(&mut rx, 1024);

        let report = print_rx(&mut console, &rx, 1024, 1024);

        assert!(report.is_ok());
        let out = bench.console_output();
        assert!(out.starts_with("Received 1024 bytes 04000203 04050607 ... "));
        assert!(out.ends_with(&format!("{GREEN}OK{NORMAL}\n")));
    }

    #[test]
    fn short_count_is_reported_first() {
        let bench = MockBench::new();
        let mut console = bench.console();
        let rx = [0u8; 16];

        let report = print_rx(&mut console, &rx, 4, 16);

        assert_eq!(report, RxReport::CountMismatch { received: 4, expected: 16 });
        assert!(bench.console_output().contains("Instead of 16 bytes"));
    }

    #[test]
    fn corrupt_byte_is_located() {
        let bench = MockBench::new();
        let mut console = bench.console();
        let mut rx = [0u8; 16];
        fill_pattern(&mut rx);
        stamp_length(&mut rx, 16);
        rx[5] = 0x42;

        print_rx(&mut console, &rx, 16, 16);

        assert!(bench.console_output().contains("Mismatch in byte 5 expected 05 got 42"));
    }

    #[test]
    fn header_is_not_read_past_received_bytes() {
        let bench = MockBench::new();
        let mut console = bench.console();
        let rx = [0xFFu8; 16];

        print_rx(&mut console, &rx, 0, 16);

        assert!(bench.console_output().starts_with("Received 0 bytes 00000000 00000000"));
    }
}
