//! Kernel console sink for the logging front end.
//!
//! Registers a print function that writes to COM1 and mirrors to the
//! framebuffer console once that exists. The boot stub calls
//! [`init_early_serial`] before anything else so that even the earliest
//! init messages (and panics) reach the serial port.

use core::fmt::{self, Write as _};

use crate::drivers::{fbcon, uart16550};

struct Console;

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        uart16550::write_str(s);
        fbcon::write_bytes(s.as_bytes());
        Ok(())
    }
}

fn console_print(args: fmt::Arguments<'_>) {
    let _ = Console.write_fmt(args);
}

/// Brings up COM1 and registers the console as the global log sink.
///
/// # Safety
///
/// Must run once, on hardware with a 16550-compatible UART at COM1.
pub unsafe fn init_early_serial() {
    // SAFETY: Forwarded contract.
    unsafe {
        uart16550::init();
        tsukuyomi_core::log::set_print_fn(console_print);
    }
}

/// Writes raw output bytes to the console (TTY write path).
pub fn write_bytes(bytes: &[u8]) {
    uart16550::write_bytes(bytes);
    fbcon::write_bytes(bytes);
}
