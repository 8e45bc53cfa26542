//! Intel 8042 PS/2 controller and keyboard driver.
//!
//! Initializes the controller with the keyboard port enabled and IRQ 1
//! unmasked, translates scancode set 1 to ASCII with shift tracking, and
//! feeds decoded bytes into the TTY input ring.

use tsukuyomi_core::arch::x86_64::Port;
use tsukuyomi_core::sync::SpinMutex;

use bitflags::bitflags;

/// Data port (read: output buffer, write: input buffer).
const DATA_PORT: u16 = 0x60;
/// Status register (read) / command register (write).
const STATUS_CMD_PORT: u16 = 0x64;

/// Command bytes sent to the command port.
mod cmd {
    /// Read controller configuration byte.
    pub const READ_CONFIG: u8 = 0x20;
    /// Write controller configuration byte.
    pub const WRITE_CONFIG: u8 = 0x60;
    /// Enable first PS/2 port (keyboard).
    pub const ENABLE_PORT1: u8 = 0xAE;
}

bitflags! {
    /// Status register bits.
    #[derive(Debug, Clone, Copy)]
    struct StatusReg: u8 {
        /// Output buffer full (data available to read).
        const OUTPUT_FULL = 1 << 0;
        /// Input buffer full (controller busy, do not write).
        const INPUT_FULL  = 1 << 1;
    }
}

bitflags! {
    /// Controller configuration byte bits.
    #[derive(Debug, Clone, Copy)]
    struct ConfigByte: u8 {
        /// Enable port 1 (keyboard) interrupt (IRQ 1).
        const PORT1_IRQ         = 1 << 0;
        /// Disable port 1 clock.
        const PORT1_CLOCK_OFF   = 1 << 4;
        /// Enable scancode translation for port 1.
        const PORT1_TRANSLATION = 1 << 6;
    }
}

/// Left/right shift scancodes (set 1, make codes).
const SC_LSHIFT: u8 = 0x2A;
const SC_RSHIFT: u8 = 0x36;
/// Break-code bit.
const SC_RELEASE: u8 = 0x80;

/// Scancode set 1 to ASCII, unshifted. Zero = no mapping.
static KEYMAP: [u8; 64] = [
    0, 0x1B, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 0x08, b'\t',
    b'q', b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n', 0, b'a', b's',
    b'd', b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', 0, b'\\', b'z', b'x', b'c', b'v',
    b'b', b'n', b'm', b',', b'.', b'/', 0, b'*', 0, b' ', 0, 0, 0, 0, 0, 0,
];

/// Scancode set 1 to ASCII with shift held.
static KEYMAP_SHIFT: [u8; 64] = [
    0, 0x1B, b'!', b'@', b'#', b'$', b'%', b'^', b'&', b'*', b'(', b')', b'_', b'+', 0x08, b'\t',
    b'Q', b'W', b'E', b'R', b'T', b'Y', b'U', b'I', b'O', b'P', b'{', b'}', b'\n', 0, b'A', b'S',
    b'D', b'F', b'G', b'H', b'J', b'K', b'L', b':', b'"', b'~', 0, b'|', b'Z', b'X', b'C', b'V',
    b'B', b'N', b'M', b'<', b'>', b'?', 0, b'*', 0, b' ', 0, 0, 0, 0, 0, 0,
];

/// Keyboard decode state.
struct Keyboard {
    shift: bool,
}

impl Keyboard {
    const fn new() -> Self {
        Self { shift: false }
    }

    /// Decodes one scancode; returns the ASCII byte for make codes that
    /// map to one.
    fn decode(&mut self, scancode: u8) -> Option<u8> {
        match scancode {
            SC_LSHIFT | SC_RSHIFT => {
                self.shift = true;
                None
            }
            code if code == SC_LSHIFT | SC_RELEASE || code == SC_RSHIFT | SC_RELEASE => {
                self.shift = false;
                None
            }
            code if code & SC_RELEASE != 0 => None,
            code => {
                let table = if self.shift { &KEYMAP_SHIFT } else { &KEYMAP };
                match table.get(code as usize) {
                    Some(&ascii) if ascii != 0 => Some(ascii),
                    _ => None,
                }
            }
        }
    }
}

/// Decode state plus an "initialized" marker; using the keyboard before
/// [`init`] is a fatal error.
static KEYBOARD: SpinMutex<Option<Keyboard>> = SpinMutex::new(None);

fn status() -> StatusReg {
    // SAFETY: Reading the i8042 status register has no side effects.
    StatusReg::from_bits_truncate(unsafe { Port::<u8>::new(STATUS_CMD_PORT).read() })
}

fn write_command(command: u8) {
    while status().contains(StatusReg::INPUT_FULL) {
        core::hint::spin_loop();
    }
    // SAFETY: The controller accepted the previous byte.
    unsafe { Port::<u8>::new(STATUS_CMD_PORT).write(command) };
}

fn write_data(data: u8) {
    while status().contains(StatusReg::INPUT_FULL) {
        core::hint::spin_loop();
    }
    // SAFETY: The controller accepted the previous byte.
    unsafe { Port::<u8>::new(DATA_PORT).write(data) };
}

fn read_data() -> u8 {
    while !status().contains(StatusReg::OUTPUT_FULL) {
        core::hint::spin_loop();
    }
    // SAFETY: OUTPUT_FULL guarantees a byte is waiting.
    unsafe { Port::<u8>::new(DATA_PORT).read() }
}

/// Initializes the controller: keyboard port on, IRQ 1 and scancode
/// translation enabled, stale output drained.
pub fn init() {
    write_command(cmd::READ_CONFIG);
    let mut config = ConfigByte::from_bits_truncate(read_data());
    config.insert(ConfigByte::PORT1_IRQ | ConfigByte::PORT1_TRANSLATION);
    config.remove(ConfigByte::PORT1_CLOCK_OFF);
    write_command(cmd::WRITE_CONFIG);
    write_data(config.bits());
    write_command(cmd::ENABLE_PORT1);

    // Drain anything buffered before interrupts start.
    while status().contains(StatusReg::OUTPUT_FULL) {
        // SAFETY: OUTPUT_FULL guarantees a byte is waiting.
        let _ = unsafe { Port::<u8>::new(DATA_PORT).read() };
    }

    *KEYBOARD.lock() = Some(Keyboard::new());
    crate::kinfo!("i8042: keyboard enabled");
}

/// IRQ 1 handler: drains scancodes and pushes decoded bytes to the TTY.
///
/// Lock order is keyboard → tty → process table; nothing ever takes them
/// in the reverse direction.
pub fn handle_interrupt() {
    let mut guard = KEYBOARD.lock();
    let keyboard = guard.as_mut().expect("i8042: interrupt before init");
    while status().contains(StatusReg::OUTPUT_FULL) {
        // SAFETY: OUTPUT_FULL guarantees a byte is waiting.
        let scancode = unsafe { Port::<u8>::new(DATA_PORT).read() };
        if let Some(ascii) = keyboard.decode(scancode) {
            crate::tty::input_byte(ascii);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_and_shifted() {
        let mut kb = Keyboard::new();
        assert_eq!(kb.decode(0x1E), Some(b'a'));
        assert_eq!(kb.decode(SC_LSHIFT), None);
        assert_eq!(kb.decode(0x1E), Some(b'A'));
        assert_eq!(kb.decode(SC_LSHIFT | SC_RELEASE), None);
        assert_eq!(kb.decode(0x1E), Some(b'a'));
    }

    #[test]
    fn ignores_break_codes() {
        let mut kb = Keyboard::new();
        assert_eq!(kb.decode(0x1E | SC_RELEASE), None);
        assert_eq!(kb.decode(0x39), Some(b' '));
    }

    #[test]
    fn enter_maps_to_newline() {
        let mut kb = Keyboard::new();
        assert_eq!(kb.decode(0x1C), Some(b'\n'));
    }
}
