//! TTY: the kernel console device.
//!
//! Input bytes arrive from the keyboard and UART interrupt handlers,
//! land in a ring buffer, and wake the TTY's channel. `read` blocks on
//! that channel until bytes are available; `write` mirrors to the serial
//! port and the framebuffer console.
//!
//! The ring lock is a raw [`SpinLock`] rather than a guard because a
//! blocked reader hands the lock to `sleep`, which releases and
//! re-acquires it around the context switch.

use core::cell::UnsafeCell;

use noalloc::ringbuf::RingBuf;
use tsukuyomi_core::sync::SpinLock;

use crate::proc::sched;

/// Capacity of the input ring.
const INPUT_BUF: usize = 256;

struct TtyInner {
    input: RingBuf<u8, INPUT_BUF>,
}

/// The console device: an input ring under an IRQ-safe lock.
struct Tty {
    lock: SpinLock,
    inner: UnsafeCell<TtyInner>,
}

// SAFETY: `inner` is only touched while `lock` is held.
unsafe impl Sync for Tty {}

static TTY: Tty = Tty {
    lock: SpinLock::new(),
    inner: UnsafeCell::new(TtyInner {
        input: RingBuf::new(),
    }),
};

/// The TTY wait channel: the address of the device record.
fn channel() -> u64 {
    core::ptr::from_ref(&TTY) as u64
}

/// Feeds one input byte from an interrupt handler.
///
/// Echoes the byte, queues it, and wakes blocked readers. The wake-up
/// happens while the ring lock is held, pairing with the lock hand-off
/// in [`read`] so wake-ups cannot be lost.
pub fn input_byte(byte: u8) {
    TTY.lock.acquire();
    {
        // SAFETY: The ring lock is held.
        let inner = unsafe { &mut *TTY.inner.get() };
        match byte {
            0x08 => {
                // Only echo backspace; line editing lives in userspace.
                crate::log::write_bytes(&[0x08]);
            }
            byte => {
                crate::log::write_bytes(&[byte]);
            }
        }
        if !inner.input.push(byte) {
            crate::kwarn!("tty: input ring full, byte dropped");
        }
    }
    sched::awaken(channel());
    TTY.lock.release();
}

/// Reads available input, blocking while the ring is empty.
///
/// Returns at least one byte (unless `buf` is empty).
pub fn read(buf: &mut [u8]) -> usize {
    if buf.is_empty() {
        return 0;
    }

    TTY.lock.acquire();
    let count = loop {
        // SAFETY: The ring lock is held (re-acquired by sleep on resume).
        let inner = unsafe { &mut *TTY.inner.get() };
        let mut count = 0;
        while count < buf.len() {
            match inner.input.pop() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        if count > 0 {
            break count;
        }
        sched::sleep(channel(), &TTY.lock);
    };
    TTY.lock.release();
    count
}

/// Writes bytes to the console.
pub fn write(buf: &[u8]) -> usize {
    crate::log::write_bytes(buf);
    buf.len()
}
