//! RFLAGS register access.

bitflags::bitflags! {
    /// The RFLAGS register bits the kernel cares about.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RFlags: u64 {
        /// Carry flag.
        const CARRY_FLAG = 1 << 0;
        /// Always set.
        const RESERVED_1 = 1 << 1;
        /// Zero flag.
        const ZERO_FLAG = 1 << 6;
        /// Maskable interrupts enabled.
        const INTERRUPT_FLAG = 1 << 9;
        /// Direction flag.
        const DIRECTION_FLAG = 1 << 10;
        /// I/O privilege level (both bits).
        const IOPL = 0b11 << 12;
    }
}

/// Reads the current RFLAGS value.
#[inline]
#[must_use]
pub fn read() -> RFlags {
    #[cfg(target_os = "none")]
    {
        let value: u64;
        // SAFETY: Pushing and popping RFLAGS has no lasting side effects.
        unsafe {
            core::arch::asm!(
                "pushfq",
                "pop {}",
                out(reg) value,
                options(nomem, preserves_flags),
            );
        }
        RFlags::from_bits_truncate(value)
    }
    #[cfg(not(target_os = "none"))]
    {
        RFlags::empty()
    }
}
