//! Interrupt flag manipulation.
//!
//! On non-bare-metal targets (host unit tests) these are inert: `enable` and
//! `disable` do nothing and `are_enabled` reports `false`.

/// Enables maskable interrupts (STI).
#[inline]
pub fn enable() {
    #[cfg(target_os = "none")]
    // SAFETY: Enabling interrupts is safe in ring 0 whenever the caller is
    // prepared to be preempted.
    unsafe {
        core::arch::asm!("sti", options(nomem, nostack, preserves_flags));
    }
}

/// Disables maskable interrupts (CLI).
#[inline]
pub fn disable() {
    #[cfg(target_os = "none")]
    // SAFETY: Disabling interrupts has no side effects beyond masking.
    unsafe {
        core::arch::asm!("cli", options(nomem, nostack, preserves_flags));
    }
}

/// Returns `true` if RFLAGS.IF is set.
#[inline]
#[must_use]
pub fn are_enabled() -> bool {
    #[cfg(target_os = "none")]
    {
        crate::arch::x86_64::registers::rflags::read()
            .contains(crate::arch::x86_64::registers::rflags::RFlags::INTERRUPT_FLAG)
    }
    #[cfg(not(target_os = "none"))]
    {
        false
    }
}
