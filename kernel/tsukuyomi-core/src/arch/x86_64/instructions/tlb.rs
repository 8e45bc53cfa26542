//! TLB (translation lookaside buffer) management.

use crate::addr::VirtAddr;
#[cfg(target_os = "none")]
use crate::arch::x86_64::registers::control::Cr3;

/// Invalidates the TLB entry for the given virtual address (INVLPG).
#[inline]
pub fn flush(addr: VirtAddr) {
    #[cfg(target_os = "none")]
    // SAFETY: INVLPG only invalidates a single TLB entry.
    unsafe {
        core::arch::asm!(
            "invlpg [{}]",
            in(reg) addr.as_u64(),
            options(nostack, preserves_flags),
        );
    }
    #[cfg(not(target_os = "none"))]
    {
        let _ = addr;
    }
}

/// Flushes the entire TLB by reloading CR3.
#[inline]
pub fn flush_all() {
    #[cfg(target_os = "none")]
    // SAFETY: Writing back the same CR3 value only flushes non-global TLB
    // entries; the page table root is unchanged.
    unsafe {
        Cr3::write(Cr3::read());
    }
}
