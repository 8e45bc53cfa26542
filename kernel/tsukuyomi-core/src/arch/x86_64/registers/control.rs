//! Control register access (CR2, CR3).

use crate::addr::{PhysAddr, VirtAddr};

/// The CR2 register: holds the faulting linear address after a page fault.
pub struct Cr2;

impl Cr2 {
    /// Reads the faulting address from CR2.
    #[inline]
    #[must_use]
    pub fn read() -> VirtAddr {
        #[cfg(target_os = "none")]
        {
            let value: u64;
            // SAFETY: Reading CR2 has no side effects.
            unsafe {
                core::arch::asm!(
                    "mov {}, cr2",
                    out(reg) value,
                    options(nomem, nostack, preserves_flags),
                );
            }
            VirtAddr::new_truncate(value)
        }
        #[cfg(not(target_os = "none"))]
        {
            VirtAddr::zero()
        }
    }
}

/// The CR3 register: physical address of the active top-level page table.
pub struct Cr3;

impl Cr3 {
    /// Mask selecting the page-table base address bits of CR3.
    const ADDR_MASK: u64 = 0x000F_FFFF_FFFF_F000;

    /// Reads the physical address of the active PML4.
    #[inline]
    #[must_use]
    pub fn read() -> PhysAddr {
        #[cfg(target_os = "none")]
        {
            let value: u64;
            // SAFETY: Reading CR3 has no side effects.
            unsafe {
                core::arch::asm!(
                    "mov {}, cr3",
                    out(reg) value,
                    options(nomem, nostack, preserves_flags),
                );
            }
            PhysAddr::new(value & Self::ADDR_MASK)
        }
        #[cfg(not(target_os = "none"))]
        {
            PhysAddr::zero()
        }
    }

    /// Switches the active page-table root, flushing non-global TLB entries.
    ///
    /// # Safety
    ///
    /// `pml4` must be the physical address of a valid top-level page table
    /// that maps the currently executing code and stack.
    #[inline]
    pub unsafe fn write(pml4: PhysAddr) {
        #[cfg(target_os = "none")]
        unsafe {
            core::arch::asm!(
                "mov cr3, {}",
                in(reg) pml4.as_u64(),
                options(nostack, preserves_flags),
            );
        }
        #[cfg(not(target_os = "none"))]
        {
            let _ = pml4;
        }
    }
}
