//! Descriptor table load instructions (LGDT, LIDT, LTR).

use crate::arch::x86_64::structures::gdt::{DescriptorTablePointer, SegmentSelector};

/// Loads the GDT register.
///
/// # Safety
///
/// `pointer` must describe a valid GDT that outlives its use by the CPU.
#[inline]
pub unsafe fn lgdt(pointer: &DescriptorTablePointer) {
    #[cfg(target_os = "none")]
    unsafe {
        core::arch::asm!(
            "lgdt [{}]",
            in(reg) pointer,
            options(readonly, nostack, preserves_flags),
        );
    }
    #[cfg(not(target_os = "none"))]
    {
        let _ = pointer;
    }
}

/// Loads the IDT register.
///
/// # Safety
///
/// `pointer` must describe a valid IDT that outlives its use by the CPU.
#[inline]
pub unsafe fn lidt(pointer: &DescriptorTablePointer) {
    #[cfg(target_os = "none")]
    unsafe {
        core::arch::asm!(
            "lidt [{}]",
            in(reg) pointer,
            options(readonly, nostack, preserves_flags),
        );
    }
    #[cfg(not(target_os = "none"))]
    {
        let _ = pointer;
    }
}

/// Loads the task register with a TSS selector.
///
/// # Safety
///
/// The selector must reference an available 64-bit TSS descriptor in the
/// currently loaded GDT. Loading marks the descriptor busy.
#[inline]
pub unsafe fn ltr(selector: SegmentSelector) {
    #[cfg(target_os = "none")]
    unsafe {
        core::arch::asm!(
            "ltr {:x}",
            in(reg) selector.as_u16(),
            options(nostack, preserves_flags),
        );
    }
    #[cfg(not(target_os = "none"))]
    {
        let _ = selector;
    }
}
