//! IDT construction and install.
//!
//! All 256 vectors point at the generated per-vector stubs from
//! [`trap`](super::trap). Every entry is an interrupt gate with DPL 0
//! except vector 0x40, the system-call gate: a trap gate with DPL 3 so
//! user code can raise it with `int 0x40` (and so the handler runs with
//! interrupts enabled).

use core::cell::UnsafeCell;

use tsukuyomi_core::arch::x86_64::structures::idt::{IDT_ENTRIES, InterruptDescriptorTable};

use crate::arch::x86_64::gdt::KERNEL_CODE_SELECTOR;
use crate::arch::x86_64::trap;

/// `Sync` wrapper: the IDT is written once during init (single CPU,
/// interrupts off) and read only by hardware afterwards.
struct SyncUnsafeCell<T>(UnsafeCell<T>);

// SAFETY: See wrapper docs; init-once then read-only.
unsafe impl<T> Sync for SyncUnsafeCell<T> {}

static IDT: SyncUnsafeCell<InterruptDescriptorTable> =
    SyncUnsafeCell(UnsafeCell::new(InterruptDescriptorTable::new()));

/// Fills and loads the IDT.
///
/// # Safety
///
/// Must be called exactly once during early boot, after the GDT is loaded
/// (the gates reference the kernel code selector), with interrupts off.
pub unsafe fn init() {
    // SAFETY: Single-CPU early boot, so no concurrent access; the static
    // lives forever for the CPU to read.
    let idt = unsafe { &mut *IDT.0.get() };

    for vector in 0..IDT_ENTRIES {
        // trap_table[n] is the generated stub for vector n, which matches
        // this vector's error-code convention by construction.
        let stub = trap::stub_addr(vector) as u64;
        // SAFETY: The stub address is valid kernel text.
        let options = unsafe {
            idt.entries[vector].set_handler_addr(stub, KERNEL_CODE_SELECTOR.as_u16())
        };
        if vector == trap::vectors::SYSCALL as usize {
            options.set_dpl(3).set_trap_gate();
        }
    }

    // SAFETY: The table is fully populated and static.
    unsafe { idt.load() };
    crate::kdebug!("idt: 256 vectors installed, syscall gate at {:#x}", trap::vectors::SYSCALL);
}
