//! I/O APIC redirection setup.
//!
//! Routes the two ISA interrupts the kernel consumes (keyboard IRQ 1,
//! COM1 IRQ 4) to their trap vectors. The IOAPIC sits at its conventional
//! base; nothing beyond redirection-table programming happens here.

use tsukuyomi_core::addr::PhysAddr;

use crate::arch::x86_64::trap::vectors;
use crate::mm::hhdm;

/// Conventional IOAPIC MMIO base.
const IOAPIC_BASE: u64 = 0xFEC0_0000;

/// Register-select window offset.
const IOREGSEL: usize = 0x00;
/// Register data window offset.
const IOWIN: usize = 0x10;

/// First redirection-table register.
const REDIR_TABLE_BASE: u32 = 0x10;

fn write_reg(base: *mut u32, reg: u32, value: u32) {
    // SAFETY: IOREGSEL/IOWIN are the documented IOAPIC access window.
    unsafe {
        base.byte_add(IOREGSEL).write_volatile(reg);
        base.byte_add(IOWIN).write_volatile(value);
    }
}

/// Routes `irq` to `vector`: edge-triggered, active-high, physical
/// destination CPU 0, unmasked.
fn redirect(base: *mut u32, irq: u32, vector: u64) {
    let reg = REDIR_TABLE_BASE + irq * 2;
    write_reg(base, reg + 1, 0); // destination APIC 0
    write_reg(base, reg, vector as u32);
}

/// Programs the redirection entries for the keyboard and the UART.
///
/// # Safety
///
/// Must be called once during boot with interrupts disabled, after the
/// offset map is available.
pub unsafe fn init() {
    let base = hhdm::phys_to_virt(PhysAddr::new(IOAPIC_BASE)).as_mut_ptr::<u32>();
    redirect(base, 1, vectors::KEYBOARD);
    redirect(base, 4, vectors::UART);
    crate::kinfo!("ioapic: irq1 -> {}, irq4 -> {}", vectors::KEYBOARD, vectors::UART);
}
