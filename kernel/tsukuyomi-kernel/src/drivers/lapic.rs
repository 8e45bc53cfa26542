//! Local APIC: enable, EOI, and the periodic timer.
//!
//! The LAPIC base comes from the `IA32_APIC_BASE` MSR and is accessed
//! through the offset map. Nothing beyond enable/EOI/timer is programmed.

use core::cell::UnsafeCell;

use tsukuyomi_core::addr::PhysAddr;

use crate::arch::x86_64::trap::vectors;
use crate::mm::hhdm;

/// `IA32_APIC_BASE` MSR number.
const IA32_APIC_BASE: u32 = 0x1B;

/// Register offsets (bytes from the MMIO base).
mod reg {
    /// Spurious interrupt vector register.
    pub const SVR: usize = 0x0F0;
    /// End of interrupt.
    pub const EOI: usize = 0x0B0;
    /// LVT timer register.
    pub const LVT_TIMER: usize = 0x320;
    /// Timer divide configuration.
    pub const TIMER_DIVIDE: usize = 0x3E0;
    /// Timer initial count.
    pub const TIMER_INITIAL: usize = 0x380;
}

/// SVR software-enable bit.
const SVR_ENABLE: u32 = 1 << 8;
/// LVT timer periodic mode.
const TIMER_PERIODIC: u32 = 1 << 17;
/// Divide configuration value for divide-by-16.
const DIVIDE_BY_16: u32 = 0b0011;
/// Initial count for the periodic tick (bus-clock dependent; roughly a
/// 100 Hz-order tick in emulators).
const TIMER_COUNT: u32 = 10_000_000;

/// MMIO handle to the local APIC.
pub struct LocalApic {
    base: *mut u32,
}

// SAFETY: Single CPU; the handle is installed once and register access is
// word-sized MMIO.
unsafe impl Sync for LocalApic {}
unsafe impl Send for LocalApic {}

impl LocalApic {
    fn read(&self, offset: usize) -> u32 {
        // SAFETY: `offset` is a documented LAPIC register inside the
        // 4 KiB MMIO page.
        unsafe { self.base.byte_add(offset).read_volatile() }
    }

    fn write(&self, offset: usize, value: u32) {
        // SAFETY: As in `read`.
        unsafe { self.base.byte_add(offset).write_volatile(value) };
    }
}

/// Init-once slot for the LAPIC handle.
struct Slot(UnsafeCell<Option<LocalApic>>);

// SAFETY: Written once during single-threaded boot, read-only afterwards.
unsafe impl Sync for Slot {}

static LAPIC: Slot = Slot(UnsafeCell::new(None));

fn lapic() -> &'static LocalApic {
    // SAFETY: Read-only after init.
    unsafe { (*LAPIC.0.get()).as_ref() }.expect("lapic: used before init")
}

#[cfg(target_os = "none")]
fn read_apic_base_msr() -> u64 {
    let (lo, hi): (u32, u32);
    // SAFETY: Reading IA32_APIC_BASE is side-effect free in ring 0.
    unsafe {
        core::arch::asm!(
            "rdmsr",
            in("ecx") IA32_APIC_BASE,
            out("eax") lo,
            out("edx") hi,
            options(nomem, nostack, preserves_flags),
        );
    }
    (u64::from(hi) << 32) | u64::from(lo)
}

#[cfg(not(target_os = "none"))]
fn read_apic_base_msr() -> u64 {
    0xFEE0_0000
}

/// Maps the LAPIC, enables it via the spurious vector, and starts the
/// periodic timer on the timer vector.
///
/// # Safety
///
/// Must be called once during boot with interrupts disabled.
pub unsafe fn init() {
    let base_phys = PhysAddr::new(read_apic_base_msr() & 0xF_FFFF_F000);
    let base = hhdm::phys_to_virt(base_phys).as_mut_ptr::<u32>();
    let apic = LocalApic { base };

    apic.write(reg::SVR, SVR_ENABLE | vectors::SPURIOUS as u32);
    apic.write(reg::TIMER_DIVIDE, DIVIDE_BY_16);
    apic.write(reg::LVT_TIMER, TIMER_PERIODIC | vectors::TIMER as u32);
    apic.write(reg::TIMER_INITIAL, TIMER_COUNT);

    // SAFETY: Single-threaded boot; nothing reads the slot yet.
    unsafe { *LAPIC.0.get() = Some(apic) };
    crate::kinfo!("lapic: enabled at {:#x}, periodic timer on vector {}", base_phys.as_u64(), vectors::TIMER);
}

/// Signals end-of-interrupt.
///
/// # Panics
///
/// Panics if the LAPIC was never initialized — an interrupt arriving
/// before init is an invariant violation.
pub fn eoi() {
    lapic().write(reg::EOI, 0);
}
