//! Per-CPU GDT and TSS.
//!
//! The GDT has the fixed 7-slot layout: null, kernel code, kernel data,
//! user code, user data, and the 16-byte TSS descriptor pair in slots 5-6.
//! On every process activation the scheduler rewrites the TSS descriptor
//! (returning it to the available state) and reloads GDTR and TR, so the
//! TSS busy bit from the previous activation never faults `ltr`.

use tsukuyomi_core::arch::x86_64::instructions::{segmentation, tables};
use tsukuyomi_core::arch::x86_64::structures::gdt::{
    Descriptor, GlobalDescriptorTable, SegmentSelector, TaskStateSegment,
};

/// Selector for the kernel code segment (slot 1, RPL 0).
pub const KERNEL_CODE_SELECTOR: SegmentSelector = SegmentSelector::new(1, 0);
/// Selector for the kernel data segment (slot 2, RPL 0).
pub const KERNEL_DATA_SELECTOR: SegmentSelector = SegmentSelector::new(2, 0);
/// Selector for the user code segment (slot 3, RPL 3).
pub const USER_CODE_SELECTOR: SegmentSelector = SegmentSelector::new(3, 3);
/// Selector for the user data segment (slot 4, RPL 3).
pub const USER_DATA_SELECTOR: SegmentSelector = SegmentSelector::new(4, 3);
/// Selector for the TSS descriptor (slots 5-6, RPL 0).
pub const TSS_SELECTOR: SegmentSelector = SegmentSelector::new(5, 0);

/// A CPU's descriptor tables: its GDT and TSS.
pub struct CpuDescriptors {
    gdt: GlobalDescriptorTable,
    tss: TaskStateSegment,
}

impl CpuDescriptors {
    /// Creates empty tables; [`CpuDescriptors::init_load`] builds and loads
    /// them.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            gdt: GlobalDescriptorTable::new(),
            tss: TaskStateSegment::new(),
        }
    }

    /// Builds the 7-slot GDT, loads it, reloads all segment registers, and
    /// loads the task register.
    ///
    /// # Safety
    ///
    /// Must be called exactly once per CPU during early boot, on tables
    /// with a stable address (the per-CPU record lives in a `static`).
    pub unsafe fn init_load(&mut self) {
        let kcode = self.gdt.append(Descriptor::kernel_code_segment());
        let kdata = self.gdt.append(Descriptor::kernel_data_segment());
        let ucode = self.gdt.append(Descriptor::user_code_segment());
        let udata = self.gdt.append(Descriptor::user_data_segment());
        debug_assert_eq!(kcode, KERNEL_CODE_SELECTOR);
        debug_assert_eq!(kdata, KERNEL_DATA_SELECTOR);
        debug_assert_eq!(ucode.index(), USER_CODE_SELECTOR.index());
        debug_assert_eq!(udata.index(), USER_DATA_SELECTOR.index());
        let tss = self.gdt.append(Descriptor::tss_segment(&self.tss));
        debug_assert_eq!(tss.index(), TSS_SELECTOR.index());

        // SAFETY: The GDT now holds valid descriptors matching the selector
        // constants, and lives as long as the CPU record.
        unsafe {
            self.gdt.load();
            segmentation::set_cs(KERNEL_CODE_SELECTOR);
            segmentation::load_ds(KERNEL_DATA_SELECTOR);
            segmentation::load_ss(KERNEL_DATA_SELECTOR);
            segmentation::load_es(SegmentSelector::null());
            segmentation::load_fs(SegmentSelector::null());
            segmentation::load_gs(SegmentSelector::null());
            tables::ltr(TSS_SELECTOR);
        }

        crate::kdebug!("gdt: loaded (7 slots, tss in 5-6)");
    }

    /// Points `TSS.rsp0` at a process's kernel stack top and reloads the
    /// GDT and task register with a fresh (available) TSS descriptor.
    ///
    /// # Safety
    ///
    /// `rsp0` must be the top of a mapped kernel stack in the address
    /// space about to be activated; interrupts must be disabled.
    pub unsafe fn set_kernel_stack(&mut self, rsp0: u64) {
        self.tss.privilege_stack_table[0] = rsp0;
        let descriptor = Descriptor::tss_segment(&self.tss);
        self.gdt
            .set_system_descriptor(TSS_SELECTOR.index(), descriptor);
        // SAFETY: The rebuilt descriptor is in the available state, so the
        // task register reload cannot fault on the busy bit.
        unsafe {
            self.gdt.load();
            tables::ltr(TSS_SELECTOR);
        }
    }

    /// Reloads the plain GDT after a process switched out (the kernel
    /// runs with whatever rsp0 the last process left; the scheduler stack
    /// is never entered via a ring transition).
    pub fn load_plain(&self) {
        // SAFETY: The table is unchanged and still valid.
        unsafe { self.gdt.load() };
    }
}

impl Default for CpuDescriptors {
    fn default() -> Self {
        Self::new()
    }
}
