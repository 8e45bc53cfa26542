//! 4-level page-table walking and construction.
//!
//! [`AddressSpace`] wraps the physical address of a top-level table (PML4)
//! and walks the four levels through the offset map. The kernel master
//! PML4 is captured once from CR3 at init; every new user address space
//! shallow-copies its kernel half (entries 256..511), so kernel mappings
//! created after any process exists would not propagate — the kernel heap
//! is therefore mapped before the first process is born.

use core::sync::atomic::{AtomicU64, Ordering};

use tsukuyomi_core::addr::{PhysAddr, VirtAddr};
use tsukuyomi_core::arch::x86_64::instructions::tlb;
use tsukuyomi_core::arch::x86_64::registers::control::Cr3;
use tsukuyomi_core::arch::x86_64::structures::paging::{
    ENTRIES_PER_TABLE, PageTable, PageTableEntry, PageTableFlags,
};

use crate::mm::{PAGE_SIZE, hhdm, layout, pmm};

/// Index of the first kernel-half PML4 entry.
const KERNEL_HALF_START: usize = 256;

/// Requested access level for a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Supervisor-only mapping (present, writable).
    Kernel,
    /// User-accessible mapping (present, writable, user).
    User,
}

impl Access {
    fn flags(self) -> PageTableFlags {
        match self {
            Self::Kernel => PageTableFlags::PRESENT | PageTableFlags::WRITABLE,
            Self::User => {
                PageTableFlags::PRESENT | PageTableFlags::WRITABLE | PageTableFlags::USER
            }
        }
    }
}

/// What to do when the leaf entry is already present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    /// A present leaf is a paging invariant violation.
    Panic,
    /// Replace the existing mapping unconditionally.
    Overwrite,
}

/// Master kernel PML4, captured from CR3 once at init. Zero = uninitialized.
static KERNEL_PML4: AtomicU64 = AtomicU64::new(0);

/// Captures the boot page table as the kernel master PML4.
///
/// # Panics
///
/// Panics on double initialization.
pub fn init() {
    let root = Cr3::read().as_u64();
    let prev = KERNEL_PML4.compare_exchange(0, root, Ordering::Release, Ordering::Relaxed);
    assert!(prev.is_ok(), "paging: master PML4 already captured");
}

/// Returns the master kernel PML4.
///
/// # Panics
///
/// Panics if called before [`init`].
pub fn kernel_master() -> PhysAddr {
    let root = KERNEL_PML4.load(Ordering::Acquire);
    assert!(root != 0, "paging: master PML4 not captured yet");
    PhysAddr::new(root)
}

/// A 4-level page table hierarchy rooted at one PML4 frame.
#[derive(Debug, Clone, Copy)]
pub struct AddressSpace {
    pml4: PhysAddr,
}

impl AddressSpace {
    /// Wraps an existing top-level table.
    #[must_use]
    pub fn for_pml4(pml4: PhysAddr) -> Self {
        Self { pml4 }
    }

    /// Wraps the currently active top-level table (CR3).
    #[must_use]
    pub fn for_current() -> Self {
        Self { pml4: Cr3::read() }
    }

    /// Wraps the kernel master table.
    #[must_use]
    pub fn kernel() -> Self {
        Self {
            pml4: kernel_master(),
        }
    }

    /// Builds a fresh user address space: a zeroed PML4 whose kernel half
    /// (entries 256..511) is copied from the master table, so the kernel
    /// half maps identically in every process.
    #[must_use]
    pub fn new_user() -> Self {
        let pml4 = pmm::alloc_frame_zeroed();
        let space = Self { pml4 };
        // SAFETY: Both frames are valid page tables reachable via the
        // offset map; the new one is exclusively ours.
        unsafe {
            let master = table_at(kernel_master());
            let new = table_at(pml4);
            for i in KERNEL_HALF_START..ENTRIES_PER_TABLE {
                new.entries[i] = master.entries[i];
            }
        }
        space
    }

    /// Returns the physical address of the top-level table.
    #[must_use]
    pub fn pml4(&self) -> PhysAddr {
        self.pml4
    }

    /// Switches CR3 to this address space.
    ///
    /// # Safety
    ///
    /// The hierarchy must map the currently executing code and stack.
    pub unsafe fn activate(&self) {
        unsafe { Cr3::write(self.pml4) };
    }

    /// Translates a virtual address.
    ///
    /// Returns the physical address plus the size of the mapping page
    /// (4 KiB, 2 MiB via the PS bit at level 2, or 1 GiB via the PS bit
    /// at level 3), or `None` when any level is not present.
    #[must_use]
    pub fn translate(&self, virt: VirtAddr) -> Option<(PhysAddr, u64)> {
        // SAFETY: Table frames are always valid, offset-mapped pages.
        unsafe {
            let l4 = table_at(self.pml4);
            let e4 = l4.entries[virt.table_index(4)];
            if !e4.is_present() {
                return None;
            }

            let l3 = table_at(e4.address());
            let e3 = l3.entries[virt.table_index(3)];
            if !e3.is_present() {
                return None;
            }
            if e3.is_huge() {
                const GIB: u64 = 1 << 30;
                let offset = virt.as_u64() & (GIB - 1);
                return Some((e3.address() + offset, GIB));
            }

            let l2 = table_at(e3.address());
            let e2 = l2.entries[virt.table_index(2)];
            if !e2.is_present() {
                return None;
            }
            if e2.is_huge() {
                const MIB2: u64 = 2 << 20;
                let offset = virt.as_u64() & (MIB2 - 1);
                return Some((e2.address() + offset, MIB2));
            }

            let l1 = table_at(e2.address());
            let e1 = l1.entries[virt.table_index(1)];
            if !e1.is_present() {
                return None;
            }
            Some((e1.address() + virt.page_offset(), PAGE_SIZE as u64))
        }
    }

    /// Maps the 4 KiB page at `virt` to the frame at `phys`.
    ///
    /// Missing intermediate tables are allocated zeroed and installed with
    /// the same access flags as the leaf; revisited intermediates gain any
    /// missing flag bits so a user leaf below a formerly kernel-only
    /// subtree stays traversable from ring 3. The affected TLB entry is
    /// invalidated afterwards.
    ///
    /// # Panics
    ///
    /// Panics if either address is misaligned, or if the leaf is already
    /// present and `mode` is [`MapMode::Panic`].
    pub fn map(&self, virt: VirtAddr, phys: PhysAddr, access: Access, mode: MapMode) {
        assert!(
            virt.is_aligned(PAGE_SIZE as u64) && phys.is_aligned(PAGE_SIZE as u64),
            "map: misaligned {virt:?} -> {phys:?}"
        );
        let flags = access.flags();

        // SAFETY: Table frames are always valid, offset-mapped pages; new
        // intermediate frames come zeroed from the frame allocator.
        unsafe {
            let l3_phys = ensure_table(self.pml4, virt.table_index(4), flags);
            let l2_phys = ensure_table(l3_phys, virt.table_index(3), flags);
            let l1_phys = ensure_table(l2_phys, virt.table_index(2), flags);

            let l1 = table_at(l1_phys);
            let slot = &mut l1.entries[virt.table_index(1)];
            if slot.is_present() && matches!(mode, MapMode::Panic) {
                panic!("map: {virt:?} already mapped to {:?}", slot.address());
            }
            *slot = PageTableEntry::new(phys, flags);
        }

        tlb::flush(virt);
    }

    /// Visits every present 4 KiB leaf in the user half (PML4 indices
    /// 0..256) with its virtual address and backing frame.
    ///
    /// Huge-page leaves never occur in the user half (the kernel only
    /// creates 4 KiB user mappings) and are skipped defensively.
    pub fn for_each_user_leaf(&self, mut f: impl FnMut(VirtAddr, PhysAddr)) {
        // SAFETY: Table frames are always valid, offset-mapped pages.
        unsafe {
            let l4 = table_at(self.pml4);
            for i4 in 0..KERNEL_HALF_START {
                let e4 = l4.entries[i4];
                if !e4.is_present() {
                    continue;
                }
                let l3 = table_at(e4.address());
                for i3 in 0..ENTRIES_PER_TABLE {
                    let e3 = l3.entries[i3];
                    if !e3.is_present() || e3.is_huge() {
                        continue;
                    }
                    let l2 = table_at(e3.address());
                    for i2 in 0..ENTRIES_PER_TABLE {
                        let e2 = l2.entries[i2];
                        if !e2.is_present() || e2.is_huge() {
                            continue;
                        }
                        let l1 = table_at(e2.address());
                        for i1 in 0..ENTRIES_PER_TABLE {
                            let e1 = l1.entries[i1];
                            if !e1.is_present() {
                                continue;
                            }
                            let virt = VirtAddr::new_truncate(
                                ((i4 as u64) << 39)
                                    | ((i3 as u64) << 30)
                                    | ((i2 as u64) << 21)
                                    | ((i1 as u64) << 12),
                            );
                            f(virt, e1.address());
                        }
                    }
                }
            }
        }
    }
}

/// Maps the per-process kernel stack range into `space` with fresh zeroed
/// frames. The caller reaches the frames through
/// [`AddressSpace::translate`].
pub fn map_kernel_stack(space: &AddressSpace) {
    for page in 0..layout::KERNEL_STACK_PAGES {
        let virt =
            VirtAddr::new_truncate(layout::KERNEL_STACK_BASE + (page * PAGE_SIZE) as u64);
        let frame = pmm::alloc_frame_zeroed();
        space.map(virt, frame, Access::Kernel, MapMode::Panic);
    }
}

/// Returns a mutable reference to the page table at `phys`.
///
/// # Safety
///
/// `phys` must be the 4 KiB-aligned physical address of a live page table.
unsafe fn table_at(phys: PhysAddr) -> &'static mut PageTable {
    unsafe { &mut *hhdm::phys_to_virt(phys).as_mut_ptr::<PageTable>() }
}

/// Ensures `table[index]` points at a next-level table, allocating a zeroed
/// frame if absent. Returns the next-level table's physical address.
///
/// # Safety
///
/// `table_phys` must reference a live page table.
unsafe fn ensure_table(table_phys: PhysAddr, index: usize, flags: PageTableFlags) -> PhysAddr {
    let table = unsafe { table_at(table_phys) };
    let entry = table.entries[index];
    if entry.is_present() {
        // OR in any missing flags (e.g. USER under a shared subtree).
        let combined = entry.flags() | flags;
        if combined != entry.flags() {
            table.entries[index] = PageTableEntry::new(entry.address(), combined);
        }
        entry.address()
    } else {
        let frame = pmm::alloc_frame_zeroed();
        table.entries[index] = PageTableEntry::new(frame, flags);
        frame
    }
}
