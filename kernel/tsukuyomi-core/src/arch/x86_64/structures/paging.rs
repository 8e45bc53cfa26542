//! x86_64 page table structures.
//!
//! Types for manipulating 4-level page tables (PML4 → PDPT → PD → PT):
//! 512 entries of 64 bits per level.

use crate::addr::PhysAddr;

/// Physical address mask: bits 12..51 of a page table entry.
pub const ADDR_MASK: u64 = 0x000F_FFFF_FFFF_F000;

/// Number of entries per page table level.
pub const ENTRIES_PER_TABLE: usize = 512;

bitflags::bitflags! {
    /// Page table entry flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PageTableFlags: u64 {
        /// Entry is present / valid.
        const PRESENT       = 1 << 0;
        /// Page is writable.
        const WRITABLE      = 1 << 1;
        /// Page is accessible from ring 3.
        const USER          = 1 << 2;
        /// Write-through caching.
        const WRITE_THROUGH = 1 << 3;
        /// Cache disabled.
        const CACHE_DISABLE = 1 << 4;
        /// Accessed by the CPU.
        const ACCESSED      = 1 << 5;
        /// Written by the CPU.
        const DIRTY         = 1 << 6;
        /// PS bit: 2 MiB leaf in a PD entry, 1 GiB leaf in a PDPT entry.
        const HUGE_PAGE     = 1 << 7;
        /// Global page (survives CR3 reloads when CR4.PGE is set).
        const GLOBAL        = 1 << 8;
    }
}

bitflags::bitflags! {
    /// Page fault error code bits pushed by the CPU.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PageFaultErrorCode: u64 {
        /// 1 = protection violation, 0 = not-present page.
        const PRESENT           = 1 << 0;
        /// 1 = write access caused the fault.
        const WRITE             = 1 << 1;
        /// 1 = fault occurred in user mode.
        const USER              = 1 << 2;
        /// 1 = a reserved bit was set in a page table entry.
        const RESERVED_WRITE    = 1 << 3;
        /// 1 = the fault was caused by an instruction fetch.
        const INSTRUCTION_FETCH = 1 << 4;
    }
}

/// A single 64-bit page table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct PageTableEntry(u64);

impl PageTableEntry {
    /// An empty (not present) entry. Non-present entries are all zero.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Creates an entry pointing at `phys_addr` with the given `flags`.
    #[must_use]
    pub const fn new(phys_addr: PhysAddr, flags: PageTableFlags) -> Self {
        Self((phys_addr.as_u64() & ADDR_MASK) | flags.bits())
    }

    /// Returns `true` if the PRESENT bit is set.
    #[must_use]
    pub const fn is_present(self) -> bool {
        self.0 & 1 != 0
    }

    /// Returns `true` if the PS (huge page) bit is set.
    #[must_use]
    pub const fn is_huge(self) -> bool {
        self.0 & (1 << 7) != 0
    }

    /// Returns the physical address stored in this entry.
    #[must_use]
    pub const fn address(self) -> PhysAddr {
        // SAFETY: The masked value fits in 52 bits.
        unsafe { PhysAddr::new_unchecked(self.0 & ADDR_MASK) }
    }

    /// Returns the flags portion of this entry.
    #[must_use]
    pub const fn flags(self) -> PageTableFlags {
        PageTableFlags::from_bits_truncate(self.0 & !ADDR_MASK)
    }
}

/// A 4 KiB-aligned page table of 512 entries.
#[repr(C, align(4096))]
pub struct PageTable {
    /// The 512 entries of this level.
    pub entries: [PageTableEntry; ENTRIES_PER_TABLE],
}

impl PageTable {
    /// Resets every entry to not-present.
    pub fn zero(&mut self) {
        self.entries.fill(PageTableEntry::empty());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_entry_not_present() {
        let entry = PageTableEntry::empty();
        assert!(!entry.is_present());
        assert_eq!(entry.address().as_u64(), 0);
    }

    #[test]
    fn entry_address_masked() {
        let entry = PageTableEntry::new(PhysAddr::new(0x0000_1234_5000), PageTableFlags::PRESENT);
        assert_eq!(entry.address().as_u64(), 0x0000_1234_5000);
        assert!(entry.is_present());
    }

    #[test]
    fn flags_round_trip() {
        let flags = PageTableFlags::PRESENT | PageTableFlags::WRITABLE | PageTableFlags::USER;
        let entry = PageTableEntry::new(PhysAddr::new(0x2000), flags);
        assert!(entry.flags().contains(PageTableFlags::USER));
        assert!(!entry.flags().contains(PageTableFlags::HUGE_PAGE));
    }

    #[test]
    fn huge_bit_detected() {
        let entry = PageTableEntry::new(
            PhysAddr::new(0x20_0000),
            PageTableFlags::PRESENT | PageTableFlags::HUGE_PAGE,
        );
        assert!(entry.is_huge());
    }

    #[test]
    fn table_is_one_page() {
        assert_eq!(core::mem::size_of::<PageTable>(), 4096);
    }
}
