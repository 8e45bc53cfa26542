//! Memory management: direct map, frame allocator, paging, kernel heap.

pub mod heap;
pub mod hhdm;
pub mod paging;
pub mod pmm;

/// Size of a physical frame and of a 4 KiB page.
pub const PAGE_SIZE: usize = 4096;

/// Fixed virtual-address layout of the kernel.
pub mod layout {
    use super::PAGE_SIZE;

    /// Number of pages in each process's kernel stack.
    pub const KERNEL_STACK_PAGES: usize = 4;

    /// Base of the per-process kernel stack.
    ///
    /// The range sits at the top of the lower canonical half so that every
    /// process maps its own stack frames at the same virtual addresses,
    /// while the kernel half (PML4 indices 256..511) stays shared.
    pub const KERNEL_STACK_BASE: u64 = 0x0000_7FFF_FFE0_0000;

    /// One past the highest kernel-stack byte; the value loaded into
    /// `TSS.rsp0` while a process runs.
    pub const KERNEL_STACK_TOP: u64 =
        KERNEL_STACK_BASE + (KERNEL_STACK_PAGES as u64) * PAGE_SIZE as u64;

    /// Initial user stack pointer: the top of the fixed user-stack page,
    /// directly below the kernel stack region (which is supervisor-only,
    /// so a user stack overflow faults instead of corrupting it).
    pub const USER_STACK_TOP: u64 = KERNEL_STACK_BASE;

    /// The single fixed user-stack page.
    pub const USER_STACK_PAGE: u64 = USER_STACK_TOP - PAGE_SIZE as u64;

    /// Base of the kernel heap window (PML4 index 320, kernel half).
    pub const KERNEL_HEAP_BASE: u64 = 0xFFFF_A000_0000_0000;

    /// Size of the kernel heap window. Mapped once at boot; the master
    /// page table is never grown afterwards, so every process inherits
    /// the mapping through the shared kernel half.
    pub const KERNEL_HEAP_SIZE: usize = 4 * 1024 * 1024;
}
