//! Kernel heap: a bump allocator over a fixed virtual window.
//!
//! The window is mapped once at boot into the master page table, before
//! any process exists, so every process inherits it through the shared
//! kernel half. `dealloc` is a no-op: the kernel's steady-state allocations
//! are boot-time setup (console buffers, filesystem metadata), so nothing
//! is ever returned.

use core::alloc::{GlobalAlloc, Layout};

use tsukuyomi_core::addr::VirtAddr;
use tsukuyomi_core::sync::SpinMutex;

use crate::mm::{PAGE_SIZE, layout, paging, pmm};

struct BumpInner {
    /// Next free address; 0 until initialized.
    next: u64,
    /// One past the end of the mapped window.
    end: u64,
}

/// Bump allocator over the fixed kernel heap window.
pub struct BumpAllocator {
    inner: SpinMutex<BumpInner>,
}

impl BumpAllocator {
    const fn new() -> Self {
        Self {
            inner: SpinMutex::new(BumpInner { next: 0, end: 0 }),
        }
    }

    /// Hands the mapped window to the allocator.
    ///
    /// # Safety
    ///
    /// `[base, base + size)` must be mapped, unused kernel memory; must be
    /// called exactly once.
    unsafe fn init(&self, base: u64, size: usize) {
        let mut inner = self.inner.lock();
        debug_assert!(inner.next == 0, "heap: double init");
        inner.next = base;
        inner.end = base + size as u64;
    }
}

// SAFETY: Allocations are bump-carved from an exclusively owned window
// under a lock; they never overlap and stay within the mapped range.
unsafe impl GlobalAlloc for BumpAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let mut inner = self.inner.lock();
        if inner.next == 0 {
            return core::ptr::null_mut();
        }
        let start = inner.next.next_multiple_of(layout.align().max(1) as u64);
        let Some(end) = start.checked_add(layout.size() as u64) else {
            return core::ptr::null_mut();
        };
        if end > inner.end {
            return core::ptr::null_mut();
        }
        inner.next = end;
        start as *mut u8
    }

    unsafe fn dealloc(&self, _ptr: *mut u8, _layout: Layout) {
        // Bump allocator: freed memory is not reclaimed.
    }
}

#[cfg(target_os = "none")]
#[global_allocator]
static HEAP: BumpAllocator = BumpAllocator::new();

#[cfg(not(target_os = "none"))]
static HEAP: BumpAllocator = BumpAllocator::new();

/// Maps the heap window into the master page table and initializes the
/// allocator. Must run before the first process is created — the master
/// table is never grown afterwards.
pub fn init() {
    let space = paging::AddressSpace::kernel();
    let pages = layout::KERNEL_HEAP_SIZE / PAGE_SIZE;
    for page in 0..pages {
        let virt = VirtAddr::new_truncate(layout::KERNEL_HEAP_BASE + (page * PAGE_SIZE) as u64);
        let frame = pmm::alloc_frame();
        space.map(virt, frame, paging::Access::Kernel, paging::MapMode::Panic);
    }
    // SAFETY: The window was just mapped and is used by nothing else.
    unsafe { HEAP.init(layout::KERNEL_HEAP_BASE, layout::KERNEL_HEAP_SIZE) };
    crate::kinfo!(
        "heap: {} KiB at {:#x}",
        layout::KERNEL_HEAP_SIZE >> 10,
        layout::KERNEL_HEAP_BASE
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::boxed::Box;

    #[test]
    fn bump_allocates_aligned_non_overlapping() {
        let allocator = BumpAllocator::new();
        let window = Box::leak(Box::new([0u8; 4096]));
        let base = window.as_ptr() as u64;
        unsafe { allocator.init(base, 4096) };

        let a = unsafe { allocator.alloc(Layout::from_size_align(24, 8).unwrap()) };
        let b = unsafe { allocator.alloc(Layout::from_size_align(100, 16).unwrap()) };
        assert!(!a.is_null() && !b.is_null());
        assert_eq!(b.addr() % 16, 0);
        assert!(b.addr() >= a.addr() + 24);
    }

    #[test]
    fn bump_returns_null_when_exhausted() {
        let allocator = BumpAllocator::new();
        let window = Box::leak(Box::new([0u8; 128]));
        unsafe { allocator.init(window.as_ptr() as u64, 128) };

        let a = unsafe { allocator.alloc(Layout::from_size_align(96, 8).unwrap()) };
        assert!(!a.is_null());
        let b = unsafe { allocator.alloc(Layout::from_size_align(96, 8).unwrap()) };
        assert!(b.is_null());
    }

    #[test]
    fn uninitialized_heap_returns_null() {
        let allocator = BumpAllocator::new();
        let p = unsafe { allocator.alloc(Layout::from_size_align(8, 8).unwrap()) };
        assert!(p.is_null());
    }
}
