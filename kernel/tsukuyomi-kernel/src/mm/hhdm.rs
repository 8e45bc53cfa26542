//! Higher-half direct map (offset map) bookkeeping.
//!
//! The bootloader maps all physical memory at a fixed virtual offset `O`,
//! so physical address `P` is readable at `O + P`. This module stores that
//! offset globally so page-table walks and frame zeroing do not have to
//! thread it through every call.

use core::sync::atomic::{AtomicU64, Ordering};

use tsukuyomi_core::addr::{PhysAddr, VirtAddr};

/// Sentinel marking the offset as not yet initialized.
const UNINIT: u64 = u64::MAX;

static OFFSET: AtomicU64 = AtomicU64::new(UNINIT);

/// Records the direct-map offset. Must be called exactly once, early in boot.
///
/// # Panics
///
/// Panics on double initialization.
pub fn init(offset: u64) {
    let prev = OFFSET.compare_exchange(UNINIT, offset, Ordering::Release, Ordering::Relaxed);
    assert!(prev.is_ok(), "hhdm: already initialized");
}

/// Returns the direct-map offset.
///
/// # Panics
///
/// Panics if called before [`init`].
#[inline]
pub fn offset() -> u64 {
    let val = OFFSET.load(Ordering::Acquire);
    assert!(val != UNINIT, "hhdm: accessed before initialization");
    val
}

/// Converts a physical address to its direct-mapped virtual address.
#[inline]
pub fn phys_to_virt(phys: PhysAddr) -> VirtAddr {
    VirtAddr::new_truncate(offset() + phys.as_u64())
}

/// Converts a direct-mapped virtual address back to its physical address.
///
/// # Panics
///
/// Panics if `virt` does not lie inside the offset map; translating an
/// arbitrary kernel pointer this way is a programming error.
#[inline]
pub fn virt_to_phys(virt: VirtAddr) -> PhysAddr {
    let off = offset();
    assert!(
        virt.as_u64() >= off,
        "hhdm: {virt:?} is not an offset-mapped pointer"
    );
    PhysAddr::new(virt.as_u64() - off)
}
