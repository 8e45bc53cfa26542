//! Response structures filled in by the Limine bootloader.

use core::cell::UnsafeCell;

use crate::file::File;
use crate::framebuffer::Framebuffer;
use crate::memmap::MemMapEntry;

/// A response pointer slot inside a request.
///
/// Starts as null; the bootloader stores a pointer to the response structure
/// (in bootloader-reclaimable memory) before control reaches the kernel.
#[repr(transparent)]
pub(crate) struct Response<T>(UnsafeCell<*const T>);

impl<T> Response<T> {
    /// Creates an empty (null) response slot.
    pub(crate) const fn empty() -> Self {
        Self(UnsafeCell::new(core::ptr::null()))
    }

    /// Returns a reference to the response if the bootloader provided one.
    pub(crate) fn get(&self) -> Option<&T> {
        // SAFETY: The bootloader writes the pointer before the kernel runs;
        // afterwards the slot is read-only. A non-null pointer references a
        // valid response structure for the lifetime of the boot handoff data.
        unsafe { (*self.0.get()).as_ref() }
    }
}

/// Response to [`HhdmRequest`](crate::HhdmRequest).
#[repr(C)]
pub struct HhdmResponse {
    /// Response revision.
    pub revision: u64,
    /// Virtual offset of the higher-half direct map: physical address `P` is
    /// mapped at virtual address `offset + P`.
    pub offset: u64,
}

/// Response to [`MemMapRequest`](crate::MemMapRequest).
#[repr(C)]
pub struct MemMapResponse {
    /// Response revision.
    pub revision: u64,
    /// Number of entries in the memory map.
    pub entry_count: u64,
    /// Pointer to an array of `entry_count` entry pointers.
    pub entries: *const *const MemMapEntry,
}

impl MemMapResponse {
    /// Returns an iterator over the memory map entries.
    pub fn entries(&self) -> impl Iterator<Item = &MemMapEntry> {
        // SAFETY: The bootloader guarantees `entries` points to `entry_count`
        // valid entry pointers.
        (0..self.entry_count as usize).map(move |i| unsafe { &**self.entries.add(i) })
    }
}

/// Response to [`RsdpRequest`](crate::RsdpRequest).
#[repr(C)]
pub struct RsdpResponse {
    /// Response revision.
    pub revision: u64,
    /// Physical address of the ACPI RSDP structure.
    pub address: u64,
}

/// Response to [`ModuleRequest`](crate::ModuleRequest).
#[repr(C)]
pub struct ModuleResponse {
    /// Response revision.
    pub revision: u64,
    /// Number of loaded modules.
    pub module_count: u64,
    /// Pointer to an array of `module_count` file pointers.
    pub modules: *const *const File,
}

impl ModuleResponse {
    /// Returns an iterator over the loaded module files.
    pub fn modules(&self) -> impl Iterator<Item = &File> {
        // SAFETY: The bootloader guarantees `modules` points to
        // `module_count` valid file pointers.
        (0..self.module_count as usize).map(move |i| unsafe { &**self.modules.add(i) })
    }
}

/// Response to [`FramebufferRequest`](crate::FramebufferRequest).
#[repr(C)]
pub struct FramebufferResponse {
    /// Response revision.
    pub revision: u64,
    /// Number of framebuffers.
    pub framebuffer_count: u64,
    /// Pointer to an array of `framebuffer_count` framebuffer pointers.
    pub framebuffers: *const *const Framebuffer,
}

impl FramebufferResponse {
    /// Returns an iterator over the available framebuffers.
    pub fn framebuffers(&self) -> impl Iterator<Item = &Framebuffer> {
        // SAFETY: The bootloader guarantees `framebuffers` points to
        // `framebuffer_count` valid framebuffer pointers.
        (0..self.framebuffer_count as usize).map(move |i| unsafe { &**self.framebuffers.add(i) })
    }
}
