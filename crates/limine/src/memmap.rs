//! Memory map entry definitions.
//!
//! The memory map describes all physical memory regions and their types.
//! The kernel's frame allocator is seeded from the entries tagged
//! [`MemMapEntryType::Usable`]; everything else must be left alone.

/// The type of a memory map entry.
#[repr(u64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemMapEntryType {
    /// Usable RAM.
    Usable = 0,
    /// Reserved memory.
    Reserved = 1,
    /// ACPI reclaimable memory.
    AcpiReclaimable = 2,
    /// ACPI NVS memory.
    AcpiNvs = 3,
    /// Bad memory.
    BadMemory = 4,
    /// Bootloader reclaimable memory.
    BootloaderReclaimable = 5,
    /// Kernel and modules memory.
    KernelAndModules = 6,
    /// Framebuffer memory.
    Framebuffer = 7,
    /// ACPI tables memory.
    AcpiTables = 8,
}

/// A single entry in the memory map.
#[repr(C)]
pub struct MemMapEntry {
    /// The starting physical address of the memory region.
    pub base: u64,
    /// The length of the memory region in bytes.
    pub length: u64,
    /// The type of the memory region.
    pub type_: MemMapEntryType,
}
