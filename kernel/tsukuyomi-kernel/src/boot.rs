//! Bootloader-agnostic boot information and the kernel entry point.
//!
//! The boot stub normalizes whatever the bootloader hands over into a
//! [`BootInfo`] — direct-map offset, usable-memory map, RSDP, module
//! list, framebuffer — and calls [`kernel_init`], which brings the
//! subsystems up in dependency order and becomes the scheduler.

use noalloc::vec::ArrayVec;
use tsukuyomi_core::addr::{PhysAddr, VirtAddr};

pub use crate::fs::modfs::{MAX_MODULES, ModuleInfo};

/// Maximum memory-map entries carried in [`BootInfo`].
pub const MAX_MEMORY_REGIONS: usize = 64;

/// A physical memory region from the bootloader map.
#[derive(Debug, Clone, Copy)]
pub struct MemoryRegion {
    /// Physical start address.
    pub start: PhysAddr,
    /// Size in bytes.
    pub size: u64,
    /// Whether the region is free RAM the kernel may allocate from.
    pub usable: bool,
}

/// A linear framebuffer (32-bit BGR pixels).
#[derive(Debug, Clone, Copy)]
pub struct FramebufferInfo {
    /// Virtual address of the framebuffer memory.
    pub address: VirtAddr,
    /// Width in pixels.
    pub width: u64,
    /// Height in pixels.
    pub height: u64,
    /// Bytes per scanline.
    pub pitch: u64,
    /// Bits per pixel.
    pub bpp: u16,
}

/// Everything the kernel needs from the bootloader.
pub struct BootInfo {
    /// Offset of the higher-half direct map.
    pub hhdm_offset: u64,
    /// The physical memory map.
    pub memory_map: ArrayVec<MemoryRegion, MAX_MEMORY_REGIONS>,
    /// Physical address of the ACPI RSDP, when reported.
    pub rsdp: Option<PhysAddr>,
    /// Pre-loaded module files.
    pub modules: ArrayVec<ModuleInfo, MAX_MODULES>,
    /// The first usable framebuffer, when present.
    pub framebuffer: Option<FramebufferInfo>,
}

/// Path of the first user program among the boot modules.
const INIT_PATH: &str = "/boot/init";
/// Path of the console font module.
const FONT_PATH: &str = "/boot/font.psf";

/// Brings the kernel up and never returns.
///
/// Subsystem order: direct map, descriptor tables, frame allocator,
/// paging master capture, heap (mapped into the master table before the
/// first process can exist), module list, console, interrupt
/// controllers, input, disk, and finally the first process and the
/// scheduler loop.
pub fn kernel_init(boot: &BootInfo) -> ! {
    crate::mm::hhdm::init(boot.hhdm_offset);

    // SAFETY: Single-threaded boot; each init runs exactly once.
    unsafe {
        crate::proc::init_cpu();
        crate::arch::x86_64::idt::init();
        crate::mm::pmm::init(&boot.memory_map);
    }
    crate::mm::paging::init();
    crate::mm::heap::init();

    if let Some(rsdp) = boot.rsdp {
        crate::kinfo!("boot: rsdp at {:#x}", rsdp.as_u64());
    }

    // SAFETY: Single-threaded boot.
    unsafe { crate::fs::modfs::init(&boot.modules) };

    if let Some(fb) = &boot.framebuffer {
        init_console(fb);
    }

    // SAFETY: Interrupts are still disabled; handlers are installed.
    unsafe {
        crate::drivers::lapic::init();
        crate::drivers::ioapic::init();
    }
    crate::drivers::i8042::init();
    crate::drivers::ata::init();
    crate::fs::vfs::mount_disk();

    crate::proc::spawn_init(INIT_PATH);
    crate::proc::sched::scheduler()
}

/// Attaches the framebuffer console if a font module is present.
fn init_console(fb: &FramebufferInfo) {
    if fb.bpp != 32 {
        crate::kwarn!("boot: framebuffer is {}bpp, console disabled", fb.bpp);
        return;
    }
    let Some(font_file) = crate::fs::modfs::find(FONT_PATH) else {
        crate::kinfo!("boot: no {FONT_PATH} module, console stays on serial");
        return;
    };
    let data = crate::fs::modfs::module_data(font_file.index);
    match crate::drivers::fbcon::psf::PsfFont::parse(data) {
        Ok(font) => crate::drivers::fbcon::init(fb, font),
        Err(err) => crate::kwarn!("boot: bad console font: {err:?}"),
    }
}
