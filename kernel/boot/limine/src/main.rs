//! Limine boot stub.
//!
//! The bootloader loads the kernel higher-half, fills in the protocol
//! responses, and jumps to `_start`. This stub brings up early serial
//! logging, converts the responses into the kernel's [`BootInfo`], and
//! hands control to `kernel_init`, which never returns.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

mod requests;

use limine::framebuffer::MEMORY_MODEL_RGB;
use limine::memmap::MemMapEntryType;
use noalloc::vec::ArrayVec;
use tsukuyomi_core::addr::{PhysAddr, VirtAddr};
use tsukuyomi_kernel::boot::{BootInfo, FramebufferInfo, MemoryRegion, ModuleInfo};
use tsukuyomi_kernel::{kinfo, kwarn};

use crate::requests::REQUESTS;

/// Limine entry point.
#[cfg_attr(target_os = "none", unsafe(no_mangle))]
extern "C" fn _start() -> ! {
    // SAFETY: Boot entry runs once, before anything else logs.
    unsafe { tsukuyomi_kernel::log::init_early_serial() };

    assert!(
        REQUESTS.base_revision.is_supported(),
        "limine base revision not supported"
    );
    kinfo!("tsukuyomi: booting via limine");

    let boot_info = build_boot_info();
    tsukuyomi_kernel::boot::kernel_init(&boot_info)
}

/// Normalizes the Limine responses into [`BootInfo`].
fn build_boot_info() -> BootInfo {
    let hhdm_offset = REQUESTS
        .hhdm
        .response()
        .expect("limine: no HHDM response")
        .offset;

    let mut memory_map = ArrayVec::new();
    let memmap = REQUESTS
        .memmap
        .response()
        .expect("limine: no memory map response");
    for entry in memmap.entries() {
        let region = MemoryRegion {
            start: PhysAddr::new(entry.base),
            size: entry.length,
            usable: entry.type_ == MemMapEntryType::Usable,
        };
        if memory_map.try_push(region).is_err() {
            kwarn!("limine: memory map truncated");
            break;
        }
    }

    let rsdp = REQUESTS
        .rsdp
        .response()
        .map(|response| PhysAddr::new(response.address));

    let mut modules = ArrayVec::new();
    if let Some(response) = REQUESTS.modules.response() {
        for file in response.modules() {
            // SAFETY: Module files live in bootloader-reclaimable memory
            // that this kernel never reclaims, so the path and contents
            // are effectively 'static.
            let path: &'static str = unsafe { core::mem::transmute::<&str, &str>(file.path()) };
            let module = ModuleInfo {
                addr: VirtAddr::new_truncate(file.address),
                size: file.size,
                path,
            };
            if modules.try_push(module).is_err() {
                kwarn!("limine: module list truncated");
                break;
            }
        }
    }

    let framebuffer = REQUESTS.framebuffer.response().and_then(|response| {
        response
            .framebuffers()
            .find(|fb| fb.memory_model == MEMORY_MODEL_RGB)
            .map(|fb| FramebufferInfo {
                address: VirtAddr::new_truncate(fb.address),
                width: fb.width,
                height: fb.height,
                pitch: fb.pitch,
                bpp: fb.bpp,
            })
    });

    BootInfo {
        hhdm_offset,
        memory_map,
        rsdp,
        modules,
        framebuffer,
    }
}

/// Fatal errors render over serial, then the CPU halts for good.
#[cfg(target_os = "none")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    tsukuyomi_kernel::kfatal!("kernel panic: {info}");
    tsukuyomi_core::arch::x86_64::instructions::halt_loop()
}

/// Host builds only type-check the stub; there is nothing to run.
#[cfg(not(target_os = "none"))]
fn main() {}
