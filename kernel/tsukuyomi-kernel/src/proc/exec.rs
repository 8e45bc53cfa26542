//! Exec: replace a process image with an ELF64 executable.
//!
//! Only bootloader-module files are loadable. Every `PT_LOAD` segment is
//! mapped page by page with fresh zeroed frames in overwrite mode, so a
//! previous image's mappings are replaced (its frames are leaked — the
//! cost of not tracking per-process frame ownership). The trap frame is
//! rewritten to enter ring 3 at the ELF entry point with a fresh user
//! stack.

use core::fmt;

use tsukuyomi_core::addr::VirtAddr;
use tsukuyomi_core::arch::x86_64::registers::rflags::RFlags;

use crate::arch::x86_64::gdt::{USER_CODE_SELECTOR, USER_DATA_SELECTOR};
use crate::arch::x86_64::trap::TrapFrame;
use crate::fs::vfs::{self, FileHandle};
use crate::fs::{modfs, path::PathBuf};
use crate::mm::{PAGE_SIZE, hhdm, layout, paging, pmm};
use crate::proc::Process;

/// Why an exec failed. The caller's image is untouched for `NotFound`
/// and `NotLoadable`; a parse failure after mapping began leaves the
/// image partially replaced (the process should exit).
#[derive(Debug, Clone, Copy)]
pub enum ExecError {
    /// The path does not resolve.
    NotFound,
    /// The file source has no loader (only boot modules are loadable).
    NotLoadable,
    /// The file is not a valid ELF64 executable.
    BadImage(tsukuyomi_elf::ElfError),
    /// A segment falls outside the user address range.
    BadLayout,
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "executable not found"),
            Self::NotLoadable => write!(f, "no loader for this file source"),
            Self::BadImage(err) => write!(f, "invalid ELF image: {err}"),
            Self::BadLayout => write!(f, "segment outside user address range"),
        }
    }
}

/// Loads `path` into `p`'s address space and returns the trap frame that
/// enters the new image in user mode. The caller stores the frame on the
/// process kernel stack — through its own `&mut` for a live process, or
/// through the direct map for an embryo.
///
/// The process keeps its page table, kernel stack, descriptor table, and
/// working directory; only the user mappings and entry state change.
pub fn exec(p: &mut Process, path: &str) -> Result<TrapFrame, ExecError> {
    let handle = vfs::open(path).ok_or(ExecError::NotFound)?;
    // Per-source loaders: only bootloader modules for now.
    let data = match handle {
        FileHandle::Module(module) => modfs::module_data(module.index),
        _ => return Err(ExecError::NotLoadable),
    };

    let elf = tsukuyomi_elf::ElfFile::parse(data).map_err(ExecError::BadImage)?;
    let space = paging::AddressSpace::for_pml4(p.pml4);

    for segment in elf.load_segments() {
        if segment.memsz == 0 {
            continue;
        }
        let start = segment.vaddr;
        let end = start
            .checked_add(segment.memsz)
            .ok_or(ExecError::BadLayout)?;
        if end > layout::USER_STACK_PAGE || VirtAddr::new_truncate(start).as_u64() != start {
            return Err(ExecError::BadLayout);
        }

        // Fresh zeroed frames for the whole memory range; bytes beyond
        // p_filesz stay zero.
        let first_page = start & !(PAGE_SIZE as u64 - 1);
        let mut page = first_page;
        while page < end {
            let frame = pmm::alloc_frame_zeroed();
            space.map(
                VirtAddr::new_truncate(page),
                frame,
                paging::Access::User,
                paging::MapMode::Overwrite,
            );
            page += PAGE_SIZE as u64;
        }

        copy_into(&space, start, segment.data);
    }

    // Fresh fixed user stack page.
    let stack_frame = pmm::alloc_frame_zeroed();
    space.map(
        VirtAddr::new_truncate(layout::USER_STACK_PAGE),
        stack_frame,
        paging::Access::User,
        paging::MapMode::Overwrite,
    );

    if let Ok(name) = PathBuf::new(path) {
        p.set_name(name.file_name());
    }

    // Enter the new image: user selectors, interrupts on, stack at the
    // top of the fixed user-stack page.
    Ok(TrapFrame {
        es: u64::from(USER_DATA_SELECTOR.as_u16()),
        ds: u64::from(USER_DATA_SELECTOR.as_u16()),
        r15: 0,
        r14: 0,
        r13: 0,
        r12: 0,
        r11: 0,
        r10: 0,
        r9: 0,
        r8: 0,
        rdi: 0,
        rsi: 0,
        rbp: 0,
        rdx: 0,
        rcx: 0,
        rbx: 0,
        rax: 0,
        vector: 0,
        error_code: 0,
        rip: elf.entry_point(),
        cs: u64::from(USER_CODE_SELECTOR.as_u16()),
        rflags: (RFlags::INTERRUPT_FLAG | RFlags::RESERVED_1).bits(),
        rsp: layout::USER_STACK_TOP,
        ss: u64::from(USER_DATA_SELECTOR.as_u16()),
    })
}

/// Copies `bytes` into `space` starting at user virtual address `va`,
/// page by page through the direct map.
fn copy_into(space: &paging::AddressSpace, va: u64, bytes: &[u8]) {
    let mut copied = 0;
    while copied < bytes.len() {
        let dst_va = va + copied as u64;
        let (phys, _) = space
            .translate(VirtAddr::new_truncate(dst_va))
            .expect("exec: segment page not mapped");
        let page_remaining = PAGE_SIZE - (dst_va as usize & (PAGE_SIZE - 1));
        let chunk = page_remaining.min(bytes.len() - copied);
        // SAFETY: The destination frame was just allocated and mapped for
        // this image; the direct-map pointer covers the chunk.
        unsafe {
            core::ptr::copy_nonoverlapping(
                bytes[copied..].as_ptr(),
                hhdm::phys_to_virt(phys).as_mut_ptr::<u8>(),
                chunk,
            );
        }
        copied += chunk;
    }
}
