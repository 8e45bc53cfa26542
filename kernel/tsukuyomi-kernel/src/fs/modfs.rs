//! Bootloader-module file source.
//!
//! The boot protocol hands over a list of pre-loaded files, each with a
//! kernel-addressable image, a size, and a NUL-terminated path. This
//! module snapshots that list and serves it to the VFS: exact path match
//! opens a module file, and the module directory can be enumerated.

use core::cell::UnsafeCell;

use noalloc::vec::ArrayVec;
use tsukuyomi_core::addr::VirtAddr;

use crate::fs::FsError;

/// Maximum number of boot modules tracked.
pub const MAX_MODULES: usize = 16;

/// One pre-loaded module file.
#[derive(Debug, Clone, Copy)]
pub struct ModuleInfo {
    /// Kernel-addressable image of the file contents.
    pub addr: VirtAddr,
    /// Size of the image in bytes.
    pub size: u64,
    /// Bootloader-reported path, e.g. `/boot/init`.
    pub path: &'static str,
}

/// An open module file: an index into the module list plus a read offset.
#[derive(Debug, Clone, Copy)]
pub struct ModuleFile {
    /// Index into the module list.
    pub index: usize,
    /// Current read offset.
    pub offset: u64,
}

/// An open handle on the module directory.
#[derive(Debug, Clone, Copy)]
pub struct ModuleDir {
    /// Index of the next module to report from `getdirents`.
    pub next: usize,
}

/// Init-once wrapper; written during boot, read-only afterwards.
struct Modules(UnsafeCell<ArrayVec<ModuleInfo, MAX_MODULES>>);

// SAFETY: Written once during single-threaded boot, then read-only.
unsafe impl Sync for Modules {}

static MODULES: Modules = Modules(UnsafeCell::new(ArrayVec::new()));

/// Records the boot module list.
///
/// # Safety
///
/// Must be called exactly once, during single-threaded boot, before any
/// other function in this module.
pub unsafe fn init(modules: &[ModuleInfo]) {
    // SAFETY: Single-threaded boot; nothing reads the list yet.
    let list = unsafe { &mut *MODULES.0.get() };
    for module in modules {
        if list.try_push(*module).is_err() {
            crate::kwarn!("modfs: more than {MAX_MODULES} modules, ignoring {}", module.path);
            break;
        }
    }
    crate::kinfo!("modfs: {} module(s) registered", list.len());
}

fn modules() -> &'static [ModuleInfo] {
    // SAFETY: After init the list is read-only.
    unsafe { (*MODULES.0.get()).as_slice() }
}

/// Looks a module up by exact path.
#[must_use]
pub fn find(path: &str) -> Option<ModuleFile> {
    modules()
        .iter()
        .position(|m| m.path == path)
        .map(|index| ModuleFile { index, offset: 0 })
}

/// Returns the full contents of module `index`.
///
/// # Panics
///
/// Panics if `index` is out of range; handles only ever hold indices
/// produced by [`find`].
#[must_use]
pub fn module_data(index: usize) -> &'static [u8] {
    let module = &modules()[index];
    // SAFETY: The bootloader maps `size` bytes at `addr` for the lifetime
    // of the machine; the kernel never reclaims module memory.
    unsafe { core::slice::from_raw_parts(module.addr.as_ptr::<u8>(), module.size as usize) }
}

/// Reads from an open module file, advancing its offset.
pub fn read(file: &mut ModuleFile, buf: &mut [u8]) -> Result<usize, FsError> {
    let data = module_data(file.index);
    let offset = (file.offset as usize).min(data.len());
    let count = buf.len().min(data.len() - offset);
    buf[..count].copy_from_slice(&data[offset..offset + count]);
    file.offset += count as u64;
    Ok(count)
}

/// Enumerates module basenames into fixed directory-entry records.
pub fn getdirents(dir: &mut ModuleDir, buf: &mut [u8]) -> Result<usize, FsError> {
    let list = modules();
    let mut written = 0;
    while dir.next < list.len() && (written + 1) * crate::fs::DIRENT_SIZE <= buf.len() {
        let path = list[dir.next].path;
        let name = path.rsplit('/').next().unwrap_or(path);
        crate::fs::write_dirent(
            &mut buf[written * crate::fs::DIRENT_SIZE..],
            name.as_bytes(),
        );
        dir.next += 1;
        written += 1;
    }
    Ok(written)
}
