//! VFS dispatcher.
//!
//! Open files are a tagged variant over the supported file kinds — the
//! TTY, bootloader-module files, FAT16 files — stored by value in each
//! process's descriptor table. `read`/`write`/`getdirents` dispatch on
//! the tag and forward to the owning backend.
//!
//! Path namespace: `/dev/tty` is the console; module paths (e.g.
//! `/boot/init`) resolve against the bootloader module list, with
//! `/boot` itself enumerable; every other absolute path is served from
//! the FAT16 volume discovered at boot, when one exists.

use tsukuyomi_core::sync::SpinMutex;

use crate::drivers::ata::{self, AtaDrive};
use crate::fs::fat16::{DirLocation, Fat16Dir, Fat16File, Fat16Volume};
use crate::fs::modfs::{self, ModuleDir, ModuleFile};
use crate::fs::{FsError, gpt};
use crate::tty;

/// The console device path.
const TTY_PATH: &str = "/dev/tty";
/// The module directory path.
const MODULE_DIR_PATH: &str = "/boot";

/// An open file, stored by value in the per-process descriptor table.
#[derive(Debug, Clone, Copy)]
pub enum FileHandle {
    /// The console device.
    Tty,
    /// A bootloader-module file.
    Module(ModuleFile),
    /// The bootloader-module directory.
    ModuleDir(ModuleDir),
    /// A FAT16 regular file.
    Fat16(Fat16File),
    /// A FAT16 directory.
    Fat16Dir(Fat16Dir),
}

/// The FAT16 volume mounted from the first GPT partition, if any.
static VOLUME: SpinMutex<Option<Fat16Volume<AtaDrive>>> = SpinMutex::new(None);

/// Discovers a GPT partition on the primary drive and mounts it FAT16.
/// Absence of a disk, partition, or filesystem is not an error — the
/// machine just runs from modules alone.
pub fn mount_disk() {
    let Some(mut drive) = ata::take_primary() else {
        return;
    };
    let partition = match gpt::first_partition(&mut drive) {
        Ok(Some(partition)) => partition,
        Ok(None) => {
            crate::kinfo!("vfs: no GPT partition on primary drive");
            return;
        }
        Err(err) => {
            crate::kwarn!("vfs: partition scan failed: {err}");
            return;
        }
    };
    match Fat16Volume::mount(drive, partition.first_lba) {
        Ok(volume) => {
            *VOLUME.lock() = Some(volume);
            crate::kinfo!("vfs: FAT16 volume mounted at lba {}", partition.first_lba);
        }
        Err(err) => crate::kwarn!("vfs: FAT16 mount failed: {err}"),
    }
}

/// Opens an absolute path.
#[must_use]
pub fn open(path: &str) -> Option<FileHandle> {
    if path == TTY_PATH {
        return Some(FileHandle::Tty);
    }
    if path == MODULE_DIR_PATH {
        return Some(FileHandle::ModuleDir(ModuleDir { next: 0 }));
    }
    if let Some(module) = modfs::find(path) {
        return Some(FileHandle::Module(module));
    }

    let mut guard = VOLUME.lock();
    let volume = guard.as_mut()?;
    if path == "/" {
        return Some(FileHandle::Fat16Dir(Fat16Dir {
            location: DirLocation::Root,
            next: 0,
        }));
    }
    match volume.lookup(path) {
        Ok(Some(entry)) if entry.is_directory() => Some(FileHandle::Fat16Dir(Fat16Dir {
            location: DirLocation::Cluster(entry.start_cluster),
            next: 0,
        })),
        Ok(Some(entry)) => Some(FileHandle::Fat16(Fat16File {
            start_cluster: entry.start_cluster,
            size: entry.size,
            offset: 0,
        })),
        Ok(None) => None,
        Err(err) => {
            crate::kwarn!("vfs: lookup {path:?} failed: {err}");
            None
        }
    }
}

/// Reads from an open file.
///
/// # Errors
///
/// Returns [`FsError::NotSupported`] for directories and propagates
/// backend errors.
pub fn read(handle: &mut FileHandle, buf: &mut [u8]) -> Result<usize, FsError> {
    match handle {
        FileHandle::Tty => Ok(tty::read(buf)),
        FileHandle::Module(file) => modfs::read(file, buf),
        FileHandle::Fat16(file) => {
            let mut guard = VOLUME.lock();
            let volume = guard.as_mut().ok_or(FsError::Io)?;
            volume.read_file(file, buf)
        }
        FileHandle::ModuleDir(_) | FileHandle::Fat16Dir(_) => Err(FsError::NotSupported),
    }
}

/// Writes to an open file. Only the TTY is writable.
///
/// # Errors
///
/// Returns [`FsError::ReadOnly`] for every other file kind.
pub fn write(handle: &FileHandle, buf: &[u8]) -> Result<usize, FsError> {
    match handle {
        FileHandle::Tty => Ok(tty::write(buf)),
        _ => Err(FsError::ReadOnly),
    }
}

/// Enumerates a directory into fixed 257-byte records.
///
/// # Errors
///
/// Returns [`FsError::NotSupported`] for non-directories.
pub fn getdirents(handle: &mut FileHandle, buf: &mut [u8]) -> Result<usize, FsError> {
    match handle {
        FileHandle::ModuleDir(dir) => modfs::getdirents(dir, buf),
        FileHandle::Fat16Dir(dir) => {
            let mut guard = VOLUME.lock();
            let volume = guard.as_mut().ok_or(FsError::Io)?;
            volume.getdirents(dir, buf)
        }
        _ => Err(FsError::NotSupported),
    }
}
