//! File and directory syscalls.
//!
//! Blocking reads take the file handle out of the descriptor slot for
//! the duration of the operation and put it back afterwards, so no
//! borrow of the process record spans a sleep.

use crate::fs::path::{PATH_MAX, PathBuf};
use crate::fs::vfs;
use crate::proc::with_current;
use crate::syscall::{ERR, userptr};

/// Reads a user path argument and resolves it against the current
/// working directory. `None` covers bad pointers and over-long paths.
fn resolve_user_path(path_ptr: u64) -> Option<PathBuf> {
    let mut buf = [0u8; PATH_MAX];
    let rel = userptr::read_cstr(path_ptr, &mut buf)?;
    let cwd = with_current(|p| p.cwd);
    PathBuf::resolve(cwd.as_str(), rel).ok()
}

pub(super) fn sys_read(fd: u64, buf: u64, count: u64) -> u64 {
    let Some(range) = userptr::UserSlice::new(buf, count) else {
        return ERR;
    };
    let fd = fd as usize;
    let Some(mut handle) = with_current(|p| p.files.get_mut(fd).and_then(Option::take)) else {
        return ERR;
    };

    // SAFETY: The range was validated user-half; the process's own
    // mappings back it while this process executes.
    let result = vfs::read(&mut handle, unsafe { range.as_mut_slice() });

    with_current(|p| p.files[fd] = Some(handle));
    match result {
        Ok(count) => count as u64,
        Err(_) => ERR,
    }
}

pub(super) fn sys_write(fd: u64, buf: u64, count: u64) -> u64 {
    let Some(range) = userptr::UserSlice::new(buf, count) else {
        return ERR;
    };
    let Some(handle) = with_current(|p| p.files.get(fd as usize).copied().flatten()) else {
        return ERR;
    };

    // SAFETY: As in sys_read.
    match vfs::write(&handle, unsafe { range.as_slice() }) {
        Ok(count) => count as u64,
        Err(_) => ERR,
    }
}

pub(super) fn sys_open(path_ptr: u64) -> u64 {
    let Some(abs) = resolve_user_path(path_ptr) else {
        return ERR;
    };
    let Some(handle) = vfs::open(abs.as_str()) else {
        return ERR;
    };
    match with_current(|p| p.alloc_fd(handle)) {
        Some(fd) => fd as u64,
        None => ERR,
    }
}

pub(super) fn sys_close(fd: u64) -> u64 {
    let closed = with_current(|p| p.files.get_mut(fd as usize).and_then(Option::take));
    if closed.is_some() { 0 } else { ERR }
}

pub(super) fn sys_getdirents(fd: u64, buf: u64, count: u64) -> u64 {
    let Some(range) = userptr::UserSlice::new(buf, count) else {
        return ERR;
    };
    let fd = fd as usize;
    let Some(mut handle) = with_current(|p| p.files.get_mut(fd).and_then(Option::take)) else {
        return ERR;
    };

    // SAFETY: As in sys_read.
    let result = vfs::getdirents(&mut handle, unsafe { range.as_mut_slice() });

    with_current(|p| p.files[fd] = Some(handle));
    match result {
        Ok(count) => count as u64,
        Err(_) => ERR,
    }
}

pub(super) fn sys_setcwd(path_ptr: u64) -> u64 {
    let Some(abs) = resolve_user_path(path_ptr) else {
        return ERR;
    };
    // The new directory must at least be openable.
    if vfs::open(abs.as_str()).is_none() {
        return ERR;
    }
    with_current(|p| p.cwd = abs);
    0
}
