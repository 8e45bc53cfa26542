//! Process-lifecycle syscalls.

use crate::arch::x86_64::trap::TrapFrame;
use crate::fs::path::PATH_MAX;
use crate::proc::{self, exec, fork, with_current};
use crate::syscall::{ERR, userptr};

pub(super) fn sys_fork() -> u64 {
    fork::fork().unwrap_or(ERR)
}

/// `execve(path, argv, envp)` — argv and envp are accepted but ignored.
///
/// On success the caller's trap frame is replaced wholesale with the new
/// image's entry frame, so "returning" from the syscall lands at
/// `e_entry` in fresh user state; the old image never sees a result.
pub(super) fn sys_execve(path_ptr: u64, _argv: u64, _envp: u64, frame: &mut TrapFrame) -> u64 {
    let mut buf = [0u8; PATH_MAX];
    let Some(rel) = userptr::read_cstr(path_ptr, &mut buf) else {
        return ERR;
    };
    let cwd = with_current(|p| p.cwd);
    let Ok(abs) = crate::fs::path::PathBuf::resolve(cwd.as_str(), rel) else {
        return ERR;
    };

    let result = with_current(|p| exec::exec(p, abs.as_str()));
    match result {
        Ok(entry_frame) => {
            *frame = entry_frame;
            frame.rax
        }
        Err(err) => {
            crate::kdebug!("execve {abs}: {err}");
            ERR
        }
    }
}

pub(super) fn sys_exit(status: u64) -> u64 {
    proc::exit(status)
}

pub(super) fn sys_wait() -> u64 {
    proc::wait().unwrap_or(ERR)
}
