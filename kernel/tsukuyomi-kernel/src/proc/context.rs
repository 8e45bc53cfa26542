//! Callee-save context block and the context switch primitive.
//!
//! `switch_context` saves rbx/rbp/r12-r15 on the current stack, stores the
//! resulting stack pointer through `old`, installs `new` as the stack
//! pointer, pops the same register set, and returns — landing wherever the
//! new context's saved return address points. For a process that has run
//! before, that is the instruction after its own `switch_context` call;
//! for a first activation it is `fork_ret`, which falls through into the
//! trap-return epilogue.

/// Callee-saved register block, laid out exactly as `switch_context`
/// pushes it (r15 at the lowest address, the saved return address last).
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct Context {
    /// Saved r15.
    pub r15: u64,
    /// Saved r14.
    pub r14: u64,
    /// Saved r13.
    pub r13: u64,
    /// Saved r12.
    pub r12: u64,
    /// Saved rbx.
    pub rbx: u64,
    /// Saved rbp.
    pub rbp: u64,
    /// Return address popped by the final `ret`.
    pub rip: u64,
}

impl Context {
    /// A zeroed context; the caller must set `rip` before switching in.
    #[must_use]
    pub const fn zeroed() -> Self {
        Self {
            r15: 0,
            r14: 0,
            r13: 0,
            r12: 0,
            rbx: 0,
            rbp: 0,
            rip: 0,
        }
    }
}

#[cfg(target_os = "none")]
core::arch::global_asm!(
    ".section .text",
    ".global switch_context",
    "switch_context:",
    "    push rbp",
    "    push rbx",
    "    push r12",
    "    push r13",
    "    push r14",
    "    push r15",
    "    mov [rdi], rsp",
    "    mov rsp, rsi",
    "    pop r15",
    "    pop r14",
    "    pop r13",
    "    pop r12",
    "    pop rbx",
    "    pop rbp",
    "    ret",
);

#[cfg(target_os = "none")]
unsafe extern "C" {
    /// Saves the current callee-save context, publishing its address
    /// through `old`, and resumes the context at `new`.
    ///
    /// Returns when some other context switches back into the saved one.
    ///
    /// # Safety
    ///
    /// `old` must be a valid slot to store the saved context pointer, and
    /// `new` must point at a context block whose stack is mapped in the
    /// active address space.
    pub fn switch_context(old: *mut *mut Context, new: *const Context);
}

/// Host stand-in so the scheduler type-checks off target.
///
/// # Safety
///
/// Never actually switches; calling it is a logic error.
#[cfg(not(target_os = "none"))]
pub unsafe extern "C" fn switch_context(old: *mut *mut Context, new: *const Context) {
    let _ = (old, new);
    unreachable!("switch_context is only available on bare metal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{offset_of, size_of};

    #[test]
    fn context_matches_push_order() {
        // switch_context pushes rbp, rbx, r12, r13, r14, r15 — so in
        // memory (ascending) the block reads r15, r14, r13, r12, rbx,
        // rbp, then the return address.
        assert_eq!(size_of::<Context>(), 7 * 8);
        assert_eq!(offset_of!(Context, r15), 0);
        assert_eq!(offset_of!(Context, r14), 8);
        assert_eq!(offset_of!(Context, r13), 16);
        assert_eq!(offset_of!(Context, r12), 24);
        assert_eq!(offset_of!(Context, rbx), 32);
        assert_eq!(offset_of!(Context, rbp), 40);
        assert_eq!(offset_of!(Context, rip), 48);
    }
}
