//! Fork: deep-copy process duplication.
//!
//! The child gets a fresh address space (kernel half shared via the
//! master-table copy) into which every user page of the parent below the
//! kernel-stack region is copied frame by frame. The child's kernel
//! stack is not copied — it was freshly seeded by `alloc_process` — but
//! its trap frame is overwritten with the parent's, so both processes
//! resume at the instruction after `int 0x40`; only `rax` differs.

use crate::mm::{PAGE_SIZE, hhdm, layout, paging, pmm};
use crate::proc::{
    PROC_TABLE, ProcState, alloc_process, kstack_ptr, trap_frame_va, with_current,
};

/// Forks the current process. Returns the child PID, or `None` when the
/// process table is full.
pub fn fork() -> Option<u64> {
    let parent_ref = crate::proc::current().expect("fork: no current process");

    // Snapshot everything we need from the parent. We run on the
    // parent's kernel thread, so its record and trap frame are stable.
    let (parent_pml4, name, files, cwd) = with_current(|p| (p.pml4, p.name, p.files, p.cwd));
    // SAFETY: The parent's page table is active; its trap frame pointer
    // is valid on its own kernel stack.
    let parent_tf = unsafe { *with_current(|p| p.trap_frame) };

    let child_ref = alloc_process("fork")?;

    // Copy the user half: every present leaf below the kernel stack
    // region gets a fresh frame with identical contents. The fixed user
    // stack page is mapped in overwrite mode (addresses allocated
    // identically in the parent stay replaceable); everything else must
    // be a first-time mapping in the child.
    let parent_space = paging::AddressSpace::for_pml4(parent_pml4);
    let child_space = {
        // SAFETY: The embryo's record is private to us until promoted.
        let inner = unsafe { PROC_TABLE.inner() };
        paging::AddressSpace::for_pml4(inner.get(child_ref).expect("fork: embryo vanished").pml4)
    };

    parent_space.for_each_user_leaf(|va, phys| {
        let addr = va.as_u64();
        if (layout::KERNEL_STACK_BASE..layout::KERNEL_STACK_TOP).contains(&addr) {
            return; // the child has its own kernel stack
        }
        let frame = pmm::alloc_frame();
        // SAFETY: Source and destination frames are distinct, offset-mapped,
        // and page-sized.
        unsafe {
            core::ptr::copy_nonoverlapping(
                hhdm::phys_to_virt(phys).as_ptr::<u8>(),
                hhdm::phys_to_virt(frame).as_mut_ptr::<u8>(),
                PAGE_SIZE,
            );
        }
        let mode = if addr == layout::USER_STACK_PAGE {
            paging::MapMode::Overwrite
        } else {
            paging::MapMode::Panic
        };
        child_space.map(va, frame, paging::Access::User, mode);
    });

    // Seed the child's trap frame: the parent's, with rax = 0 so the
    // child observes fork returning zero.
    // SAFETY: The child kernel stack is mapped and exclusively ours.
    unsafe {
        let child_tf = kstack_ptr::<crate::arch::x86_64::trap::TrapFrame>(
            &child_space,
            trap_frame_va(),
        );
        *child_tf = parent_tf;
        (*child_tf).rax = 0;
    }

    // Inherit the descriptor table (snapshot by value), the working
    // directory, and the name; link back to the parent and go runnable.
    PROC_TABLE.lock.acquire();
    let pid = {
        // SAFETY: The table lock is held.
        let inner = unsafe { PROC_TABLE.inner() };
        let child = inner.get(child_ref).expect("fork: embryo vanished");
        child.files = files;
        child.cwd = cwd;
        child.name = name;
        child.parent = Some(parent_ref);
        child.state = ProcState::Runnable;
        child.pid
    };
    PROC_TABLE.lock.release();

    Some(pid)
}
