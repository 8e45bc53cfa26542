//! Round-robin scheduler, context hand-off, and sleep/wake channels.
//!
//! The scheduler runs on its own stack (the boot stack) and never
//! returns. It owns the CPU whenever no process does: it scans the table
//! for a runnable entry, points `TSS.rsp0` at the process kernel stack,
//! reloads the GDT with the process TSS, activates the process page
//! table, and switches contexts. The table lock is held across that
//! switch; whoever wakes up on the other side releases it — `fork_ret`
//! for a first activation, the tail of `yield`/`sleep` otherwise — and
//! symmetrically re-acquires it before switching back.

use tsukuyomi_core::arch::x86_64::instructions::interrupts;
use tsukuyomi_core::sync::SpinLock;

use crate::mm::{layout, paging};
use crate::proc::{
    NPROC, PROC_TABLE, ProcState, ProcRef, TableInner, context, cpu_ptr, current,
};

/// The scheduler loop. Never returns.
///
/// Interrupts are enabled at the top of every pass so pending IRQs get a
/// chance to run between scans even when nothing is runnable.
pub fn scheduler() -> ! {
    crate::kinfo!("sched: entering scheduler loop");
    loop {
        interrupts::enable();

        PROC_TABLE.lock.acquire();
        for index in 0..NPROC {
            let (pref, pml4, ctx) = {
                // SAFETY: The table lock is held; the borrow ends before
                // the context switch below.
                let inner = unsafe { PROC_TABLE.inner() };
                let slot_generation = {
                    let slot = &mut inner.slots[index];
                    if slot.proc.state != ProcState::Runnable {
                        continue;
                    }
                    slot.proc.state = ProcState::Running;
                    slot.generation
                };
                let pref = ProcRef {
                    index,
                    generation: slot_generation,
                };
                let p = inner.get(pref).expect("sched: runnable slot vanished");
                (pref, p.pml4, p.context as *const context::Context)
            };

            // SAFETY: Single-CPU per-CPU state; no live borrows span the
            // switch. The process page table maps the kernel half and the
            // process kernel stack, so execution continues seamlessly
            // after CR3 changes.
            unsafe {
                (*cpu_ptr()).current = Some(pref);
                (*cpu_ptr())
                    .descriptors
                    .set_kernel_stack(layout::KERNEL_STACK_TOP);
                paging::AddressSpace::for_pml4(pml4).activate();

                let sched_slot = &raw mut (*cpu_ptr()).scheduler_context;
                context::switch_context(sched_slot, ctx);

                // The process switched back out (yield, sleep, or exit);
                // it re-acquired the table lock before doing so.
                paging::AddressSpace::kernel().activate();
                (*cpu_ptr()).descriptors.load_plain();
                (*cpu_ptr()).current = None;
            }
        }
        PROC_TABLE.lock.release();
    }
}

/// Switches from the current process back to the scheduler context.
///
/// The caller must hold the table lock — and only the table lock — and
/// must already have moved the process out of `Running`. The outermost
/// interrupt state is saved around the switch: it belongs to this kernel
/// context, not to whichever context runs next.
pub(crate) fn switch_to_scheduler() {
    debug_assert!(PROC_TABLE.lock.is_held(), "sched: switching without the lock");
    debug_assert_eq!(
        tsukuyomi_core::sync::interrupt_disable_depth(),
        1,
        "sched: switching with extra locks held"
    );

    let pref = current().expect("sched: switching without a process");
    let ctx_slot = {
        // SAFETY: The table lock is held; the borrow ends before the
        // switch.
        let inner = unsafe { PROC_TABLE.inner() };
        let p = inner.get(pref).expect("sched: stale current process");
        debug_assert!(
            p.state != ProcState::Running,
            "sched: switching out while still Running"
        );
        &raw mut p.context
    };

    let interrupt_state = tsukuyomi_core::sync::saved_interrupt_state();
    // SAFETY: The scheduler context was saved by the scheduler's own
    // switch_context call; the slot pointer targets static table memory.
    unsafe {
        let sched_ctx = (*cpu_ptr()).scheduler_context;
        context::switch_context(ctx_slot, sched_ctx);
    }
    tsukuyomi_core::sync::restore_interrupt_state(interrupt_state);
}

/// Voluntarily gives up the CPU; the process stays runnable.
pub fn yield_cpu() {
    PROC_TABLE.lock.acquire();
    {
        let pref = current().expect("yield: no current process");
        // SAFETY: The table lock is held.
        let inner = unsafe { PROC_TABLE.inner() };
        inner.get(pref).expect("yield: stale current").state = ProcState::Runnable;
    }
    switch_to_scheduler();
    PROC_TABLE.lock.release();
}

/// Blocks the current process on `channel`.
///
/// `lock` is whatever lock the caller used to check its wait condition
/// (e.g. a ring-buffer lock). If it is not the process-table lock, the
/// table lock is acquired *before* `lock` is released; a producer that
/// wakes the channel does so while holding `lock`, so the wake-up cannot
/// slip between the check and the state change. The caller's lock is
/// re-acquired before returning.
pub fn sleep(channel: u64, lock: &SpinLock) {
    assert!(channel != 0, "sleep: zero wait channel");
    let ptable = &PROC_TABLE.lock;
    let handoff = !core::ptr::eq(lock, ptable);
    if handoff {
        ptable.acquire();
        lock.release();
    }

    let pref = current().expect("sleep: no current process");
    {
        // SAFETY: The table lock is held.
        let inner = unsafe { PROC_TABLE.inner() };
        let p = inner.get(pref).expect("sleep: stale current");
        p.wait_channel = channel;
        p.state = ProcState::Sleeping;
    }

    switch_to_scheduler();

    {
        // SAFETY: The table lock is held again (the scheduler held it
        // across the switch back).
        let inner = unsafe { PROC_TABLE.inner() };
        inner.get(pref).expect("sleep: stale current").wait_channel = 0;
    }

    if handoff {
        ptable.release();
        lock.acquire();
    }
}

/// Wakes every process sleeping on `channel`. Callers must hold the
/// table lock.
pub(crate) fn wake_locked(inner: &mut TableInner, channel: u64) {
    for slot in &mut inner.slots {
        if slot.proc.state == ProcState::Sleeping && slot.proc.wait_channel == channel {
            slot.proc.state = ProcState::Runnable;
        }
    }
}

/// Wakes every process sleeping on `channel`, taking the table lock.
/// Spurious and duplicate wake-ups are harmless: sleepers re-check their
/// condition.
pub fn awaken(channel: u64) {
    PROC_TABLE.lock.acquire();
    // SAFETY: The table lock is held.
    wake_locked(unsafe { PROC_TABLE.inner() }, channel);
    PROC_TABLE.lock.release();
}

/// First activation of a freshly created process.
///
/// The scheduler held the table lock across the context switch that
/// started this process; release it exactly once, then return — the
/// seeded stack drops straight into the trap-return epilogue, which pops
/// the initial trap frame and enters user mode with `iretq`.
extern "C" fn fork_ret() {
    PROC_TABLE.lock.release();
}

/// Address of [`fork_ret`] for seeding initial contexts.
pub(crate) fn fork_ret_addr() -> u64 {
    fork_ret as usize as u64
}
