//! Processes: the table, per-CPU state, and lifecycle.
//!
//! Process records live in a fixed arena of generational slots; weak
//! references ([`ProcRef`]) carry the slot index plus the generation
//! observed at creation, so a parent link that lands on a reused slot is
//! detected instead of silently adopting a stranger.
//!
//! The process-table lock globally orders every state transition. It is a
//! raw [`SpinLock`] because it is deliberately handed across context
//! switches: the scheduler acquires it, and either the first activation
//! releases it (in `fork_ret`) or a re-entered `yield`/`sleep`/`exit`
//! releases it on its way out.

pub mod context;
pub mod exec;
pub mod fork;
pub mod sched;

use core::cell::UnsafeCell;

use tsukuyomi_core::addr::{PhysAddr, VirtAddr};
use tsukuyomi_core::sync::SpinLock;

use crate::arch::x86_64::gdt::CpuDescriptors;
use crate::arch::x86_64::trap::{self, TrapFrame};
use crate::fs::path::PathBuf;
use crate::fs::vfs::FileHandle;
use crate::mm::{hhdm, layout, paging};
use self::context::Context;

/// Size of the process table.
pub const NPROC: usize = 64;
/// Open files per process.
pub const NOFILE: usize = 16;
/// Process name length (NUL-padded).
pub const NAME_LEN: usize = 16;

/// Process lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    /// Free slot.
    Unused,
    /// Allocated but not yet runnable; visible only to its creator.
    Embryo,
    /// Ready for the scheduler to pick.
    Runnable,
    /// Currently executing on the CPU.
    Running,
    /// Exited; awaiting reaping by the parent.
    Zombie,
    /// Blocked on a wait channel.
    Sleeping,
}

/// A weak reference to a process: slot index plus the generation at the
/// time the reference was taken. Stale references fail the generation
/// check instead of aliasing a reused slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcRef {
    /// Slot index in the table.
    pub index: usize,
    /// Slot generation the reference was minted against.
    pub generation: u64,
}

/// A process record.
pub struct Process {
    /// Human-readable name, NUL-padded.
    pub name: [u8; NAME_LEN],
    /// Lifecycle state.
    pub state: ProcState,
    /// Monotonically increasing process ID.
    pub pid: u64,
    /// Weak reference to the parent, if any.
    pub parent: Option<ProcRef>,
    /// Physical address of the top-level page table.
    pub pml4: PhysAddr,
    /// Trap frame on the kernel stack (valid while this process's page
    /// table is active; resolve through the page table otherwise).
    pub trap_frame: *mut TrapFrame,
    /// Saved callee-save context on the kernel stack.
    pub context: *mut Context,
    /// Exit status, defined once the process is a zombie.
    pub exit_status: u64,
    /// Open-file table; the index is the file descriptor.
    pub files: [Option<FileHandle>; NOFILE],
    /// Wait channel; zero means not waiting.
    pub wait_channel: u64,
    /// Current working directory.
    pub cwd: PathBuf,
}

impl Process {
    /// An unused record.
    const fn unused() -> Self {
        Self {
            name: [0; NAME_LEN],
            state: ProcState::Unused,
            pid: 0,
            parent: None,
            pml4: PhysAddr::zero(),
            trap_frame: core::ptr::null_mut(),
            context: core::ptr::null_mut(),
            exit_status: 0,
            files: [None; NOFILE],
            wait_channel: 0,
            cwd: PathBuf::root(),
        }
    }

    /// Returns the record to the unused state.
    ///
    /// Only the slot is reclaimed here: the user pages, page tables, and
    /// kernel stack of the dead process stay allocated until the slot's
    /// next occupant replaces them.
    fn reset(&mut self) {
        *self = Self::unused();
    }

    /// Stores a new name, truncating to [`NAME_LEN`].
    pub fn set_name(&mut self, name: &str) {
        self.name = [0; NAME_LEN];
        let len = name.len().min(NAME_LEN - 1);
        self.name[..len].copy_from_slice(&name.as_bytes()[..len]);
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn name(&self) -> &str {
        let len = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        core::str::from_utf8(&self.name[..len]).unwrap_or("?")
    }

    /// Installs a file handle in the lowest free descriptor slot.
    pub fn alloc_fd(&mut self, handle: FileHandle) -> Option<usize> {
        let slot = self.files.iter().position(Option::is_none)?;
        self.files[slot] = Some(handle);
        Some(slot)
    }
}

/// One arena slot: a generation counter plus the record.
struct ProcSlot {
    generation: u64,
    proc: Process,
}

/// The table proper, protected by [`ProcessTable::lock`].
pub struct TableInner {
    slots: [ProcSlot; NPROC],
    next_pid: u64,
}

impl TableInner {
    /// Resolves a weak reference, checking the slot generation.
    pub fn get(&mut self, pref: ProcRef) -> Option<&mut Process> {
        let slot = &mut self.slots[pref.index];
        if slot.generation != pref.generation || slot.proc.state == ProcState::Unused {
            return None;
        }
        Some(&mut slot.proc)
    }

    /// The wait channel conventionally associated with a slot: the
    /// address of its process record.
    pub fn channel_of(&self, index: usize) -> u64 {
        core::ptr::from_ref(&self.slots[index].proc) as u64
    }
}

/// The process table: a raw lock plus the slot arena.
pub struct ProcessTable {
    /// Orders all process state transitions; held across context
    /// switches per the scheduler protocol.
    pub lock: SpinLock,
    inner: UnsafeCell<TableInner>,
}

// SAFETY: `inner` is only accessed under `lock` (or during the
// single-threaded windows documented at the access sites).
unsafe impl Sync for ProcessTable {}

impl ProcessTable {
    const fn new() -> Self {
        Self {
            lock: SpinLock::new(),
            inner: UnsafeCell::new(TableInner {
                slots: [const {
                    ProcSlot {
                        generation: 0,
                        proc: Process::unused(),
                    }
                }; NPROC],
                next_pid: 1,
            }),
        }
    }

    /// Returns the table contents.
    ///
    /// # Safety
    ///
    /// The caller must hold [`ProcessTable::lock`], or be in a context
    /// where no other access can exist (single-threaded boot; a running
    /// process touching only its own record). The returned borrow must
    /// end before any context switch.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn inner(&self) -> &mut TableInner {
        unsafe { &mut *self.inner.get() }
    }
}

/// The single process table.
pub static PROC_TABLE: ProcessTable = ProcessTable::new();

/// Per-CPU state: descriptor tables, the scheduler's saved context, and
/// the currently running process.
pub struct Cpu {
    /// The CPU's GDT and TSS.
    pub descriptors: CpuDescriptors,
    /// Saved scheduler context, written by `switch_context` when the
    /// scheduler hands the CPU to a process.
    pub scheduler_context: *mut Context,
    /// The process currently in [`ProcState::Running`], if any.
    pub current: Option<ProcRef>,
}

impl Cpu {
    const fn new() -> Self {
        Self {
            descriptors: CpuDescriptors::new(),
            scheduler_context: core::ptr::null_mut(),
            current: None,
        }
    }
}

/// `Sync` wrapper for the single-CPU record; accessed with interrupts
/// disabled or from contexts that own the CPU.
struct CpuCell(UnsafeCell<Cpu>);

// SAFETY: Single logical CPU; see access-site comments.
unsafe impl Sync for CpuCell {}

static CPU: CpuCell = CpuCell(UnsafeCell::new(Cpu::new()));

/// Raw pointer to the CPU record; dereference scopes must not span a
/// context switch.
pub(crate) fn cpu_ptr() -> *mut Cpu {
    CPU.0.get()
}

/// Loads this CPU's descriptor tables.
///
/// # Safety
///
/// Must be called exactly once during early boot.
pub unsafe fn init_cpu() {
    // SAFETY: Boot is single-threaded; the record is in a static.
    unsafe { (*cpu_ptr()).descriptors.init_load() };
}

/// The currently running process, if any.
#[must_use]
pub fn current() -> Option<ProcRef> {
    // SAFETY: Plain read of per-CPU data on a single CPU.
    unsafe { (*cpu_ptr()).current }
}

/// `true` while a process (rather than the scheduler) owns the CPU.
#[must_use]
pub fn has_current() -> bool {
    current().is_some()
}

/// Runs `f` on the current process record.
///
/// A `Running` process's record is written only by its own kernel thread
/// (the scheduler and `awaken` touch other states), so this access does
/// not take the table lock.
pub(crate) fn with_current<R>(f: impl FnOnce(&mut Process) -> R) -> R {
    let pref = current().expect("with_current: no current process");
    // SAFETY: See doc comment; the borrow ends when `f` returns.
    let inner = unsafe { PROC_TABLE.inner() };
    f(inner.get(pref).expect("with_current: stale current process"))
}

/// Size of the trap frame block at the top of each kernel stack.
const TRAP_FRAME_SIZE: usize = size_of::<TrapFrame>();
/// Size of the callee-save context block.
const CONTEXT_SIZE: usize = size_of::<Context>();

/// Virtual address of the trap frame on every kernel stack.
#[must_use]
pub const fn trap_frame_va() -> u64 {
    layout::KERNEL_STACK_TOP - TRAP_FRAME_SIZE as u64
}

/// Virtual address of the saved return-address slot (points at the
/// trap-return epilogue).
const fn ret_slot_va() -> u64 {
    trap_frame_va() - 8
}

/// Virtual address of the initial context block.
const fn context_va() -> u64 {
    ret_slot_va() - CONTEXT_SIZE as u64
}

/// Resolves a kernel-stack virtual address in `space` to a direct-map
/// pointer, so the stack can be seeded while some other page table is
/// active.
pub(crate) fn kstack_ptr<T>(space: &paging::AddressSpace, va: u64) -> *mut T {
    let (phys, _) = space
        .translate(VirtAddr::new_truncate(va))
        .expect("kernel stack not mapped");
    hhdm::phys_to_virt(phys).as_mut_ptr::<T>()
}

/// Allocates a process: a fresh slot in `Embryo` state with a new
/// address space, a mapped kernel stack, and the stack seeded so the
/// first activation runs `fork_ret` and falls into the trap-return
/// epilogue.
///
/// Returns `None` when the table is full.
pub fn alloc_process(name: &str) -> Option<ProcRef> {
    PROC_TABLE.lock.acquire();
    let pref = {
        // SAFETY: The table lock is held.
        let inner = unsafe { PROC_TABLE.inner() };
        let Some(index) = inner
            .slots
            .iter()
            .position(|slot| slot.proc.state == ProcState::Unused)
        else {
            PROC_TABLE.lock.release();
            return None;
        };
        let pid = inner.next_pid;
        inner.next_pid += 1;
        let slot = &mut inner.slots[index];
        slot.generation += 1;
        slot.proc.state = ProcState::Embryo;
        slot.proc.pid = pid;
        ProcRef {
            index,
            generation: slot.generation,
        }
    };
    PROC_TABLE.lock.release();

    // The expensive part runs without the lock: an embryo is visible
    // only to its creator.
    let space = paging::AddressSpace::new_user();
    paging::map_kernel_stack(&space);

    // Seed the stack top: trap frame, then the trap-return address, then
    // the context whose saved rip enters fork_ret.
    // SAFETY: The kernel stack pages were just mapped and are exclusive
    // to this embryo.
    unsafe {
        let tf = kstack_ptr::<TrapFrame>(&space, trap_frame_va());
        core::ptr::write_bytes(tf.cast::<u8>(), 0, TRAP_FRAME_SIZE);
        let ret = kstack_ptr::<u64>(&space, ret_slot_va());
        *ret = trap::trap_return as usize as u64;
        let ctx = kstack_ptr::<Context>(&space, context_va());
        *ctx = Context::zeroed();
        (*ctx).rip = sched::fork_ret_addr();
    }

    PROC_TABLE.lock.acquire();
    {
        // SAFETY: The table lock is held.
        let inner = unsafe { PROC_TABLE.inner() };
        let p = inner.get(pref).expect("alloc_process: embryo vanished");
        p.pml4 = space.pml4();
        p.trap_frame = trap_frame_va() as *mut TrapFrame;
        p.context = context_va() as *mut Context;
        p.parent = None;
        p.exit_status = 0;
        p.wait_channel = 0;
        p.files = [None; NOFILE];
        p.cwd = PathBuf::root();
        p.set_name(name);
    }
    PROC_TABLE.lock.release();
    Some(pref)
}

/// Terminates the current process: records the status, wakes the parent
/// on the channel of its process record, becomes a zombie, and hands the
/// CPU back to the scheduler for good.
pub fn exit(status: u64) -> ! {
    let pref = current().expect("exit: no current process");
    PROC_TABLE.lock.acquire();
    {
        // SAFETY: The table lock is held.
        let inner = unsafe { PROC_TABLE.inner() };
        let parent = inner.get(pref).expect("exit: stale current").parent;
        if let Some(parent) = parent {
            let channel = inner.channel_of(parent.index);
            sched::wake_locked(inner, channel);
        }
        let p = inner.get(pref).expect("exit: stale current");
        p.exit_status = status;
        p.state = ProcState::Zombie;
    }
    sched::switch_to_scheduler();
    panic!("exit: zombie was scheduled again");
}

/// Waits for a child to exit.
///
/// Reaps one zombie child (returning its PID and freeing the slot), or
/// blocks on this process's own record address until a child exits.
/// Returns `None` when no children exist.
pub fn wait() -> Option<u64> {
    let pref = current().expect("wait: no current process");
    PROC_TABLE.lock.acquire();
    loop {
        let mut have_children = false;
        let mut reaped = None;
        {
            // SAFETY: The table lock is held.
            let inner = unsafe { PROC_TABLE.inner() };
            for index in 0..NPROC {
                let slot = &mut inner.slots[index];
                if slot.proc.state == ProcState::Unused || slot.proc.parent != Some(pref) {
                    continue;
                }
                have_children = true;
                if slot.proc.state == ProcState::Zombie {
                    reaped = Some(slot.proc.pid);
                    slot.proc.reset();
                    slot.generation += 1;
                    break;
                }
            }
        }

        if let Some(pid) = reaped {
            PROC_TABLE.lock.release();
            return Some(pid);
        }
        if !have_children {
            PROC_TABLE.lock.release();
            return None;
        }

        // Block on our own record address; exit() wakes it.
        let channel = {
            // SAFETY: The table lock is held.
            unsafe { PROC_TABLE.inner() }.channel_of(pref.index)
        };
        sched::sleep(channel, &PROC_TABLE.lock);
    }
}

/// Creates the first user process from a boot module and marks it
/// runnable.
///
/// # Panics
///
/// Panics if the module cannot be found or is not a loadable ELF — a
/// system without `init` cannot do anything.
pub fn spawn_init(path: &str) {
    let pref = alloc_process("init").expect("spawn_init: process table full");
    {
        // SAFETY: Pre-scheduler boot is single-threaded and the embryo is
        // visible only to us.
        let inner = unsafe { PROC_TABLE.inner() };
        let p = inner.get(pref).expect("spawn_init: embryo vanished");
        let entry_frame = exec::exec(p, path).expect("spawn_init: cannot load init");
        let space = paging::AddressSpace::for_pml4(p.pml4);
        // SAFETY: The embryo's kernel stack is mapped and exclusively ours;
        // its page table is not active, so the write goes through the
        // direct map.
        unsafe { *kstack_ptr::<TrapFrame>(&space, trap_frame_va()) = entry_frame };
    }
    PROC_TABLE.lock.acquire();
    {
        // SAFETY: The table lock is held.
        let inner = unsafe { PROC_TABLE.inner() };
        inner.get(pref).expect("spawn_init: embryo vanished").state = ProcState::Runnable;
    }
    PROC_TABLE.lock.release();
    crate::kinfo!("proc: init spawned from {path}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_table() -> TableInner {
        TableInner {
            slots: [const {
                ProcSlot {
                    generation: 0,
                    proc: Process::unused(),
                }
            }; NPROC],
            next_pid: 1,
        }
    }

    #[test]
    fn stale_reference_fails_generation_check() {
        let mut table = fresh_table();
        table.slots[3].generation = 1;
        table.slots[3].proc.state = ProcState::Runnable;
        let live = ProcRef {
            index: 3,
            generation: 1,
        };
        assert!(table.get(live).is_some());

        // Reuse the slot: the old reference must die.
        table.slots[3].generation = 2;
        assert!(table.get(live).is_none());
    }

    #[test]
    fn unused_slot_resolves_to_none() {
        let mut table = fresh_table();
        let pref = ProcRef {
            index: 0,
            generation: 0,
        };
        assert!(table.get(pref).is_none());
    }

    #[test]
    fn channel_is_record_address_and_stable() {
        let table = fresh_table();
        let a = table.channel_of(1);
        let b = table.channel_of(2);
        assert_ne!(a, 0);
        assert_ne!(a, b);
        assert_eq!(a, table.channel_of(1));
    }

    #[test]
    fn wake_promotes_only_matching_sleepers() {
        let mut table = fresh_table();
        for (index, channel) in [(0, 0xA000u64), (1, 0xB000), (2, 0xA000)] {
            table.slots[index].proc.state = ProcState::Sleeping;
            table.slots[index].proc.wait_channel = channel;
        }
        table.slots[3].proc.state = ProcState::Runnable;

        sched::wake_locked(&mut table, 0xA000);
        assert_eq!(table.slots[0].proc.state, ProcState::Runnable);
        assert_eq!(table.slots[1].proc.state, ProcState::Sleeping);
        assert_eq!(table.slots[2].proc.state, ProcState::Runnable);
        assert_eq!(table.slots[3].proc.state, ProcState::Runnable);
    }

    #[test]
    fn name_is_nul_padded_and_truncated() {
        let mut p = Process::unused();
        p.set_name("sh");
        assert_eq!(p.name(), "sh");
        p.set_name("a-very-long-process-name");
        assert_eq!(p.name().len(), NAME_LEN - 1);
    }

    #[test]
    fn fd_allocation_fills_lowest_slot_first() {
        let mut p = Process::unused();
        assert_eq!(p.alloc_fd(FileHandle::Tty), Some(0));
        assert_eq!(p.alloc_fd(FileHandle::Tty), Some(1));
        p.files[0] = None;
        assert_eq!(p.alloc_fd(FileHandle::Tty), Some(0));
    }

    #[test]
    fn fd_table_is_bounded() {
        let mut p = Process::unused();
        for expected in 0..NOFILE {
            assert_eq!(p.alloc_fd(FileHandle::Tty), Some(expected));
        }
        assert_eq!(p.alloc_fd(FileHandle::Tty), None);
    }

    #[test]
    fn kernel_stack_scaffold_layout() {
        // Top-down: trap frame, return slot, context — all inside the
        // top stack page.
        assert_eq!(trap_frame_va() + TRAP_FRAME_SIZE as u64, layout::KERNEL_STACK_TOP);
        assert_eq!(ret_slot_va() + 8, trap_frame_va());
        assert_eq!(context_va() + CONTEXT_SIZE as u64, ret_slot_va());
        assert!(context_va() >= layout::KERNEL_STACK_TOP - crate::mm::PAGE_SIZE as u64);
        // The context block lands 16-byte aligned minus the pushed words.
        assert_eq!(trap_frame_va() % 16, 0);
    }

    #[test]
    fn reset_returns_slot_to_unused() {
        let mut p = Process::unused();
        p.state = ProcState::Zombie;
        p.pid = 42;
        p.exit_status = 7;
        p.reset();
        assert_eq!(p.state, ProcState::Unused);
        assert_eq!(p.pid, 0);
        assert_eq!(p.wait_channel, 0);
    }
}
