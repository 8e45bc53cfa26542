//! Synchronization primitives.

mod spinlock;

pub use spinlock::{
    SpinLock, SpinMutex, SpinMutexGuard, interrupt_disable_depth, pop_interrupt_disable,
    push_interrupt_disable, restore_interrupt_state, saved_interrupt_state,
};
