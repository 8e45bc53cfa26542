//! The Tsukuyomi kernel.
//!
//! A small monolithic kernel for 64-bit x86 PCs booted via a Limine-style
//! loader. This crate holds the process and memory core — physical frame
//! allocator, per-process 4-level paging, the process table with its
//! round-robin scheduler, trap dispatch, and the system-call surface —
//! together with the drivers and filesystems those subsystems talk to.
//!
//! The boot stub (`kernel/boot/limine`) normalizes the bootloader handoff
//! into a [`boot::BootInfo`] and calls [`boot::kernel_init`], which never
//! returns: it becomes the scheduler loop.

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod arch;
pub mod boot;
pub mod drivers;
pub mod fs;
pub mod log;
pub mod mm;
pub mod proc;
pub mod syscall;
pub mod tty;

pub use tsukuyomi_core::addr;
pub use tsukuyomi_core::{kdebug, kerr, kfatal, kinfo, klog, kprint, kprintln, ktrace, kwarn};
