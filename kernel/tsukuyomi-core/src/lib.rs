//! Tsukuyomi base library.
//!
//! Hardware-facing primitives shared by the kernel and the boot stub:
//! typed addresses, IRQ-aware spin locks, the logging front end, and the
//! x86_64 descriptor-table and page-table structures together with thin
//! instruction wrappers.
//!
//! Everything here compiles for the host as well (inline assembly that
//! would actually execute is gated on `target_os = "none"`), so the pure
//! logic is exercised by ordinary `cargo test`.

#![no_std]
#![warn(missing_docs)]

pub mod addr;
pub mod arch;
pub mod log;
pub mod sync;
