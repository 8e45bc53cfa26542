//! Rust bindings for the Limine boot protocol.
//!
//! The Limine protocol works through a request-response mechanism:
//!
//! 1. The kernel declares static request structures in a special `.requests`
//!    linker section.
//! 2. The bootloader finds them by their magic IDs and fills in the response
//!    pointers before passing control to the kernel.
//! 3. The kernel queries the responses to learn about the machine.
//!
//! This crate covers the subset of the protocol the Tsukuyomi kernel
//! consumes: base revision, the higher-half direct map offset, the memory
//! map, the ACPI RSDP address, the pre-loaded module list, and the
//! framebuffer list.
//!
//! # Example
//!
//! ```no_run
//! use limine::{BaseRevision, HhdmRequest};
//!
//! #[used]
//! #[unsafe(link_section = ".requests")]
//! static BASE_REVISION: BaseRevision = BaseRevision::new();
//!
//! #[used]
//! #[unsafe(link_section = ".requests")]
//! static HHDM_REQUEST: HhdmRequest = HhdmRequest::new();
//!
//! fn kernel_entry() {
//!     assert!(BASE_REVISION.is_supported());
//!     let offset = HHDM_REQUEST.response().unwrap().offset;
//!     let _ = offset;
//! }
//! ```

#![no_std]
#![warn(missing_docs)]

mod request;
mod response;

pub mod file;
pub mod framebuffer;
pub mod memmap;

pub use request::*;
pub use response::*;
