//! Minimal ELF64 executable parser for the Tsukuyomi kernel.
//!
//! Parses ELF64 file headers and `PT_LOAD` program headers from raw byte
//! slices using safe field extraction (`from_le_bytes`). No unsafe code,
//! no allocations.
//!
//! # Usage
//!
//! ```
//! use tsukuyomi_elf::ElfFile;
//!
//! fn load(data: &[u8]) {
//!     let elf = match ElfFile::parse(data) {
//!         Ok(elf) => elf,
//!         Err(_) => return,
//!     };
//!     let _entry = elf.entry_point();
//!     for seg in elf.load_segments() {
//!         // Map seg.data at seg.vaddr, zero-fill up to seg.memsz.
//!     }
//! }
//! ```

#![no_std]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod header;
pub mod segment;

pub use header::{Elf64Header, Elf64ProgramHeader, ElfError};
pub use segment::{ElfFile, LoadSegment};
