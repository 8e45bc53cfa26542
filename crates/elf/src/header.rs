//! ELF64 header parsing.
//!
//! Parses the ELF64 file header and program headers from raw byte slices
//! using safe field extraction via `from_le_bytes()`.

use core::fmt;

/// ELF magic bytes: `\x7fELF`.
const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// ELF class: 64-bit.
const ELFCLASS64: u8 = 2;

/// ELF data encoding: little-endian.
const ELFDATA2LSB: u8 = 1;

/// ELF type: executable.
const ET_EXEC: u16 = 2;

/// ELF machine: x86-64.
const EM_X86_64: u16 = 62;

/// Program header type: loadable segment.
pub(crate) const PT_LOAD: u32 = 1;

/// Size of an ELF64 file header (64 bytes).
const ELF64_EHDR_SIZE: usize = 64;

/// Size of an ELF64 program header entry (56 bytes).
pub(crate) const ELF64_PHDR_SIZE: usize = 56;

/// Read a little-endian `u16` from `data` at byte offset `off`.
///
/// # Panics
///
/// Panics if `off + 2 > data.len()`. Callers must bounds-check first.
pub(crate) fn le_u16(data: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([data[off], data[off + 1]])
}

/// Read a little-endian `u32` from `data` at byte offset `off`.
pub(crate) fn le_u32(data: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([data[off], data[off + 1], data[off + 2], data[off + 3]])
}

/// Read a little-endian `u64` from `data` at byte offset `off`.
pub(crate) fn le_u64(data: &[u8], off: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[off..off + 8]);
    u64::from_le_bytes(bytes)
}

/// Errors that can occur when parsing an ELF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfError {
    /// The file does not start with the ELF magic bytes.
    BadMagic,
    /// The ELF file is not 64-bit (`ELFCLASS64`).
    UnsupportedClass,
    /// The ELF file is not little-endian.
    UnsupportedEncoding,
    /// The ELF machine type is not `EM_X86_64`.
    UnsupportedMachine,
    /// The ELF type is not `ET_EXEC`.
    UnsupportedType,
    /// The input data is too short for the declared structure.
    Truncated,
    /// A header offset or size is out of bounds.
    InvalidOffset,
}

impl fmt::Display for ElfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic => write!(f, "invalid ELF magic bytes"),
            Self::UnsupportedClass => write!(f, "unsupported ELF class (expected ELFCLASS64)"),
            Self::UnsupportedEncoding => {
                write!(f, "unsupported data encoding (expected little-endian)")
            }
            Self::UnsupportedMachine => write!(f, "unsupported machine type (expected EM_X86_64)"),
            Self::UnsupportedType => write!(f, "unsupported ELF type (expected ET_EXEC)"),
            Self::Truncated => write!(f, "input data truncated"),
            Self::InvalidOffset => write!(f, "invalid header offset or size"),
        }
    }
}

/// Parsed ELF64 file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf64Header {
    /// ELF type (`ET_EXEC`).
    pub e_type: u16,
    /// Target machine architecture.
    pub e_machine: u16,
    /// Virtual address of the entry point.
    pub e_entry: u64,
    /// Offset of the program header table in the file.
    pub e_phoff: u64,
    /// Size of each program header entry.
    pub e_phentsize: u16,
    /// Number of program header entries.
    pub e_phnum: u16,
}

impl Elf64Header {
    /// Parse an ELF64 file header from raw bytes.
    ///
    /// Validates the magic, class, encoding, machine, and type, and checks
    /// that the program header table lies within `data`.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError`] describing the first validation failure.
    pub fn parse(data: &[u8]) -> Result<Self, ElfError> {
        if data.len() < ELF64_EHDR_SIZE {
            return Err(ElfError::Truncated);
        }
        if data[0..4] != ELF_MAGIC {
            return Err(ElfError::BadMagic);
        }
        if data[4] != ELFCLASS64 {
            return Err(ElfError::UnsupportedClass);
        }
        if data[5] != ELFDATA2LSB {
            return Err(ElfError::UnsupportedEncoding);
        }

        let e_type = le_u16(data, 16);
        let e_machine = le_u16(data, 18);
        if e_machine != EM_X86_64 {
            return Err(ElfError::UnsupportedMachine);
        }
        if e_type != ET_EXEC {
            return Err(ElfError::UnsupportedType);
        }

        let header = Self {
            e_type,
            e_machine,
            e_entry: le_u64(data, 24),
            e_phoff: le_u64(data, 32),
            e_phentsize: le_u16(data, 54),
            e_phnum: le_u16(data, 56),
        };

        // The whole program header table must fit in the file.
        let table_size = (header.e_phnum as u64)
            .checked_mul(header.e_phentsize as u64)
            .ok_or(ElfError::InvalidOffset)?;
        let table_end = header
            .e_phoff
            .checked_add(table_size)
            .ok_or(ElfError::InvalidOffset)?;
        if header.e_phentsize as usize != ELF64_PHDR_SIZE && header.e_phnum != 0 {
            return Err(ElfError::InvalidOffset);
        }
        if table_end > data.len() as u64 {
            return Err(ElfError::Truncated);
        }

        Ok(header)
    }
}

/// Parsed ELF64 program header entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf64ProgramHeader {
    /// Segment type (`PT_LOAD`, `PT_NOTE`, ...).
    pub seg_type: u32,
    /// Segment permission flags (`PF_R = 4`, `PF_W = 2`, `PF_X = 1`).
    pub flags: u32,
    /// Offset of the segment contents in the file.
    pub offset: u64,
    /// Virtual address at which the segment should be mapped.
    pub vaddr: u64,
    /// Number of bytes stored in the file.
    pub filesz: u64,
    /// Total size of the segment in memory (`>= filesz`).
    pub memsz: u64,
}

impl Elf64ProgramHeader {
    /// Parse a program header entry at byte offset `off`.
    ///
    /// The caller must have verified that `off + 56 <= data.len()`.
    pub(crate) fn parse(data: &[u8], off: usize) -> Self {
        Self {
            seg_type: le_u32(data, off),
            flags: le_u32(data, off + 4),
            offset: le_u64(data, off + 8),
            vaddr: le_u64(data, off + 16),
            filesz: le_u64(data, off + 32),
            memsz: le_u64(data, off + 40),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_header() -> [u8; 64] {
        let mut h = [0u8; 64];
        h[0..4].copy_from_slice(&ELF_MAGIC);
        h[4] = ELFCLASS64;
        h[5] = ELFDATA2LSB;
        h[16..18].copy_from_slice(&ET_EXEC.to_le_bytes());
        h[18..20].copy_from_slice(&EM_X86_64.to_le_bytes());
        h[24..32].copy_from_slice(&0x40_1000u64.to_le_bytes()); // e_entry
        h[54..56].copy_from_slice(&(ELF64_PHDR_SIZE as u16).to_le_bytes());
        h
    }

    #[test]
    fn parses_minimal_executable() {
        let h = minimal_header();
        let header = Elf64Header::parse(&h).unwrap();
        assert_eq!(header.e_entry, 0x40_1000);
        assert_eq!(header.e_phnum, 0);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut h = minimal_header();
        h[0] = 0x7e;
        assert_eq!(Elf64Header::parse(&h), Err(ElfError::BadMagic));
    }

    #[test]
    fn rejects_32bit_class() {
        let mut h = minimal_header();
        h[4] = 1;
        assert_eq!(Elf64Header::parse(&h), Err(ElfError::UnsupportedClass));
    }

    #[test]
    fn rejects_relocatable() {
        let mut h = minimal_header();
        h[16..18].copy_from_slice(&1u16.to_le_bytes()); // ET_REL
        assert_eq!(Elf64Header::parse(&h), Err(ElfError::UnsupportedType));
    }

    #[test]
    fn rejects_truncated() {
        let h = minimal_header();
        assert_eq!(Elf64Header::parse(&h[..32]), Err(ElfError::Truncated));
    }

    #[test]
    fn rejects_phdr_table_out_of_bounds() {
        let mut h = minimal_header();
        h[32..40].copy_from_slice(&64u64.to_le_bytes()); // e_phoff
        h[56..58].copy_from_slice(&4u16.to_le_bytes()); // e_phnum, table past EOF
        assert_eq!(Elf64Header::parse(&h), Err(ElfError::Truncated));
    }
}
