//! ELF64 segment (program header) iteration.
//!
//! Provides [`ElfFile`] as the main entry point for parsing an ELF64 binary,
//! and [`LoadSegment`] for iterating over `PT_LOAD` segments.

use crate::header::{ELF64_PHDR_SIZE, Elf64Header, Elf64ProgramHeader, ElfError, PT_LOAD};

/// A parsed ELF64 file, holding a reference to the raw data and the parsed header.
#[derive(Debug, Clone, Copy)]
pub struct ElfFile<'a> {
    data: &'a [u8],
    header: Elf64Header,
}

/// A loadable segment extracted from an ELF64 file.
#[derive(Debug)]
pub struct LoadSegment<'a> {
    /// Virtual address where this segment should be mapped.
    pub vaddr: u64,
    /// File content of this segment (may be shorter than `memsz`; the
    /// remainder is zero-filled by the loader).
    pub data: &'a [u8],
    /// Total size of the segment in memory.
    pub memsz: u64,
    /// Segment permission flags (`PF_R = 4`, `PF_W = 2`, `PF_X = 1`).
    pub flags: u32,
}

impl<'a> ElfFile<'a> {
    /// Parse an ELF64 executable from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError`] if the header is invalid or the data is too short.
    pub fn parse(data: &'a [u8]) -> Result<Self, ElfError> {
        let header = Elf64Header::parse(data)?;
        Ok(Self { data, header })
    }

    /// Returns the virtual address of the entry point.
    #[must_use]
    pub fn entry_point(&self) -> u64 {
        self.header.e_entry
    }

    /// Returns the parsed ELF64 file header.
    #[must_use]
    pub fn header(&self) -> &Elf64Header {
        &self.header
    }

    /// Returns an iterator over `PT_LOAD` segments.
    ///
    /// Each yielded [`LoadSegment`] contains a slice into the original data
    /// for the file-backed portion and the total memory size (which may be
    /// larger if the segment has a `.bss`-like zero-fill tail).
    pub fn load_segments(&self) -> impl Iterator<Item = LoadSegment<'a>> {
        let data = self.data;
        let phoff = self.header.e_phoff as usize;
        let phentsize = self.header.e_phentsize as usize;
        let phnum = self.header.e_phnum as usize;

        (0..phnum).filter_map(move |i| {
            let offset = phoff + i * phentsize;
            if offset + ELF64_PHDR_SIZE > data.len() {
                return None;
            }

            let phdr = Elf64ProgramHeader::parse(data, offset);
            if phdr.seg_type != PT_LOAD {
                return None;
            }

            let file_offset = phdr.offset as usize;
            let file_size = phdr.filesz as usize;

            let seg_data = if file_size == 0 {
                &[] as &[u8]
            } else if file_offset.checked_add(file_size).is_some_and(|end| end <= data.len()) {
                &data[file_offset..file_offset + file_size]
            } else {
                // Truncated segment: expose what is actually in the file.
                &data[file_offset.min(data.len())..]
            };

            Some(LoadSegment {
                vaddr: phdr.vaddr,
                data: seg_data,
                memsz: phdr.memsz,
                flags: phdr.flags,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds an ELF with one PT_LOAD segment carrying `payload` at `vaddr`
    /// with the given `memsz`.
    fn one_segment_elf(vaddr: u64, payload: &[u8], memsz: u64) -> [u8; 256] {
        let mut image = [0u8; 256];
        // File header.
        image[0..4].copy_from_slice(&[0x7f, b'E', b'L', b'F']);
        image[4] = 2; // ELFCLASS64
        image[5] = 1; // little-endian
        image[16..18].copy_from_slice(&2u16.to_le_bytes()); // ET_EXEC
        image[18..20].copy_from_slice(&62u16.to_le_bytes()); // EM_X86_64
        image[24..32].copy_from_slice(&vaddr.to_le_bytes()); // e_entry
        image[32..40].copy_from_slice(&64u64.to_le_bytes()); // e_phoff
        image[54..56].copy_from_slice(&56u16.to_le_bytes()); // e_phentsize
        image[56..58].copy_from_slice(&1u16.to_le_bytes()); // e_phnum
        // Program header at offset 64.
        image[64..68].copy_from_slice(&1u32.to_le_bytes()); // PT_LOAD
        image[68..72].copy_from_slice(&5u32.to_le_bytes()); // PF_R | PF_X
        image[72..80].copy_from_slice(&128u64.to_le_bytes()); // p_offset
        image[80..88].copy_from_slice(&vaddr.to_le_bytes()); // p_vaddr
        image[96..104].copy_from_slice(&(payload.len() as u64).to_le_bytes()); // p_filesz
        image[104..112].copy_from_slice(&memsz.to_le_bytes()); // p_memsz
        // Segment payload at offset 128.
        image[128..128 + payload.len()].copy_from_slice(payload);
        image
    }

    #[test]
    fn iterates_load_segment() {
        let image = one_segment_elf(0x40_0000, b"\x90\x90\xc3", 0x1000);
        let elf = ElfFile::parse(&image).unwrap();
        assert_eq!(elf.entry_point(), 0x40_0000);

        let mut count = 0;
        for seg in elf.load_segments() {
            assert_eq!(seg.vaddr, 0x40_0000);
            assert_eq!(seg.data, b"\x90\x90\xc3");
            assert_eq!(seg.memsz, 0x1000);
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[test]
    fn skips_non_load_segments() {
        let mut image = one_segment_elf(0x40_0000, b"abc", 0x10);
        image[64..68].copy_from_slice(&4u32.to_le_bytes()); // PT_NOTE
        let elf = ElfFile::parse(&image).unwrap();
        assert_eq!(elf.load_segments().count(), 0);
    }
}
