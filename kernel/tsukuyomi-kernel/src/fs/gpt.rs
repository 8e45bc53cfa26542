//! GPT partition table discovery.
//!
//! Reads the GPT header at LBA 1, verifies its signature, and walks the
//! partition entry array for the first used entry. Only the fields the
//! kernel needs are decoded; CRCs are not checked.

use crate::drivers::ata::{BlockRead, SECTOR_SIZE};
use crate::fs::FsError;

/// Byte offset of the partition-entry-array LBA in the header.
const ENTRIES_LBA_OFFSET: usize = 72;
/// Byte offset of the entry count in the header.
const ENTRY_COUNT_OFFSET: usize = 80;
/// Byte offset of the per-entry size in the header.
const ENTRY_SIZE_OFFSET: usize = 84;

/// Byte offset of the first LBA inside a partition entry.
const PART_FIRST_LBA_OFFSET: usize = 32;
/// Byte offset of the last LBA inside a partition entry.
const PART_LAST_LBA_OFFSET: usize = 40;

/// A GPT header block as read from LBA 1.
#[derive(Debug, Clone, Copy)]
pub struct GptHeader {
    block: [u8; SECTOR_SIZE],
}

impl GptHeader {
    /// Expected signature at the start of the header.
    pub const SIGNATURE: &'static [u8; 8] = b"EFI PART";

    /// Wraps a raw 512-byte header block.
    #[must_use]
    pub fn new(block: [u8; SECTOR_SIZE]) -> Self {
        Self { block }
    }

    /// Returns `true` iff the block carries the `EFI PART` signature.
    #[must_use]
    pub fn verify(&self) -> bool {
        &self.block[..8] == Self::SIGNATURE
    }

    fn le_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.block[offset],
            self.block[offset + 1],
            self.block[offset + 2],
            self.block[offset + 3],
        ])
    }

    fn le_u64(&self, offset: usize) -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.block[offset..offset + 8]);
        u64::from_le_bytes(bytes)
    }

    /// LBA of the partition entry array.
    #[must_use]
    pub fn entries_lba(&self) -> u64 {
        self.le_u64(ENTRIES_LBA_OFFSET)
    }

    /// Number of partition entries.
    #[must_use]
    pub fn entry_count(&self) -> u32 {
        self.le_u32(ENTRY_COUNT_OFFSET)
    }

    /// Size of one partition entry in bytes.
    #[must_use]
    pub fn entry_size(&self) -> u32 {
        self.le_u32(ENTRY_SIZE_OFFSET)
    }
}

/// A used partition: its LBA range on the disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    /// First LBA of the partition.
    pub first_lba: u64,
    /// Last LBA of the partition (inclusive).
    pub last_lba: u64,
}

/// Reads the GPT and returns the first used partition, or `None` if the
/// disk has no GPT or only empty entries.
pub fn first_partition(dev: &mut dyn BlockRead) -> Result<Option<Partition>, FsError> {
    let mut block = [0u8; SECTOR_SIZE];
    dev.read_sector(1, &mut block).map_err(|_| FsError::Io)?;
    let header = GptHeader::new(block);
    if !header.verify() {
        return Ok(None);
    }

    let entry_size = header.entry_size() as usize;
    if entry_size == 0 || entry_size > SECTOR_SIZE {
        return Err(FsError::Corrupt);
    }
    let entries_per_sector = SECTOR_SIZE / entry_size;

    let mut sector = [0u8; SECTOR_SIZE];
    for i in 0..header.entry_count() as usize {
        let lba = header.entries_lba() + (i / entries_per_sector) as u64;
        if i % entries_per_sector == 0 {
            dev.read_sector(lba, &mut sector).map_err(|_| FsError::Io)?;
        }
        let entry = &sector[(i % entries_per_sector) * entry_size..][..entry_size];

        // A zero type GUID marks an unused entry.
        if entry[..16].iter().all(|&b| b == 0) {
            continue;
        }

        let mut first = [0u8; 8];
        first.copy_from_slice(&entry[PART_FIRST_LBA_OFFSET..PART_FIRST_LBA_OFFSET + 8]);
        let mut last = [0u8; 8];
        last.copy_from_slice(&entry[PART_LAST_LBA_OFFSET..PART_LAST_LBA_OFFSET + 8]);
        return Ok(Some(Partition {
            first_lba: u64::from_le_bytes(first),
            last_lba: u64::from_le_bytes(last),
        }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ata::tests_support::MemDisk;

    #[test]
    fn verify_accepts_efi_part_signature() {
        let mut block = [0u8; SECTOR_SIZE];
        block[..8].copy_from_slice(b"EFI PART");
        assert!(GptHeader::new(block).verify());
    }

    #[test]
    fn verify_rejects_other_signatures() {
        let mut block = [0u8; SECTOR_SIZE];
        block[..8].copy_from_slice(b"EFI NOPE");
        assert!(!GptHeader::new(block).verify());
        assert!(!GptHeader::new([0u8; SECTOR_SIZE]).verify());
    }

    #[test]
    fn finds_first_used_partition() {
        // LBA 0: protective MBR (ignored). LBA 1: header. LBA 2: entries.
        let mut disk = MemDisk::new(8);
        let header = disk.sector_mut(1);
        header[..8].copy_from_slice(b"EFI PART");
        header[ENTRIES_LBA_OFFSET..ENTRIES_LBA_OFFSET + 8].copy_from_slice(&2u64.to_le_bytes());
        header[ENTRY_COUNT_OFFSET..ENTRY_COUNT_OFFSET + 4].copy_from_slice(&4u32.to_le_bytes());
        header[ENTRY_SIZE_OFFSET..ENTRY_SIZE_OFFSET + 4].copy_from_slice(&128u32.to_le_bytes());

        // Entry 0 unused (zero GUID); entry 1 used at LBA 64..=2047.
        let entries = disk.sector_mut(2);
        let e1 = 128;
        entries[e1] = 0xAB; // non-zero type GUID byte
        entries[e1 + PART_FIRST_LBA_OFFSET..e1 + PART_FIRST_LBA_OFFSET + 8]
            .copy_from_slice(&64u64.to_le_bytes());
        entries[e1 + PART_LAST_LBA_OFFSET..e1 + PART_LAST_LBA_OFFSET + 8]
            .copy_from_slice(&2047u64.to_le_bytes());

        let part = first_partition(&mut disk).unwrap().unwrap();
        assert_eq!(
            part,
            Partition {
                first_lba: 64,
                last_lba: 2047
            }
        );
    }

    #[test]
    fn missing_gpt_yields_none() {
        let mut disk = MemDisk::new(4);
        assert_eq!(first_partition(&mut disk).unwrap(), None);
    }
}
