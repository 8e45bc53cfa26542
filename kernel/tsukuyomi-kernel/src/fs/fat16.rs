//! Read-only FAT16 driver.
//!
//! Mounts a FAT16 volume from a block device at a partition offset, walks
//! 8.3 directory entries, and reads files by following the FAT cluster
//! chain. Long file names are skipped; write support does not exist.

use crate::drivers::ata::{BlockRead, SECTOR_SIZE};
use crate::fs::{FsError, path};

/// Attribute bit marking a directory entry.
pub const ATTR_DIRECTORY: u8 = 0x10;
/// Attribute value marking a long-file-name fragment.
pub const ATTR_LFN: u8 = 0x0F;

/// Size of one on-disk directory entry.
const DIR_ENTRY_SIZE: usize = 32;

/// FAT16 end-of-chain threshold.
const END_OF_CHAIN: u16 = 0xFFF8;

/// A decoded 8.3 directory entry.
#[derive(Debug, Clone, Copy)]
pub struct RawDirEntry {
    /// Space-padded base name.
    pub filename: [u8; 8],
    /// Space-padded extension.
    pub extension: [u8; 3],
    /// Attribute bits.
    pub attributes: u8,
    /// First cluster of the file or directory.
    pub start_cluster: u16,
    /// File size in bytes (zero for directories).
    pub size: u32,
}

impl RawDirEntry {
    fn parse(raw: &[u8]) -> Self {
        let mut filename = [0u8; 8];
        filename.copy_from_slice(&raw[0..8]);
        let mut extension = [0u8; 3];
        extension.copy_from_slice(&raw[8..11]);
        Self {
            filename,
            extension,
            attributes: raw[11],
            start_cluster: u16::from_le_bytes([raw[26], raw[27]]),
            size: u32::from_le_bytes([raw[28], raw[29], raw[30], raw[31]]),
        }
    }

    /// Returns `true` if this entry is a directory.
    #[must_use]
    pub fn is_directory(&self) -> bool {
        self.attributes & ATTR_DIRECTORY != 0
    }

    /// Matches an 8.3 entry against a conventional `NAME.EXT` string,
    /// case-insensitively. A name without a dot matches entries whose
    /// extension field is all spaces.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        let (stem, ext) = match name.rsplit_once('.') {
            Some((stem, ext)) => (stem, ext),
            None => (name, ""),
        };
        if stem.len() > 8 || ext.len() > 3 {
            return false;
        }
        field_matches(&self.filename, stem) && field_matches(&self.extension, ext)
    }

    /// Writes the display form (`NAME.EXT`, trailing spaces trimmed) into
    /// `out`, returning its length.
    pub fn display_name(&self, out: &mut [u8; 12]) -> usize {
        let stem_len = trimmed_len(&self.filename);
        let ext_len = trimmed_len(&self.extension);
        out[..stem_len].copy_from_slice(&self.filename[..stem_len]);
        if ext_len == 0 {
            return stem_len;
        }
        out[stem_len] = b'.';
        out[stem_len + 1..stem_len + 1 + ext_len].copy_from_slice(&self.extension[..ext_len]);
        stem_len + 1 + ext_len
    }
}

fn trimmed_len(field: &[u8]) -> usize {
    field
        .iter()
        .rposition(|&b| b != b' ')
        .map_or(0, |pos| pos + 1)
}

fn field_matches(field: &[u8], text: &str) -> bool {
    if text.len() > field.len() {
        return false;
    }
    for (i, &b) in field.iter().enumerate() {
        let expected = text.as_bytes().get(i).copied().unwrap_or(b' ');
        if !b.eq_ignore_ascii_case(&expected) {
            return false;
        }
    }
    true
}

/// Where a directory's entries live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirLocation {
    /// The fixed root directory region.
    Root,
    /// A subdirectory stored in a cluster chain.
    Cluster(u16),
}

/// An open FAT16 file.
#[derive(Debug, Clone, Copy)]
pub struct Fat16File {
    /// First cluster of the chain.
    pub start_cluster: u16,
    /// File size in bytes.
    pub size: u32,
    /// Current read offset.
    pub offset: u32,
}

/// An open FAT16 directory.
#[derive(Debug, Clone, Copy)]
pub struct Fat16Dir {
    /// Where the entries live.
    pub location: DirLocation,
    /// Index of the next entry to report from `getdirents`.
    pub next: usize,
}

/// A mounted FAT16 volume.
pub struct Fat16Volume<D> {
    dev: D,
    sectors_per_cluster: u32,
    fat_start: u64,
    root_start: u64,
    root_entries: u16,
    data_start: u64,
}

impl<D: BlockRead> Fat16Volume<D> {
    /// Mounts the volume whose BPB sits at `part_start`.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::Corrupt`] for geometry this driver does not
    /// handle (non-512-byte sectors, zero cluster size).
    pub fn mount(mut dev: D, part_start: u64) -> Result<Self, FsError> {
        let mut bpb = [0u8; SECTOR_SIZE];
        dev.read_sector(part_start, &mut bpb).map_err(|_| FsError::Io)?;

        let bytes_per_sector = u16::from_le_bytes([bpb[11], bpb[12]]);
        let sectors_per_cluster = bpb[13] as u32;
        let reserved = u16::from_le_bytes([bpb[14], bpb[15]]) as u64;
        let num_fats = bpb[16] as u64;
        let root_entries = u16::from_le_bytes([bpb[17], bpb[18]]);
        let fat_size = u16::from_le_bytes([bpb[22], bpb[23]]) as u64;

        if bytes_per_sector as usize != SECTOR_SIZE || sectors_per_cluster == 0 || fat_size == 0 {
            return Err(FsError::Corrupt);
        }

        let fat_start = part_start + reserved;
        let root_start = fat_start + num_fats * fat_size;
        let root_sectors =
            (root_entries as u64 * DIR_ENTRY_SIZE as u64).div_ceil(SECTOR_SIZE as u64);
        Ok(Self {
            dev,
            sectors_per_cluster,
            fat_start,
            root_start,
            root_entries,
            data_start: root_start + root_sectors,
        })
    }

    /// First LBA of a data cluster (clusters are numbered from 2).
    fn cluster_lba(&self, cluster: u16) -> u64 {
        self.data_start + (cluster as u64 - 2) * self.sectors_per_cluster as u64
    }

    /// Reads the FAT entry for `cluster`.
    fn fat_next(&mut self, cluster: u16) -> Result<u16, FsError> {
        let byte = cluster as u64 * 2;
        let lba = self.fat_start + byte / SECTOR_SIZE as u64;
        let offset = (byte % SECTOR_SIZE as u64) as usize;
        let mut sector = [0u8; SECTOR_SIZE];
        self.dev.read_sector(lba, &mut sector).map_err(|_| FsError::Io)?;
        Ok(u16::from_le_bytes([sector[offset], sector[offset + 1]]))
    }

    /// Returns directory entry number `index` of `location`, or `None`
    /// past the end of the directory. Free and LFN entries are returned
    /// raw; callers filter.
    fn dir_entry_at(
        &mut self,
        location: DirLocation,
        index: usize,
    ) -> Result<Option<RawDirEntry>, FsError> {
        let entries_per_sector = SECTOR_SIZE / DIR_ENTRY_SIZE;
        let lba = match location {
            DirLocation::Root => {
                if index >= self.root_entries as usize {
                    return Ok(None);
                }
                self.root_start + (index / entries_per_sector) as u64
            }
            DirLocation::Cluster(start) => {
                let entries_per_cluster =
                    entries_per_sector * self.sectors_per_cluster as usize;
                let mut cluster = start;
                for _ in 0..index / entries_per_cluster {
                    cluster = self.fat_next(cluster)?;
                    if cluster >= END_OF_CHAIN {
                        return Ok(None);
                    }
                }
                let within = index % entries_per_cluster;
                self.cluster_lba(cluster) + (within / entries_per_sector) as u64
            }
        };

        let mut sector = [0u8; SECTOR_SIZE];
        self.dev.read_sector(lba, &mut sector).map_err(|_| FsError::Io)?;
        let offset = (index % entries_per_sector) * DIR_ENTRY_SIZE;
        let entry = RawDirEntry::parse(&sector[offset..offset + DIR_ENTRY_SIZE]);
        if entry.filename[0] == 0x00 {
            return Ok(None); // end-of-directory marker
        }
        Ok(Some(entry))
    }

    /// Finds `name` in the directory at `location`.
    fn find_in_dir(
        &mut self,
        location: DirLocation,
        name: &str,
    ) -> Result<Option<RawDirEntry>, FsError> {
        let mut index = 0;
        while let Some(entry) = self.dir_entry_at(location, index)? {
            index += 1;
            if entry.filename[0] == 0xE5 || entry.attributes == ATTR_LFN {
                continue;
            }
            if entry.matches_name(name) {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Resolves an absolute path to its directory entry, walking
    /// component by component from the root. Returns `None` for the root
    /// itself (it has no entry).
    pub fn lookup(&mut self, abs_path: &str) -> Result<Option<RawDirEntry>, FsError> {
        let mut location = DirLocation::Root;
        let mut found: Option<RawDirEntry> = None;
        for component in path::components(abs_path) {
            if let Some(prev) = found {
                if !prev.is_directory() {
                    return Ok(None); // a file cannot have children
                }
                location = DirLocation::Cluster(prev.start_cluster);
            }
            match self.find_in_dir(location, component)? {
                Some(entry) => found = Some(entry),
                None => return Ok(None),
            }
        }
        Ok(found)
    }

    /// Reads from an open file at its current offset.
    pub fn read_file(&mut self, file: &mut Fat16File, buf: &mut [u8]) -> Result<usize, FsError> {
        let cluster_bytes = self.sectors_per_cluster as usize * SECTOR_SIZE;
        let remaining = (file.size.saturating_sub(file.offset)) as usize;
        let mut to_read = buf.len().min(remaining);
        let mut done = 0;

        // Walk the chain up to the cluster containing the offset.
        let mut cluster = file.start_cluster;
        for _ in 0..file.offset as usize / cluster_bytes {
            cluster = self.fat_next(cluster)?;
            if cluster >= END_OF_CHAIN {
                return Ok(0);
            }
        }
        let mut within = file.offset as usize % cluster_bytes;

        let mut sector = [0u8; SECTOR_SIZE];
        while to_read > 0 {
            let lba = self.cluster_lba(cluster) + (within / SECTOR_SIZE) as u64;
            self.dev.read_sector(lba, &mut sector).map_err(|_| FsError::Io)?;
            let sector_offset = within % SECTOR_SIZE;
            let chunk = to_read.min(SECTOR_SIZE - sector_offset);
            buf[done..done + chunk].copy_from_slice(&sector[sector_offset..sector_offset + chunk]);
            done += chunk;
            to_read -= chunk;
            within += chunk;
            if within == cluster_bytes && to_read > 0 {
                within = 0;
                cluster = self.fat_next(cluster)?;
                if cluster >= END_OF_CHAIN {
                    break;
                }
            }
        }

        file.offset += done as u32;
        Ok(done)
    }

    /// Enumerates directory entries into fixed records, starting at entry
    /// index `dir.next`. Returns the number of records written.
    pub fn getdirents(&mut self, dir: &mut Fat16Dir, buf: &mut [u8]) -> Result<usize, FsError> {
        let mut written = 0;
        while (written + 1) * crate::fs::DIRENT_SIZE <= buf.len() {
            let Some(entry) = self.dir_entry_at(dir.location, dir.next)? else {
                break;
            };
            dir.next += 1;
            if entry.filename[0] == 0xE5 || entry.attributes == ATTR_LFN {
                continue;
            }
            let mut name = [0u8; 12];
            let len = entry.display_name(&mut name);
            crate::fs::write_dirent(&mut buf[written * crate::fs::DIRENT_SIZE..], &name[..len]);
            written += 1;
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ata::tests_support::MemDisk;

    fn entry(filename: &[u8; 8], extension: &[u8; 3]) -> RawDirEntry {
        RawDirEntry {
            filename: *filename,
            extension: *extension,
            attributes: 0,
            start_cluster: 0,
            size: 0,
        }
    }

    #[test]
    fn matches_padded_name_and_extension() {
        let e = entry(b"BOOTX64 ", b"EFI");
        assert!(e.matches_name("BOOTX64.EFI"));
        assert!(e.matches_name("bootx64.efi"));
        assert!(!e.matches_name("BOOTX64"));
    }

    #[test]
    fn matches_extensionless_name() {
        let e = entry(b"ADIRNAME", b"   ");
        assert!(e.matches_name("ADIRNAME"));
        assert!(!e.matches_name("ADIRNAME.X"));
        assert!(!e.matches_name("ADIRNAM"));
    }

    #[test]
    fn rejects_overlong_components() {
        let e = entry(b"ABCDEFGH", b"IJK");
        assert!(!e.matches_name("ABCDEFGHI.IJK"));
        assert!(!e.matches_name("ABCDEFGH.IJKL"));
    }

    #[test]
    fn display_name_trims_padding() {
        let mut out = [0u8; 12];
        let e = entry(b"HELLO   ", b"TXT");
        let n = e.display_name(&mut out);
        assert_eq!(&out[..n], b"HELLO.TXT");
        let d = entry(b"ADIRNAME", b"   ");
        let n = d.display_name(&mut out);
        assert_eq!(&out[..n], b"ADIRNAME");
    }

    /// Builds a tiny volume: 1 reserved sector, 1 FAT sector, 1 root
    /// sector (16 entries), data from LBA 3. One file HELLO.TXT spanning
    /// clusters 2 and 3 (600 bytes), one subdirectory SUB at cluster 4
    /// containing INNER.BIN at cluster 5.
    fn sample_volume() -> Fat16Volume<MemDisk> {
        let mut disk = MemDisk::new(16);

        let bpb = disk.sector_mut(0);
        bpb[11..13].copy_from_slice(&512u16.to_le_bytes());
        bpb[13] = 1; // sectors per cluster
        bpb[14..16].copy_from_slice(&1u16.to_le_bytes()); // reserved
        bpb[16] = 1; // FATs
        bpb[17..19].copy_from_slice(&16u16.to_le_bytes()); // root entries
        bpb[22..24].copy_from_slice(&1u16.to_le_bytes()); // FAT size

        let fat = disk.sector_mut(1);
        let fat_entries: [u16; 6] = [0xFFF8, 0xFFFF, 3, 0xFFFF, 0xFFFF, 0xFFFF];
        for (i, v) in fat_entries.iter().enumerate() {
            fat[i * 2..i * 2 + 2].copy_from_slice(&v.to_le_bytes());
        }

        let root = disk.sector_mut(2);
        root[0..8].copy_from_slice(b"HELLO   ");
        root[8..11].copy_from_slice(b"TXT");
        root[26..28].copy_from_slice(&2u16.to_le_bytes());
        root[28..32].copy_from_slice(&600u32.to_le_bytes());
        root[32..40].copy_from_slice(b"SUB     ");
        root[40..43].copy_from_slice(b"   ");
        root[43] = ATTR_DIRECTORY;
        root[58..60].copy_from_slice(&4u16.to_le_bytes());

        // File data: cluster 2 (LBA 3) and cluster 3 (LBA 4).
        disk.sector_mut(3).fill(b'A');
        disk.sector_mut(4).fill(b'B');

        // Subdirectory at cluster 4 (LBA 5).
        let sub = disk.sector_mut(5);
        sub[0..8].copy_from_slice(b"INNER   ");
        sub[8..11].copy_from_slice(b"BIN");
        sub[26..28].copy_from_slice(&5u16.to_le_bytes());
        sub[28..32].copy_from_slice(&4u32.to_le_bytes());

        // Inner file data at cluster 5 (LBA 6).
        disk.sector_mut(6)[..4].copy_from_slice(b"data");

        Fat16Volume::mount(disk, 0).unwrap()
    }

    #[test]
    fn lookup_in_root() {
        let mut vol = sample_volume();
        let entry = vol.lookup("/HELLO.TXT").unwrap().unwrap();
        assert_eq!(entry.start_cluster, 2);
        assert_eq!(entry.size, 600);
        assert!(vol.lookup("/MISSING.TXT").unwrap().is_none());
    }

    #[test]
    fn lookup_through_subdirectory() {
        let mut vol = sample_volume();
        let entry = vol.lookup("/SUB/INNER.BIN").unwrap().unwrap();
        assert_eq!(entry.size, 4);
        // A file cannot be a path prefix.
        assert!(vol.lookup("/HELLO.TXT/X").unwrap().is_none());
    }

    #[test]
    fn read_spans_cluster_chain() {
        let mut vol = sample_volume();
        let entry = vol.lookup("/HELLO.TXT").unwrap().unwrap();
        let mut file = Fat16File {
            start_cluster: entry.start_cluster,
            size: entry.size,
            offset: 0,
        };
        let mut buf = [0u8; 600];
        assert_eq!(vol.read_file(&mut file, &mut buf).unwrap(), 600);
        assert!(buf[..512].iter().all(|&b| b == b'A'));
        assert!(buf[512..].iter().all(|&b| b == b'B'));
        // Reads past EOF return zero.
        assert_eq!(vol.read_file(&mut file, &mut buf).unwrap(), 0);
    }

    #[test]
    fn read_resumes_at_offset() {
        let mut vol = sample_volume();
        let mut file = Fat16File {
            start_cluster: 2,
            size: 600,
            offset: 510,
        };
        let mut buf = [0u8; 4];
        assert_eq!(vol.read_file(&mut file, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"AABB");
    }

    #[test]
    fn getdirents_reports_both_entries() {
        let mut vol = sample_volume();
        let mut dir = Fat16Dir {
            location: DirLocation::Root,
            next: 0,
        };
        let mut buf = [0u8; crate::fs::DIRENT_SIZE * 4];
        let count = vol.getdirents(&mut dir, &mut buf).unwrap();
        assert_eq!(count, 2);
        let first = &buf[..crate::fs::DIRENT_SIZE];
        assert_eq!(&first[..9], b"HELLO.TXT");
        assert_eq!(first[9], 0);
        let second = &buf[crate::fs::DIRENT_SIZE..][..crate::fs::DIRENT_SIZE];
        assert_eq!(&second[..3], b"SUB");
    }
}
