//! ATA PIO disk access (primary channel, LBA28 reads).
//!
//! Polling only; one sector per command. Enough to back GPT discovery and
//! the read-only FAT16 driver.

use core::fmt;

use tsukuyomi_core::arch::x86_64::Port;
use tsukuyomi_core::sync::SpinMutex;

/// Size of one disk sector in bytes.
pub const SECTOR_SIZE: usize = 512;

/// I/O base of the primary ATA channel.
const PRIMARY_IO_BASE: u16 = 0x1F0;
/// Control base of the primary ATA channel.
const PRIMARY_CTRL_BASE: u16 = 0x3F6;

/// READ SECTORS command.
const CMD_READ_SECTORS: u8 = 0x20;

bitflags::bitflags! {
    /// ATA status register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Status: u8 {
        /// An error occurred.
        const ERR = 1 << 0;
        /// Data request: ready to transfer.
        const DRQ = 1 << 3;
        /// Drive fault.
        const DF  = 1 << 5;
        /// Drive ready.
        const RDY = 1 << 6;
        /// Controller busy.
        const BSY = 1 << 7;
    }
}

/// Errors from the disk layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskError {
    /// No drive answered on the channel.
    NotPresent,
    /// The drive reported an error or fault.
    Failed,
    /// The drive never became ready.
    Timeout,
}

impl fmt::Display for DiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPresent => write!(f, "no drive present"),
            Self::Failed => write!(f, "drive reported an error"),
            Self::Timeout => write!(f, "drive timed out"),
        }
    }
}

/// A source of 512-byte sectors.
///
/// The FAT16 and GPT code is written against this trait so tests can
/// substitute an in-memory disk image.
pub trait BlockRead {
    /// Reads the sector at `lba` into `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`DiskError`] when the device cannot produce the sector.
    fn read_sector(&mut self, lba: u64, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), DiskError>;
}

/// The primary-master ATA drive, driven by polled PIO.
pub struct AtaDrive {
    io_base: u16,
    ctrl_base: u16,
}

impl AtaDrive {
    /// Spin budget for busy-wait loops.
    const POLL_BUDGET: u32 = 1_000_000;

    /// Probes the primary master.
    ///
    /// # Errors
    ///
    /// Returns [`DiskError::NotPresent`] when the status register floats
    /// high (no device) or never settles.
    pub fn probe_primary() -> Result<Self, DiskError> {
        let drive = Self {
            io_base: PRIMARY_IO_BASE,
            ctrl_base: PRIMARY_CTRL_BASE,
        };
        let status = drive.status();
        if status.bits() == 0xFF {
            return Err(DiskError::NotPresent);
        }
        drive.wait_not_busy()?;
        Ok(drive)
    }

    fn status(&self) -> Status {
        // SAFETY: Reading the ATA status register has no side effects
        // beyond clearing the interrupt condition.
        Status::from_bits_truncate(unsafe { Port::<u8>::new(self.ctrl_base).read() })
    }

    fn wait_not_busy(&self) -> Result<(), DiskError> {
        for _ in 0..Self::POLL_BUDGET {
            if !self.status().contains(Status::BSY) {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(DiskError::Timeout)
    }

    fn wait_data(&self) -> Result<(), DiskError> {
        for _ in 0..Self::POLL_BUDGET {
            let status = self.status();
            if status.intersects(Status::ERR | Status::DF) {
                return Err(DiskError::Failed);
            }
            if !status.contains(Status::BSY) && status.contains(Status::DRQ) {
                return Ok(());
            }
            core::hint::spin_loop();
        }
        Err(DiskError::Timeout)
    }
}

impl BlockRead for AtaDrive {
    fn read_sector(&mut self, lba: u64, buf: &mut [u8; SECTOR_SIZE]) -> Result<(), DiskError> {
        assert!(lba < 1 << 28, "ata: LBA28 overflow");
        self.wait_not_busy()?;

        // SAFETY: Standard primary-channel command sequence; the ports
        // belong to this driver.
        unsafe {
            // Drive/head: master, LBA mode, LBA bits 24..27.
            Port::<u8>::new(self.io_base + 6).write(0xE0 | ((lba >> 24) as u8 & 0x0F));
            Port::<u8>::new(self.io_base + 2).write(1); // sector count
            Port::<u8>::new(self.io_base + 3).write(lba as u8);
            Port::<u8>::new(self.io_base + 4).write((lba >> 8) as u8);
            Port::<u8>::new(self.io_base + 5).write((lba >> 16) as u8);
            Port::<u8>::new(self.io_base + 7).write(CMD_READ_SECTORS);
        }

        self.wait_data()?;

        let data = Port::<u16>::new(self.io_base);
        for chunk in buf.chunks_exact_mut(2) {
            // SAFETY: DRQ is set; the drive expects exactly 256 word reads.
            let word = unsafe { data.read() };
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Ok(())
    }
}

/// The mounted primary drive, if probing found one.
static PRIMARY: SpinMutex<Option<AtaDrive>> = SpinMutex::new(None);

/// Probes the primary channel and stashes the drive.
pub fn init() {
    match AtaDrive::probe_primary() {
        Ok(drive) => {
            *PRIMARY.lock() = Some(drive);
            crate::kinfo!("ata: primary master present");
        }
        Err(err) => crate::kinfo!("ata: no usable drive ({err})"),
    }
}

/// Runs `f` with the primary drive, or returns `None` if absent.
pub fn with_primary<R>(f: impl FnOnce(&mut AtaDrive) -> R) -> Option<R> {
    let mut guard = PRIMARY.lock();
    guard.as_mut().map(f)
}

/// Takes the primary drive out of the slot (the FAT16 mount owns it
/// afterwards).
pub fn take_primary() -> Option<AtaDrive> {
    PRIMARY.lock().take()
}

/// In-memory disk image for unit tests.
#[cfg(test)]
pub mod tests_support {
    use super::{BlockRead, DiskError, SECTOR_SIZE};
    use alloc::vec;
    use alloc::vec::Vec;

    /// A disk backed by a `Vec` of sectors.
    pub struct MemDisk {
        sectors: Vec<[u8; SECTOR_SIZE]>,
    }

    impl MemDisk {
        /// Creates a zeroed disk with `count` sectors.
        pub fn new(count: usize) -> Self {
            Self {
                sectors: vec![[0u8; SECTOR_SIZE]; count],
            }
        }

        /// Mutable access to one sector for fixture setup.
        pub fn sector_mut(&mut self, lba: usize) -> &mut [u8; SECTOR_SIZE] {
            &mut self.sectors[lba]
        }
    }

    impl BlockRead for MemDisk {
        fn read_sector(
            &mut self,
            lba: u64,
            buf: &mut [u8; SECTOR_SIZE],
        ) -> Result<(), DiskError> {
            let sector = self.sectors.get(lba as usize).ok_or(DiskError::Failed)?;
            buf.copy_from_slice(sector);
            Ok(())
        }
    }
}
