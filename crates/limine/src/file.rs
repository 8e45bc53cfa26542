//! Bootloader-loaded file representation.

use core::ffi::{CStr, c_char};

/// A file loaded by the bootloader (the kernel itself or a module).
///
/// The layout follows the Limine protocol's `limine_file` structure.
#[repr(C)]
pub struct File {
    /// Response revision this file structure conforms to.
    pub revision: u64,
    /// Virtual address of the file contents (inside the higher-half map).
    pub address: u64,
    /// Size of the file in bytes.
    pub size: u64,
    /// NUL-terminated path of the file as specified in the bootloader config.
    pub path: *const c_char,
    /// NUL-terminated command line associated with the file.
    pub string: *const c_char,
    /// Media type the file was loaded from.
    pub media_type: u32,
    /// Reserved.
    pub unused: u32,
    /// TFTP server IP, if network-booted.
    pub tftp_ip: u32,
    /// TFTP server port, if network-booted.
    pub tftp_port: u32,
    /// 1-based partition index, or 0 if not partitioned.
    pub partition_index: u32,
    /// MBR disk ID, if applicable.
    pub mbr_disk_id: u32,
    /// GPT disk UUID, if applicable.
    pub gpt_disk_uuid: [u64; 2],
    /// GPT partition UUID, if applicable.
    pub gpt_part_uuid: [u64; 2],
    /// Filesystem partition UUID, if applicable.
    pub part_uuid: [u64; 2],
}

impl File {
    /// Returns the file path as a string slice, or `""` if the path pointer
    /// is null or not valid UTF-8.
    #[must_use]
    pub fn path(&self) -> &str {
        if self.path.is_null() {
            return "";
        }
        // SAFETY: The bootloader provides a NUL-terminated string that lives
        // as long as the boot handoff data.
        unsafe { CStr::from_ptr(self.path) }.to_str().unwrap_or("")
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        // SAFETY: The bootloader maps `size` bytes at `address` inside the
        // higher-half direct map for the lifetime of the handoff data.
        unsafe { core::slice::from_raw_parts(self.address as *const u8, self.size as usize) }
    }
}
