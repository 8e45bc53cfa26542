//! Framebuffer structures.

/// Memory model value for linear BGR/RGB framebuffers.
pub const MEMORY_MODEL_RGB: u8 = 1;

/// A linear framebuffer description provided by the bootloader.
///
/// The layout follows the Limine protocol's `limine_framebuffer` structure
/// (response revision 0 fields only).
#[repr(C)]
pub struct Framebuffer {
    /// Virtual address of the framebuffer memory.
    pub address: u64,
    /// Width in pixels.
    pub width: u64,
    /// Height in pixels.
    pub height: u64,
    /// Bytes per scanline.
    pub pitch: u64,
    /// Bits per pixel.
    pub bpp: u16,
    /// Memory model ([`MEMORY_MODEL_RGB`] for linear framebuffers).
    pub memory_model: u8,
    /// Bits in the red channel mask.
    pub red_mask_size: u8,
    /// Bit position of the red channel mask.
    pub red_mask_shift: u8,
    /// Bits in the green channel mask.
    pub green_mask_size: u8,
    /// Bit position of the green channel mask.
    pub green_mask_shift: u8,
    /// Bits in the blue channel mask.
    pub blue_mask_size: u8,
    /// Bit position of the blue channel mask.
    pub blue_mask_shift: u8,
    /// Reserved.
    pub unused: [u8; 7],
    /// Size of the EDID blob, or 0.
    pub edid_size: u64,
    /// Virtual address of the EDID blob, or 0.
    pub edid: u64,
}
