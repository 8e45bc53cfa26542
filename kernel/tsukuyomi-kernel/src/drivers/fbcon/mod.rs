//! Framebuffer text console.
//!
//! Renders text into a 32-bit BGR linear framebuffer using a PSF1 font
//! loaded from a boot module. Mirrors the kernel log and TTY output; a
//! machine without a usable framebuffer simply never initializes this
//! console and output stays on the serial port.

pub mod psf;

use tsukuyomi_core::sync::SpinMutex;

use crate::boot::FramebufferInfo;
use self::psf::PsfFont;

/// Foreground color (BGR, light grey).
const FG: u32 = 0x00D0_D0D0;
/// Background color.
const BG: u32 = 0x0000_0000;

/// A text console over a linear framebuffer.
pub struct FbCon {
    base: *mut u32,
    width: usize,
    height: usize,
    /// Pixels per scanline (pitch / 4).
    stride: usize,
    font: PsfFont<'static>,
    cols: usize,
    rows: usize,
    col: usize,
    row: usize,
}

// SAFETY: The console is only driven under the CONSOLE lock.
unsafe impl Send for FbCon {}

impl FbCon {
    fn new(fb: &FramebufferInfo, font: PsfFont<'static>) -> Self {
        let width = fb.width as usize;
        let height = fb.height as usize;
        Self {
            base: fb.address.as_mut_ptr::<u32>(),
            width,
            height,
            stride: fb.pitch as usize / 4,
            font,
            cols: width / font.glyph_width(),
            rows: height / font.glyph_height(),
            col: 0,
            row: 0,
        }
    }

    fn put_pixel(&mut self, x: usize, y: usize, color: u32) {
        debug_assert!(x < self.width && y < self.height);
        // SAFETY: x/y are bounded by the framebuffer dimensions and the
        // bootloader maps the full pitch*height region.
        unsafe { self.base.add(y * self.stride + x).write_volatile(color) };
    }

    fn draw_glyph(&mut self, col: usize, row: usize, glyph_index: usize) {
        let width = self.font.glyph_width();
        let height = self.font.glyph_height();
        // The rows borrow the 'static font data, not the console.
        let Some(rows) = self.font.glyph(glyph_index) else {
            return;
        };

        let x0 = col * width;
        let y0 = row * height;
        for (dy, &bits) in rows.iter().enumerate() {
            for dx in 0..width {
                let lit = bits & (0x80 >> dx) != 0;
                self.put_pixel(x0 + dx, y0 + dy, if lit { FG } else { BG });
            }
        }
    }

    fn scroll(&mut self) {
        let glyph_height = self.font.glyph_height();
        let visible = self.rows * glyph_height;
        let from = glyph_height * self.stride;
        let count = (visible - glyph_height) * self.stride;
        // SAFETY: Source and destination ranges lie inside the mapped
        // framebuffer; copy handles the overlap front-to-back.
        unsafe { core::ptr::copy(self.base.add(from), self.base, count) };
        for y in visible - glyph_height..visible {
            for x in 0..self.width {
                self.put_pixel(x, y, BG);
            }
        }
    }

    fn newline(&mut self) {
        self.col = 0;
        self.row += 1;
        if self.row == self.rows {
            self.row -= 1;
            self.scroll();
        }
    }

    fn put_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => self.newline(),
            b'\r' => self.col = 0,
            0x08 => {
                // Backspace: erase the previous cell.
                if self.col > 0 {
                    self.col -= 1;
                    self.draw_glyph(self.col, self.row, b' ' as usize);
                }
            }
            byte => {
                self.draw_glyph(self.col, self.row, byte as usize);
                self.col += 1;
                if self.col == self.cols {
                    self.newline();
                }
            }
        }
    }
}

/// The console, present once a framebuffer and font were found at boot.
static CONSOLE: SpinMutex<Option<FbCon>> = SpinMutex::new(None);

/// Attaches the console to a framebuffer with the given font.
pub fn init(fb: &FramebufferInfo, font: PsfFont<'static>) {
    let con = FbCon::new(fb, font);
    crate::kinfo!(
        "fbcon: {}x{} pixels, {}x{} cells",
        con.width,
        con.height,
        con.cols,
        con.rows
    );
    *CONSOLE.lock() = Some(con);
}

/// Writes bytes to the console; silently discards if uninitialized.
pub fn write_bytes(bytes: &[u8]) {
    let mut guard = CONSOLE.lock();
    if let Some(con) = guard.as_mut() {
        for &byte in bytes {
            con.put_byte(byte);
        }
    }
}
