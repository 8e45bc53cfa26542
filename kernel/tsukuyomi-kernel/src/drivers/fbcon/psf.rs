//! PSF1 bitmap font parsing.
//!
//! PSF1 files carry a 4-byte header — magic `0x36 0x04`, a mode byte, and
//! the per-glyph byte count — followed by 256 (or 512, when the mode's
//! low bit is set) glyphs of 8×`charsize` pixels, one byte per row.

/// PSF1 magic bytes.
const PSF1_MAGIC: [u8; 2] = [0x36, 0x04];

/// Mode bit: the font has 512 glyphs instead of 256.
const MODE_512: u8 = 0x01;

/// Fixed glyph width in pixels (one byte per row).
pub const GLYPH_WIDTH: usize = 8;

/// Error returned when the input is not a usable PSF1 font.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsfError {
    /// The magic bytes are wrong.
    BadMagic,
    /// The data is shorter than the glyph table requires.
    Truncated,
}

/// A parsed PSF1 font borrowing its glyph table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsfFont<'a> {
    glyphs: &'a [u8],
    glyph_height: usize,
    glyph_count: usize,
}

impl<'a> PsfFont<'a> {
    /// Parses a PSF1 font from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PsfError`] when the magic or size does not check out.
    pub fn parse(data: &'a [u8]) -> Result<Self, PsfError> {
        if data.len() < 4 || data[0..2] != PSF1_MAGIC {
            return Err(PsfError::BadMagic);
        }
        let mode = data[2];
        let glyph_height = data[3] as usize;
        let glyph_count = if mode & MODE_512 != 0 { 512 } else { 256 };

        let table_len = glyph_count * glyph_height;
        let glyphs = data[4..].get(..table_len).ok_or(PsfError::Truncated)?;

        Ok(Self {
            glyphs,
            glyph_height,
            glyph_count,
        })
    }

    /// Number of glyphs in the font.
    #[must_use]
    pub fn glyph_count(&self) -> usize {
        self.glyph_count
    }

    /// Glyph width in pixels.
    #[must_use]
    pub fn glyph_width(&self) -> usize {
        GLYPH_WIDTH
    }

    /// Glyph height in pixels.
    #[must_use]
    pub fn glyph_height(&self) -> usize {
        self.glyph_height
    }

    /// Returns the bitmap rows of glyph `index`, or `None` out of range.
    #[must_use]
    pub fn glyph(&self, index: usize) -> Option<&'a [u8]> {
        if index >= self.glyph_count {
            return None;
        }
        let start = index * self.glyph_height;
        Some(&self.glyphs[start..start + self.glyph_height])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn font_256x16() -> Vec<u8> {
        let mut data = vec![0x36, 0x04, 0x00, 0x10];
        data.extend(core::iter::repeat_n(0u8, 256 * 16));
        data
    }

    #[test]
    fn parses_256_glyph_font() {
        let data = font_256x16();
        let font = PsfFont::parse(&data).unwrap();
        assert_eq!(font.glyph_count(), 256);
        assert_eq!(font.glyph_width(), 8);
        assert_eq!(font.glyph_height(), 16);
        assert!(font.glyph(256).is_none());
        assert_eq!(font.glyph(255).unwrap().len(), 16);
    }

    #[test]
    fn mode_bit_doubles_glyph_count() {
        let mut data = vec![0x36, 0x04, 0x01, 0x08];
        data.extend(core::iter::repeat_n(0u8, 512 * 8));
        let font = PsfFont::parse(&data).unwrap();
        assert_eq!(font.glyph_count(), 512);
        assert_eq!(font.glyph_height(), 8);
    }

    #[test]
    fn rejects_bad_magic() {
        let data = [0x35, 0x04, 0x00, 0x10];
        assert_eq!(PsfFont::parse(&data), Err(PsfError::BadMagic));
    }

    #[test]
    fn rejects_truncated_table() {
        let mut data = font_256x16();
        data.truncate(100);
        assert_eq!(PsfFont::parse(&data), Err(PsfError::Truncated));
    }

    #[test]
    fn glyph_rows_come_from_the_table() {
        let mut data = font_256x16();
        // Glyph 65 ('A'), row 3.
        data[4 + 65 * 16 + 3] = 0b0101_0101;
        let font = PsfFont::parse(&data).unwrap();
        assert_eq!(font.glyph(65).unwrap()[3], 0b0101_0101);
    }
}
