//! RGB565 pixel layout
//!
//! The panel is driven at 16 bits per pixel. Each pixel word carries its
//! color channels at fixed bit positions, most significant channel first:
//!
//! | Channel | Offset | Length |
//! |---------|--------|--------|
//! | Red     | 11     | 5      |
//! | Green   | 5      | 6      |
//! | Blue    | 0      | 5      |
//!
//! The pipeline never converts between color depths; it streams the pixel
//! words exactly as the producer wrote them.
//!
//! ## Example
//!
//! ```
//! use r61520_slcd::color::{rgb565, BLACK, WHITE};
//!
//! assert_eq!(rgb565(0, 0, 0), BLACK);
//! assert_eq!(rgb565(31, 63, 31), WHITE);
//! assert_eq!(rgb565(31, 0, 0), 0xF800);
//! ```

/// Bits per pixel of the panel's only mode
pub const BITS_PER_PIXEL: u8 = 16;

/// All channels off
pub const BLACK: u16 = 0x0000;

/// All channels at full intensity
pub const WHITE: u16 = 0xFFFF;

/// Position of one color channel inside a pixel word
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bitfield {
    /// Offset of the least significant bit
    pub offset: u8,
    /// Number of bits
    pub length: u8,
}

impl Bitfield {
    /// Mask of the field, already shifted into place
    pub const fn mask(self) -> u16 {
        (((1u32 << self.length) - 1) << self.offset) as u16
    }

    /// Extract the field from a pixel word
    pub const fn extract(self, pixel: u16) -> u16 {
        (pixel & self.mask()) >> self.offset
    }
}

/// Channel layout of a pixel format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelFormat {
    /// Red channel
    pub red: Bitfield,
    /// Green channel
    pub green: Bitfield,
    /// Blue channel
    pub blue: Bitfield,
    /// Total bits per pixel
    pub bits_per_pixel: u8,
}

/// The RGB 5-6-5 layout used by the panel
pub const RGB565: PixelFormat = PixelFormat {
    red: Bitfield {
        offset: 11,
        length: 5,
    },
    green: Bitfield {
        offset: 5,
        length: 6,
    },
    blue: Bitfield {
        offset: 0,
        length: 5,
    },
    bits_per_pixel: BITS_PER_PIXEL,
};

/// Pack channel values into a pixel word
///
/// Values wider than their channel are truncated to the channel width.
pub const fn rgb565(red: u8, green: u8, blue: u8) -> u16 {
    let r = (red as u16 & 0x1F) << RGB565.red.offset;
    let g = (green as u16 & 0x3F) << RGB565.green.offset;
    let b = (blue as u16 & 0x1F) << RGB565.blue.offset;
    r | g | b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_cover_word_without_overlap() {
        let masks = [RGB565.red.mask(), RGB565.green.mask(), RGB565.blue.mask()];
        assert_eq!(masks, [0xF800, 0x07E0, 0x001F]);
        assert_eq!(masks.iter().fold(0, |acc, m| acc | m), 0xFFFF);
        assert_eq!(masks[0] & masks[1], 0);
        assert_eq!(masks[1] & masks[2], 0);
    }

    #[test]
    fn test_extract_round_trips_pack() {
        let pixel = rgb565(21, 42, 7);
        assert_eq!(RGB565.red.extract(pixel), 21);
        assert_eq!(RGB565.green.extract(pixel), 42);
        assert_eq!(RGB565.blue.extract(pixel), 7);
    }

    #[test]
    fn test_rgb565_truncates_wide_values() {
        assert_eq!(rgb565(0xFF, 0, 0), 0xF800);
        assert_eq!(rgb565(0, 0xFF, 0), 0x07E0);
    }
}
