//! Pin protocol encoder
//!
//! The panel expects a 16-bit 8080-style parallel bus, but on this board its
//! lines are wired to GPIO port D. The DMA engine emulates the bus by writing
//! whole 32-bit words to the port data register, one word per bus edge.
//! This module turns commands and pixels into those words.
//!
//! ## Transaction word layout
//!
//! ```text
//! bit   31..21  20  19  18  17..10   9   8..1    0
//!       ------  RD  RS  WR  D15..D8  -   D7..D0  -
//! ```
//!
//! - `D7..D0` sit on pins 1..8, `D15..D8` on pins 10..17 (pin 9 is skipped)
//! - `RS` is high for data words, low for commands
//! - `RD` is held high for every write
//! - `WR` latches on its rising edge, so every bus write is two words:
//!   first with `WR` low, then the same word with `WR` high
//!
//! Encoding is a pure function: the same pixels always produce the same
//! transaction words.
//!
//! ## Example
//!
//! ```
//! use r61520_slcd::encoder::{decode, encode_command, encode_data};
//!
//! let [low, high] = encode_command(0x2C);
//! assert_eq!(low, 0x0010_0058);
//! assert_eq!(high, 0x0014_0058);
//!
//! let [_, high] = encode_data(0xF81F);
//! assert_eq!(decode(high), Some((true, 0xF81F)));
//! ```

use crate::command::WRITE_MEMORY_START;
use crate::config::Geometry;
use crate::error::Error;
use crate::regs::gpio::{DATA_HIGH_SHIFT, DATA_LOW_SHIFT, RD, RS, WR};

/// One 32-bit write to the pin data register
pub type TransactionWord = u32;

/// Mask of the low data byte after spreading
const LOW_FIELD: u32 = 0xFF << DATA_LOW_SHIFT;

/// Mask of the high data byte after spreading
const HIGH_FIELD: u32 = 0xFF00 << DATA_HIGH_SHIFT;

/// Spread a bus value over the data pins
const fn spread(value: u16) -> u32 {
    let value = value as u32;
    ((value & 0x00FF) << DATA_LOW_SHIFT) | ((value & 0xFF00) << DATA_HIGH_SHIFT)
}

/// Encode one bus write as a strobe-low / strobe-high pair
const fn encode(is_data: bool, value: u16) -> [TransactionWord; 2] {
    let mut word = spread(value) | RD;
    if is_data {
        word |= RS;
    }
    [word, word | WR]
}

/// Encode a command byte
pub const fn encode_command(command: u8) -> [TransactionWord; 2] {
    encode(false, command as u16)
}

/// Encode a data word (parameter or pixel)
pub const fn encode_data(value: u16) -> [TransactionWord; 2] {
    encode(true, value)
}

/// Recover `(is_data, value)` from a transaction word
///
/// Returns `None` for words that cannot come from the encoder: bits outside
/// the bus lines set, or the read strobe low.
pub const fn decode(word: TransactionWord) -> Option<(bool, u16)> {
    if word & !(LOW_FIELD | HIGH_FIELD | WR | RS | RD) != 0 || word & RD == 0 {
        return None;
    }
    let low = (word & LOW_FIELD) >> DATA_LOW_SHIFT;
    let high = (word & HIGH_FIELD) >> DATA_HIGH_SHIFT;
    Some((word & RS != 0, (low | high) as u16))
}

/// Number of transaction words produced for one frame
pub const fn frame_words(geometry: Geometry) -> usize {
    geometry.transfer_words()
}

/// Encode a full frame into `dst`
///
/// Writes the write-memory-start command pair followed by one pair per
/// pixel in row-major order. Returns the number of words written, always
/// `2 + 2 * W * H`. Words past that count are left untouched.
///
/// # Errors
///
/// - `Error::GeometryMismatch` if `pixels` does not hold exactly `W * H` pixels
/// - `Error::BufferTooSmall` if `dst` cannot hold the encoded frame
///
/// Both checks run before `dst` is modified.
pub fn encode_frame(
    pixels: &[u16],
    geometry: Geometry,
    dst: &mut [TransactionWord],
) -> Result<usize, Error> {
    let expected = geometry.pixel_count();
    if pixels.len() != expected {
        return Err(Error::GeometryMismatch {
            expected,
            provided: pixels.len(),
        });
    }
    let required = frame_words(geometry);
    if dst.len() < required {
        return Err(Error::BufferTooSmall {
            required,
            provided: dst.len(),
        });
    }

    let (header, body) = dst[..required].split_at_mut(2);
    header.copy_from_slice(&encode_command(WRITE_MEMORY_START));
    for (pair, &pixel) in body.chunks_exact_mut(2).zip(pixels) {
        pair.copy_from_slice(&encode_data(pixel));
    }
    Ok(required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{BLACK, WHITE};
    use alloc::vec;
    use alloc::vec::Vec;

    fn tiny() -> Geometry {
        Geometry::new(4, 3).unwrap()
    }

    #[test]
    fn test_command_word_layout() {
        let [low, high] = encode_command(WRITE_MEMORY_START);
        // 0x2C spread onto pins 1..8, RD high, RS low
        assert_eq!(low, (0x2C << 1) | RD);
        assert_eq!(low & RS, 0);
        assert_eq!(low & WR, 0);
        assert_eq!(high, low | WR);
    }

    #[test]
    fn test_data_word_layout() {
        let [low, high] = encode_data(0xABCD);
        assert_eq!(low, (0xCD << 1) | (0xAB00 << 2) | RS | RD);
        assert_eq!(high, low | WR);
        // Pins 0 and 9 are never driven
        assert_eq!(high & 1, 0);
        assert_eq!(high & (1 << 9), 0);
    }

    #[test]
    fn test_every_pixel_value_round_trips() {
        for value in 0..=u16::MAX {
            let [low, high] = encode_data(value);
            assert_eq!(decode(low), Some((true, value)));
            assert_eq!(decode(high), Some((true, value)));
            assert_eq!(low & WR, 0);
            assert_eq!(high & WR, WR);
        }
    }

    #[test]
    fn test_every_command_round_trips() {
        for command in 0..=u8::MAX {
            let [low, high] = encode_command(command);
            assert_eq!(decode(low), Some((false, u16::from(command))));
            assert_eq!(decode(high), Some((false, u16::from(command))));
        }
    }

    #[test]
    fn test_decode_rejects_foreign_words() {
        assert_eq!(decode(0), None); // RD low
        assert_eq!(decode(RD | 1), None); // pin 0
        assert_eq!(decode(RD | (1 << 9)), None); // pin 9
        assert_eq!(decode(RD | (1 << 21)), None); // chip select
    }

    #[test]
    fn test_frame_length_and_header() {
        let geometry = tiny();
        let pixels = vec![BLACK; geometry.pixel_count()];
        let mut dst = vec![0u32; frame_words(geometry)];

        let written = encode_frame(&pixels, geometry, &mut dst).unwrap();
        assert_eq!(written, 2 + 2 * 4 * 3);
        assert_eq!(dst[..2], encode_command(WRITE_MEMORY_START));
        for pair in dst[2..].chunks_exact(2) {
            assert_eq!(pair, encode_data(BLACK));
        }
    }

    #[test]
    fn test_frame_is_row_major() {
        let geometry = tiny();
        let pixels: Vec<u16> = (0..12).map(|i| i * 0x1111).collect();
        let mut dst = vec![0u32; frame_words(geometry)];
        encode_frame(&pixels, geometry, &mut dst).unwrap();

        let decoded: Vec<u16> = dst[2..]
            .chunks_exact(2)
            .map(|pair| decode(pair[1]).unwrap().1)
            .collect();
        assert_eq!(decoded, pixels);
    }

    #[test]
    fn test_frame_is_deterministic() {
        let geometry = Geometry::PANEL;
        let pixels: Vec<u16> = (0..geometry.pixel_count())
            .map(|i| (i as u16).wrapping_mul(31))
            .collect();
        let mut first = vec![0u32; frame_words(geometry)];
        let mut second = vec![0xFFFF_FFFFu32; frame_words(geometry)];

        encode_frame(&pixels, geometry, &mut first).unwrap();
        encode_frame(&pixels, geometry, &mut second).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2 + 2 * 320 * 240);
    }

    #[test]
    fn test_geometry_mismatch_leaves_buffer_untouched() {
        let geometry = tiny();
        let pixels = vec![WHITE; geometry.pixel_count() + 1];
        let mut dst = vec![7u32; frame_words(geometry)];

        let result = encode_frame(&pixels, geometry, &mut dst);
        assert_eq!(
            result,
            Err(Error::GeometryMismatch {
                expected: 12,
                provided: 13
            })
        );
        assert!(dst.iter().all(|&w| w == 7));
    }

    #[test]
    fn test_short_destination_rejected() {
        let geometry = tiny();
        let pixels = vec![WHITE; geometry.pixel_count()];
        let mut dst = vec![7u32; frame_words(geometry) - 1];

        let result = encode_frame(&pixels, geometry, &mut dst);
        assert!(matches!(result, Err(Error::BufferTooSmall { .. })));
        assert!(dst.iter().all(|&w| w == 7));
    }

    #[test]
    fn test_oversized_destination_tail_untouched() {
        let geometry = tiny();
        let pixels = vec![WHITE; geometry.pixel_count()];
        let mut dst = vec![7u32; frame_words(geometry) + 4];

        let written = encode_frame(&pixels, geometry, &mut dst).unwrap();
        assert!(dst[written..].iter().all(|&w| w == 7));
    }
}
