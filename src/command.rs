//! R61520 command definitions
//!
//! This module defines the command bytes used to set up the R61520 panel
//! controller and the default initialization sequence streamed during
//! bring-up. Commands are latched with the register-select line low,
//! parameters and pixel data with it high.
//!
//! The default sequence uses the controller's DCS-compatible command set.
//! Panel modules differ in their gamma and power settings, so boards that
//! need more than this sequence should pass their own to
//! [`Builder::init_sequence`](crate::config::Builder::init_sequence).
//!
//! ## Example
//!
//! ```
//! use r61520_slcd::command::{self, InitStep};
//!
//! const SEQUENCE: &[InitStep] = &[
//!     InitStep::Command(command::EXIT_SLEEP_MODE),
//!     InitStep::DelayMs(120),
//!     InitStep::Command(command::SET_DISPLAY_ON),
//! ];
//! assert_eq!(SEQUENCE.len(), 3);
//! ```

/// Soft reset command (0x01)
///
/// Returns registers to their defaults. Wait 5ms before the next command.
pub const SOFT_RESET: u8 = 0x01;

/// Exit sleep mode command (0x11)
///
/// Starts the internal oscillator and power supply. Wait 120ms.
pub const EXIT_SLEEP_MODE: u8 = 0x11;

/// Display on command (0x29)
pub const SET_DISPLAY_ON: u8 = 0x29;

/// Set column address command (0x2A)
///
/// Requires 4 parameters: [start_MSB, start_LSB, end_MSB, end_LSB]
pub const SET_COLUMN_ADDRESS: u8 = 0x2A;

/// Set page address command (0x2B)
///
/// Requires 4 parameters: [start_MSB, start_LSB, end_MSB, end_LSB]
pub const SET_PAGE_ADDRESS: u8 = 0x2B;

/// Write memory start command (0x2C)
///
/// Resets the write pointer to the window origin; every following data
/// word is one pixel. Opens every DMA frame.
pub const WRITE_MEMORY_START: u8 = 0x2C;

/// Set address mode command (0x36)
///
/// Requires 1 parameter: scan direction and RGB/BGR order.
pub const SET_ADDRESS_MODE: u8 = 0x36;

/// Set pixel format command (0x3A)
///
/// Requires 1 parameter: 0x55 selects 16 bits per pixel on the bus.
pub const SET_PIXEL_FORMAT: u8 = 0x3A;

/// Pixel format parameter for 16-bit RGB565
pub const PIXEL_FORMAT_16BPP: u16 = 0x55;

/// Address mode parameter for landscape scanning
pub const ADDRESS_MODE_LANDSCAPE: u16 = 0x20;

/// One step of a panel initialization sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitStep {
    /// Latch a command byte (register select low)
    Command(u8),
    /// Latch a parameter word (register select high)
    Data(u16),
    /// Wait before the next step
    DelayMs(u32),
}

/// Default R61520 sequence for a 320x240 landscape window
///
/// The write window covers columns 0..=319 and pages 0..=239.
pub const DEFAULT_INIT_SEQUENCE: &[InitStep] = &[
    InitStep::Command(SOFT_RESET),
    InitStep::DelayMs(5),
    InitStep::Command(EXIT_SLEEP_MODE),
    InitStep::DelayMs(120),
    InitStep::Command(SET_PIXEL_FORMAT),
    InitStep::Data(PIXEL_FORMAT_16BPP),
    InitStep::Command(SET_ADDRESS_MODE),
    InitStep::Data(ADDRESS_MODE_LANDSCAPE),
    InitStep::Command(SET_COLUMN_ADDRESS),
    InitStep::Data(0x00),
    InitStep::Data(0x00),
    InitStep::Data(0x01),
    InitStep::Data(0x3F),
    InitStep::Command(SET_PAGE_ADDRESS),
    InitStep::Data(0x00),
    InitStep::Data(0x00),
    InitStep::Data(0x00),
    InitStep::Data(0xEF),
    InitStep::Command(SET_DISPLAY_ON),
    InitStep::DelayMs(10),
];
