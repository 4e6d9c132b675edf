//! Error types for the driver
//!
//! This module defines error types for configuration building ([`BuilderError`]),
//! DMA memory allocation ([`AllocError`]) and pipeline operations ([`Error`]).
//!
//! ## Error Types
//!
//! - [`BuilderError`] - Errors during configuration construction
//! - [`AllocError`] - A coherent DMA buffer could not be allocated
//! - [`Error`] - Bring-up and producer-side errors
//!
//! Steady-state refresh has no error path: the completion handler only
//! acknowledges and re-arms, and buffer reuse conflicts are ruled out by
//! construction rather than reported.
//!
//! ## Example
//!
//! ```
//! use r61520_slcd::{BuilderError, Geometry};
//!
//! // Larger than the panel
//! let result = Geometry::new(640, 480);
//! assert!(matches!(result, Err(BuilderError::InvalidGeometry { .. })));
//! ```

use crate::bringup::BringupState;

/// Maximum panel width in pixels
///
/// The R61520 panel on this board is wired as a 320x240 landscape display.
pub const MAX_WIDTH: u16 = 320;

/// Maximum panel height in pixels
pub const MAX_HEIGHT: u16 = 240;

/// A coherent DMA buffer could not be allocated
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocError {
    /// Pool slot (or allocator request) that failed
    pub index: usize,
    /// Requested size in 32-bit words
    pub words: usize,
}

impl core::fmt::Display for AllocError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "DMA allocation {} of {} words failed",
            self.index, self.words
        )
    }
}

impl core::error::Error for AllocError {}

/// Errors that can occur while bringing up or feeding the pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// A transfer buffer could not be allocated
    ///
    /// Fatal to bring-up: partial allocations have already been released
    /// and the pipeline never reaches [`BringupState::Armed`].
    Allocation(AllocError),
    /// Pixel buffer size does not match the panel geometry
    ///
    /// Rejected before any buffer or register is touched.
    GeometryMismatch {
        /// Required number of pixels
        expected: usize,
        /// Number of pixels provided
        provided: usize,
    },
    /// Requested video mode is not the panel's fixed mode
    UnsupportedMode {
        /// Requested width
        width: u16,
        /// Requested height
        height: u16,
        /// Requested color depth
        bits_per_pixel: u8,
    },
    /// A bring-up step ran out of order
    InvalidState {
        /// State the step requires
        expected: BringupState,
        /// State the sequencer was in
        actual: BringupState,
    },
    /// A transfer buffer cannot hold one encoded frame
    BufferTooSmall {
        /// Required size in words
        required: usize,
        /// Provided size in words
        provided: usize,
    },
}

impl From<AllocError> for Error {
    fn from(err: AllocError) -> Self {
        Self::Allocation(err)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Allocation(e) => write!(f, "Allocation failure: {e}"),
            Self::GeometryMismatch { expected, provided } => {
                write!(
                    f,
                    "Geometry mismatch: expected {expected} pixels, provided {provided}"
                )
            }
            Self::UnsupportedMode {
                width,
                height,
                bits_per_pixel,
            } => write!(f, "Unsupported mode {width}x{height}@{bits_per_pixel}bpp"),
            Self::InvalidState { expected, actual } => {
                write!(f, "Invalid bring-up state: expected {expected:?}, in {actual:?}")
            }
            Self::BufferTooSmall { required, provided } => {
                write!(
                    f,
                    "Transfer buffer too small: required {required} words, provided {provided}"
                )
            }
        }
    }
}

impl core::error::Error for Error {}

/// Errors that can occur when building configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuilderError {
    /// Geometry is zero-sized or exceeds the panel
    ///
    /// See [`Geometry::new()`](crate::config::Geometry::new) for constraints.
    InvalidGeometry {
        /// Width requested
        width: u16,
        /// Height requested
        height: u16,
    },
}

impl core::fmt::Display for BuilderError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidGeometry { width, height } => write!(
                f,
                "Invalid geometry {width}x{height} (max {MAX_WIDTH}x{MAX_HEIGHT})"
            ),
        }
    }
}

impl core::error::Error for BuilderError {}
