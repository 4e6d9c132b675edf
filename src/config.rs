//! Pipeline configuration types and builder

use crate::bringup::PanelTiming;
use crate::color::{BITS_PER_PIXEL, PixelFormat, RGB565};
use crate::command::{DEFAULT_INIT_SEQUENCE, InitStep};
use crate::dma::Channel;
pub use crate::error::{BuilderError, MAX_HEIGHT, MAX_WIDTH};
use crate::error::Error;

/// Number of transfer buffers in the pool
pub const POOL_SIZE: usize = 8;

/// Interrupt line of the DMA controller
pub const DMA_IRQ: u32 = 18;

/// Panel geometry in pixels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    /// Width in pixels (columns)
    pub width: u16,
    /// Height in pixels (rows)
    pub height: u16,
}

impl Geometry {
    /// The panel's native 320x240 geometry
    pub const PANEL: Self = Self {
        width: MAX_WIDTH,
        height: MAX_HEIGHT,
    };

    /// Create a new geometry with validation
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::InvalidGeometry` if either side is zero or
    /// larger than the panel (`MAX_WIDTH` x `MAX_HEIGHT`).
    pub fn new(width: u16, height: u16) -> Result<Self, BuilderError> {
        if width == 0 || width > MAX_WIDTH || height == 0 || height > MAX_HEIGHT {
            return Err(BuilderError::InvalidGeometry { width, height });
        }
        Ok(Self { width, height })
    }

    /// Number of pixels in one frame
    pub const fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Transaction words needed for one frame: `2 * (1 + W * H)`
    ///
    /// One strobe pair opens the write window, then one pair per pixel.
    pub const fn transfer_words(&self) -> usize {
        2 * (1 + self.pixel_count())
    }

    /// Bytes the DMA engine moves for one frame
    pub const fn transfer_bytes(&self) -> usize {
        self.transfer_words() * 4
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::PANEL
    }
}

/// Pipeline configuration
///
/// Use `Builder` to create a Config.
#[derive(Clone, Debug)]
pub struct Config {
    /// Panel geometry
    pub geometry: Geometry,
    /// DMA channel that streams frames
    pub channel: Channel,
    /// Interrupt line of the DMA controller
    pub dma_irq: u32,
    /// Timing generator constants
    pub timing: PanelTiming,
    /// Panel initialization sequence
    pub init_sequence: &'static [InitStep],
}

impl Config {
    /// Validate a requested video mode against the panel's fixed mode
    ///
    /// Returns the pixel layout on success. The panel has exactly one
    /// mode, so this is the only "resize" the pipeline accepts.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedMode` for any other geometry or depth.
    pub fn check_mode(
        &self,
        width: u16,
        height: u16,
        bits_per_pixel: u8,
    ) -> Result<PixelFormat, Error> {
        if width != self.geometry.width
            || height != self.geometry.height
            || bits_per_pixel != BITS_PER_PIXEL
        {
            return Err(Error::UnsupportedMode {
                width,
                height,
                bits_per_pixel,
            });
        }
        Ok(RGB565)
    }
}

/// Builder for constructing pipeline configuration
///
/// # Example
///
/// ```
/// use r61520_slcd::{Builder, Channel, Geometry};
///
/// let config = match Builder::new().channel(Channel::Ddma1).build() {
///     Ok(config) => config,
///     Err(_) => return,
/// };
/// assert_eq!(config.geometry, Geometry::PANEL);
/// ```
#[must_use]
pub struct Builder {
    /// Panel geometry
    geometry: Geometry,
    /// DMA channel that streams frames
    channel: Channel,
    /// Interrupt line of the DMA controller
    dma_irq: u32,
    /// Timing override (derived from geometry when unset)
    timing: Option<PanelTiming>,
    /// Panel initialization sequence
    init_sequence: &'static [InitStep],
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            geometry: Geometry::PANEL,
            channel: Channel::Ddma0,
            dma_irq: DMA_IRQ,
            timing: None,
            init_sequence: DEFAULT_INIT_SEQUENCE,
        }
    }
}

impl Builder {
    /// Create a new Builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set panel geometry
    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Set the DMA channel used for streaming
    pub fn channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// Set the DMA controller interrupt line
    pub fn dma_irq(mut self, irq: u32) -> Self {
        self.dma_irq = irq;
        self
    }

    /// Override the timing generator constants
    pub fn timing(mut self, timing: PanelTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    /// Set the panel initialization sequence
    pub fn init_sequence(mut self, sequence: &'static [InitStep]) -> Self {
        self.init_sequence = sequence;
        self
    }

    /// Build the configuration
    ///
    /// # Errors
    ///
    /// Returns `BuilderError::InvalidGeometry` if the geometry was built by
    /// hand and exceeds the panel.
    pub fn build(self) -> Result<Config, BuilderError> {
        let geometry = Geometry::new(self.geometry.width, self.geometry.height)?;
        Ok(Config {
            geometry,
            channel: self.channel,
            dma_irq: self.dma_irq,
            timing: self
                .timing
                .unwrap_or_else(|| PanelTiming::for_geometry(geometry)),
            init_sequence: self.init_sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_limits() {
        assert!(Geometry::new(320, 240).is_ok());
        assert!(Geometry::new(1, 1).is_ok());
        assert!(matches!(
            Geometry::new(0, 240),
            Err(BuilderError::InvalidGeometry {
                width: 0,
                height: 240
            })
        ));
        assert!(Geometry::new(321, 240).is_err());
        assert!(Geometry::new(320, 241).is_err());
    }

    #[test]
    fn test_transfer_size_formula() {
        let panel = Geometry::PANEL;
        assert_eq!(panel.pixel_count(), 76_800);
        assert_eq!(panel.transfer_words(), 2 * (1 + 320 * 240));
        // Matches the byte count programmed into the DMA engine
        assert_eq!(panel.transfer_bytes(), 320 * 240 * 8 + 8);
    }

    #[test]
    fn test_builder_defaults() {
        let config = Builder::new().build().unwrap();
        assert_eq!(config.geometry, Geometry::PANEL);
        assert_eq!(config.channel, Channel::Ddma0);
        assert_eq!(config.dma_irq, 18);
        assert_eq!(config.timing, PanelTiming::for_geometry(Geometry::PANEL));
        assert_eq!(config.init_sequence, DEFAULT_INIT_SEQUENCE);
    }

    #[test]
    fn test_builder_rejects_hand_built_geometry() {
        let result = Builder::new()
            .geometry(Geometry {
                width: 800,
                height: 480,
            })
            .build();
        assert!(matches!(result, Err(BuilderError::InvalidGeometry { .. })));
    }

    #[test]
    fn test_check_mode() {
        let config = Builder::new().build().unwrap();
        let format = config.check_mode(320, 240, 16).unwrap();
        assert_eq!(format.red.offset, 11);
        assert_eq!(format.green.length, 6);

        assert_eq!(
            config.check_mode(320, 240, 32),
            Err(Error::UnsupportedMode {
                width: 320,
                height: 240,
                bits_per_pixel: 32
            })
        );
        assert!(config.check_mode(240, 320, 16).is_err());
    }
}
