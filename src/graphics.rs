//! Graphics support via embedded-graphics
//!
//! This module provides [`FrameBuffer`], an RGB565 pixel buffer that
//! implements the [`DrawTarget`](embedded_graphics_core::draw_target::DrawTarget)
//! trait from the embedded-graphics ecosystem. Draw into it, then hand its
//! pixels to [`Pipeline::present`](crate::pipeline::Pipeline::present).
//!
//! ## Example
//!
//! ```
//! use embedded_graphics::{
//!     pixelcolor::Rgb565,
//!     prelude::*,
//!     primitives::{PrimitiveStyle, Rectangle},
//! };
//! use r61520_slcd::{FrameBuffer, Geometry};
//!
//! let mut fb = match FrameBuffer::new([0u16; 320 * 240], Geometry::PANEL) {
//!     Ok(fb) => fb,
//!     Err(_) => return,
//! };
//! let _ = Rectangle::new(Point::new(10, 10), Size::new(20, 20))
//!     .into_styled(PrimitiveStyle::with_fill(Rgb565::RED))
//!     .draw(&mut fb);
//!
//! assert_eq!(fb.pixels()[10 * 320 + 10], 0xF800);
//! ```

use core::convert::Infallible;
use embedded_graphics_core::{
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Point, Size},
    pixelcolor::{IntoStorage, Rgb565},
    prelude::Pixel,
};

use crate::config::Geometry;
use crate::error::Error;

/// RGB565 pixel buffer for one frame
///
/// ## Type Parameters
///
/// * `S` - Storage implementing `AsRef<[u16]> + AsMut<[u16]>`, one word per
///   pixel in row-major order
pub struct FrameBuffer<S> {
    /// Pixel storage
    storage: S,
    /// Frame geometry
    geometry: Geometry,
}

impl<S> FrameBuffer<S>
where
    S: AsRef<[u16]> + AsMut<[u16]>,
{
    /// Wrap `storage` as a frame of `geometry`
    ///
    /// # Errors
    ///
    /// Returns [`Error::GeometryMismatch`] unless `storage` holds exactly one
    /// frame.
    pub fn new(storage: S, geometry: Geometry) -> Result<Self, Error> {
        let expected = geometry.pixel_count();
        let provided = storage.as_ref().len();
        if provided != expected {
            return Err(Error::GeometryMismatch { expected, provided });
        }
        Ok(Self { storage, geometry })
    }

    /// Fill the whole frame with `color`
    pub fn clear(&mut self, color: Rgb565) {
        self.storage.as_mut().fill(color.into_storage());
    }

    /// Pixels in row-major order, ready for presenting
    pub fn pixels(&self) -> &[u16] {
        self.storage.as_ref()
    }

    /// Frame geometry
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Release the storage
    pub fn into_inner(self) -> S {
        self.storage
    }
}

impl<S> DrawTarget for FrameBuffer<S>
where
    S: AsRef<[u16]> + AsMut<[u16]>,
{
    type Color = Rgb565;
    type Error = Infallible;

    fn draw_iter<Iter>(&mut self, pixels: Iter) -> Result<(), Self::Error>
    where
        Iter: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let width = usize::from(self.geometry.width);
        let height = usize::from(self.geometry.height);
        let buffer = self.storage.as_mut();

        for Pixel(Point { x, y }, color) in pixels {
            if x < 0 || y < 0 {
                continue;
            }

            let (x, y) = (x as usize, y as usize);
            if x >= width || y >= height {
                continue;
            }

            buffer[y * width + x] = color.into_storage();
        }

        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        FrameBuffer::clear(self, color);
        Ok(())
    }
}

impl<S> OriginDimensions for FrameBuffer<S>
where
    S: AsRef<[u16]> + AsMut<[u16]>,
{
    fn size(&self) -> Size {
        Size::new(
            u32::from(self.geometry.width),
            u32::from(self.geometry.height),
        )
    }
}
