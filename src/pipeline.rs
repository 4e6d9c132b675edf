//! The owning display pipeline
//!
//! [`Pipeline`] owns every piece of the display path: the register map,
//! the DMA channel set, the transfer buffer pool and the shared frame
//! slots. It is built fully armed by [`Pipeline::bring_up`] and taken apart
//! by [`Pipeline::shutdown`]; there is no half-initialized pipeline.
//!
//! In between, [`Pipeline::split`] hands out the two halves that run
//! concurrently: the task-context [`FrameProducer`] and the interrupt
//! context [`FrameCompletionHandler`]. The convenience methods
//! [`present`](Pipeline::present) and
//! [`on_dma_complete`](Pipeline::on_dma_complete) split on the fly for
//! callers that serialize the two contexts themselves, for example through
//! a critical section.
//!
//! ## Example
//!
//! ```ignore
//! let config = Builder::new().build()?;
//! let mut pipeline: Pipeline<_, _> = Pipeline::bring_up(
//!     RegisterMap::new(unsafe { Mmio::new() }),
//!     &mut allocator,
//!     config,
//!     &pixels,
//!     &mut delay,
//!     &mut irq,
//! )?;
//!
//! // DMA interrupt, line 18, shared with other channels
//! let handled = pipeline.on_dma_complete().is_some();
//!
//! // Content changed
//! pipeline.present(&pixels)?;
//! ```

use core::sync::atomic::{AtomicU32, Ordering};

use embedded_hal::delay::DelayNs;
use log::info;

use crate::bringup::{BringupState, PanelBringup};
use crate::color::PixelFormat;
use crate::config::{Config, POOL_SIZE};
use crate::dma::DmaChannelSet;
use crate::encoder::encode_frame;
use crate::error::Error;
use crate::handler::{FrameCompletionHandler, FrameProducer};
use crate::pool::{DmaAllocator, DmaBuffer, FrameSlots, TransferBufferPool};
use crate::regs::{RegisterAccess, RegisterMap};

/// Interrupt controller line the completion handler is attached to
///
/// The pipeline does not register the handler itself; the platform routes
/// the interrupt to [`Pipeline::on_dma_complete`] or to the split
/// [`FrameCompletionHandler`]. This trait only lets bring-up and teardown
/// unmask and mask the line at the right moment.
pub trait InterruptLine {
    /// Unmask interrupt `irq`
    fn enable(&mut self, irq: u32);

    /// Mask interrupt `irq`
    fn disable(&mut self, irq: u32);
}

/// A running DMA display pipeline with `N` transfer buffers
#[derive(Debug)]
pub struct Pipeline<R, B, const N: usize = POOL_SIZE> {
    regs: RegisterMap<R>,
    dma: DmaChannelSet,
    pool: TransferBufferPool<B, N>,
    phys: [u32; N],
    slots: FrameSlots,
    bringup: PanelBringup,
    config: Config,
    cursor: usize,
    completions: AtomicU32,
}

impl<R, B, const N: usize> Pipeline<R, B, N>
where
    R: RegisterAccess,
    B: DmaBuffer,
{
    /// Bring the hardware up and start streaming `pixels`
    ///
    /// Allocates the buffer pool, encodes the first frame into buffer 0,
    /// then runs every bring-up step in order and arms the DMA channel.
    /// The completion interrupt is unmasked just before the first arm.
    ///
    /// # Errors
    ///
    /// - `Error::GeometryMismatch` if `pixels` is not one frame; nothing is
    ///   allocated and no register is touched
    /// - `Error::Allocation` or `Error::BufferTooSmall` if the pool cannot
    ///   be built; every partial allocation has been released
    pub fn bring_up<A, D, I>(
        regs: RegisterMap<R>,
        allocator: &mut A,
        config: Config,
        pixels: &[u16],
        delay: &mut D,
        irq: &mut I,
    ) -> Result<Self, Error>
    where
        A: DmaAllocator<Buffer = B>,
        D: DelayNs,
        I: InterruptLine,
    {
        const { assert!(N >= 2, "a pipeline needs at least two transfer buffers") };

        let geometry = config.geometry;
        if pixels.len() != geometry.pixel_count() {
            return Err(Error::GeometryMismatch {
                expected: geometry.pixel_count(),
                provided: pixels.len(),
            });
        }

        let mut pool = TransferBufferPool::<B, N>::allocate(allocator, geometry.transfer_words())?;
        if let Err(err) = encode_frame(pixels, geometry, pool.buffers_mut()[0].as_words_mut()) {
            pool.release(allocator);
            return Err(err);
        }

        let mut pipeline = Self {
            regs,
            dma: DmaChannelSet::new(),
            phys: pool.phys_addrs(),
            pool,
            slots: FrameSlots::new(),
            bringup: PanelBringup::new(),
            config,
            cursor: 0,
            completions: AtomicU32::new(0),
        };

        if let Err(err) = pipeline.start(delay, irq) {
            let Self {
                mut regs,
                mut dma,
                pool,
                mut bringup,
                config,
                ..
            } = pipeline;
            dma.stop_all(&mut regs);
            irq.disable(config.dma_irq);
            pool.release(allocator);
            bringup.teardown(&mut regs, &mut dma);
            return Err(err);
        }

        info!(
            "{}x{} pipeline armed with {N} buffers",
            geometry.width, geometry.height
        );
        Ok(pipeline)
    }

    fn start<D, I>(&mut self, delay: &mut D, irq: &mut I) -> Result<(), Error>
    where
        D: DelayNs,
        I: InterruptLine,
    {
        self.bringup.enable_clocks(&mut self.regs)?;
        self.bringup.configure_pins(&mut self.regs)?;
        self.bringup
            .configure_timing(&mut self.regs, &self.config.timing)?;
        self.bringup
            .stream_init_sequence(&mut self.regs, self.config.init_sequence, delay)?;
        irq.enable(self.config.dma_irq);
        self.bringup.arm(
            &mut self.regs,
            &mut self.dma,
            self.config.channel,
            self.phys[0],
            self.config.geometry.transfer_words(),
        )
    }

    /// Borrow the producer and completion halves at once
    pub fn split(&mut self) -> (FrameProducer<'_, B, N>, FrameCompletionHandler<'_, R, N>) {
        let producer = FrameProducer::new(
            self.pool.buffers_mut(),
            &self.slots,
            self.config.geometry,
            &mut self.cursor,
        );
        let handler = FrameCompletionHandler::new(
            &mut self.regs,
            &mut self.dma,
            &self.slots,
            self.config.channel,
            &self.phys,
            self.config.geometry.transfer_words(),
            &self.completions,
        );
        (producer, handler)
    }

    /// Encode `pixels` and show them from the next frame boundary on
    ///
    /// # Errors
    ///
    /// `Error::GeometryMismatch` if `pixels` is not one frame.
    pub fn present(&mut self, pixels: &[u16]) -> Result<usize, Error> {
        self.split().0.submit(pixels)
    }

    /// Encode the window of `vram` starting at line `yoffset`
    ///
    /// # Errors
    ///
    /// `Error::GeometryMismatch` if `vram` is not a whole number of lines
    /// or shorter than one frame.
    pub fn present_panned(&mut self, vram: &[u16], yoffset: usize) -> Result<usize, Error> {
        self.split().0.submit_panned(vram, yoffset)
    }

    /// Run the completion handler
    ///
    /// Returns the buffer index now armed, or `None` if the interrupt was
    /// not a completion of this pipeline's channel.
    pub fn on_dma_complete(&mut self) -> Option<usize> {
        self.split().1.on_interrupt()
    }

    /// Whether a presented frame is still waiting for a frame boundary
    pub fn is_frame_pending(&self) -> bool {
        self.slots.is_pending()
    }

    /// Index of the buffer being streamed
    pub fn armed_buffer(&self) -> usize {
        self.slots.armed()
    }

    /// Completions handled since bring-up
    ///
    /// A counter that stops advancing means the display has stalled.
    pub fn frames_completed(&self) -> u32 {
        self.completions.load(Ordering::Relaxed)
    }

    /// Validate a requested video mode; see [`Config::check_mode`]
    ///
    /// # Errors
    ///
    /// `Error::UnsupportedMode` for anything but the configured mode.
    pub fn check_mode(
        &self,
        width: u16,
        height: u16,
        bits_per_pixel: u8,
    ) -> Result<PixelFormat, Error> {
        self.config.check_mode(width, height, bits_per_pixel)
    }

    /// Bring-up state; `Armed` for as long as the pipeline exists
    pub fn state(&self) -> BringupState {
        self.bringup.state()
    }

    /// Pipeline configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Transfer buffer pool
    pub fn pool(&self) -> &TransferBufferPool<B, N> {
        &self.pool
    }

    /// Register map
    pub fn registers(&self) -> &RegisterMap<R> {
        &self.regs
    }

    /// Stop streaming and release every resource
    ///
    /// Stops the DMA channels, masks the interrupt, returns the buffers to
    /// `allocator` and finally shuts the clocks down. The channels are
    /// already idle when the clocks go, so teardown does not stop them
    /// again. Hands back the register map.
    pub fn shutdown<A, I>(self, allocator: &mut A, irq: &mut I) -> RegisterMap<R>
    where
        A: DmaAllocator<Buffer = B>,
        I: InterruptLine,
    {
        let Self {
            mut regs,
            mut dma,
            pool,
            mut bringup,
            config,
            completions,
            ..
        } = self;

        dma.stop_all(&mut regs);
        irq.disable(config.dma_irq);
        pool.release(allocator);
        bringup.teardown(&mut regs, &mut dma);
        info!(
            "pipeline shut down after {} frames",
            completions.load(Ordering::Relaxed)
        );
        regs
    }
}
