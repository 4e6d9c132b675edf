//! The two halves of a running pipeline
//!
//! Once armed, the pipeline is driven from two contexts:
//!
//! - [`FrameProducer`] runs in ordinary task context. It encodes new
//!   content into an idle transfer buffer and publishes it as pending.
//! - [`FrameCompletionHandler`] runs in the DMA interrupt. It acknowledges
//!   the completion, swaps in the pending buffer if there is one, and
//!   re-arms the channel.
//!
//! The halves share nothing but [`FrameSlots`] and a completion counter,
//! both atomics. The producer only ever writes buffers that are neither
//! armed nor pending; the handler only ever reads buffer addresses. A swap
//! therefore takes effect exactly at a frame boundary.
//!
//! The handler is assumed to run to completion with respect to the
//! producer, as an interrupt on a single core does.

use core::sync::atomic::{AtomicU32, Ordering};

use log::{trace, warn};

use crate::config::Geometry;
use crate::dma::{Channel, DmaChannelSet};
use crate::encoder::encode_frame;
use crate::error::Error;
use crate::pool::{DmaBuffer, FrameSlots, next_idle};
use crate::regs::{RegisterAccess, RegisterMap};

/// Task-context half: encodes and publishes frames
pub struct FrameProducer<'a, B, const N: usize> {
    buffers: &'a mut [B; N],
    slots: &'a FrameSlots,
    geometry: Geometry,
    cursor: &'a mut usize,
}

impl<'a, B: DmaBuffer, const N: usize> FrameProducer<'a, B, N> {
    pub(crate) fn new(
        buffers: &'a mut [B; N],
        slots: &'a FrameSlots,
        geometry: Geometry,
        cursor: &'a mut usize,
    ) -> Self {
        Self {
            buffers,
            slots,
            geometry,
            cursor,
        }
    }

    /// Encode `pixels` and queue them for the next frame boundary
    ///
    /// Never blocks. A frame still pending from an earlier call is dropped
    /// in favor of this one. Returns the index of the buffer filled.
    ///
    /// # Errors
    ///
    /// `Error::GeometryMismatch` if `pixels` is not exactly one frame. The
    /// pending frame, if any, is left in place.
    pub fn submit(&mut self, pixels: &[u16]) -> Result<usize, Error> {
        let expected = self.geometry.pixel_count();
        if pixels.len() != expected {
            return Err(Error::GeometryMismatch {
                expected,
                provided: pixels.len(),
            });
        }

        if let Some(dropped) = self.slots.take_pending() {
            warn!("frame in buffer {dropped} superseded before it was shown");
        }
        let index = next_idle(*self.cursor, N, self.slots.armed());
        encode_frame(pixels, self.geometry, self.buffers[index].as_words_mut())?;
        *self.cursor = index;
        // Nothing else publishes, and the slot was emptied above
        let _ = self.slots.publish(index);
        Ok(index)
    }

    /// Encode the visible window of a taller virtual screen
    ///
    /// `vram` is read as a virtual screen one panel width wide. `yoffset`
    /// selects the first visible line and is clamped so the window stays
    /// inside `vram`.
    ///
    /// # Errors
    ///
    /// `Error::GeometryMismatch` if `vram` is shorter than one frame or not
    /// a whole number of lines.
    pub fn submit_panned(&mut self, vram: &[u16], yoffset: usize) -> Result<usize, Error> {
        let width = usize::from(self.geometry.width);
        let height = usize::from(self.geometry.height);
        let frame = self.geometry.pixel_count();
        if vram.len() < frame || vram.len() % width != 0 {
            return Err(Error::GeometryMismatch {
                expected: frame,
                provided: vram.len(),
            });
        }

        let lines = vram.len() / width;
        let top = yoffset.min(lines - height);
        self.submit(&vram[top * width..(top + height) * width])
    }

    /// Whether a submitted frame is still waiting for a frame boundary
    pub fn is_frame_pending(&self) -> bool {
        self.slots.is_pending()
    }
}

/// Interrupt-context half: acknowledges and re-arms
pub struct FrameCompletionHandler<'a, R, const N: usize> {
    regs: &'a mut RegisterMap<R>,
    dma: &'a mut DmaChannelSet,
    slots: &'a FrameSlots,
    channel: Channel,
    phys: &'a [u32; N],
    words: usize,
    completions: &'a AtomicU32,
}

impl<'a, R: RegisterAccess, const N: usize> FrameCompletionHandler<'a, R, N> {
    pub(crate) fn new(
        regs: &'a mut RegisterMap<R>,
        dma: &'a mut DmaChannelSet,
        slots: &'a FrameSlots,
        channel: Channel,
        phys: &'a [u32; N],
        words: usize,
        completions: &'a AtomicU32,
    ) -> Self {
        Self {
            regs,
            dma,
            slots,
            channel,
            phys,
            words,
            completions,
        }
    }

    /// Handle a DMA interrupt
    ///
    /// The interrupt line is shared by every DMA channel, so nothing is
    /// touched unless this channel's full-transfer bit is set. Otherwise
    /// the completion is acknowledged before any write, and the channel is
    /// re-armed on the pending buffer, or on the same buffer again when
    /// nothing new was submitted.
    ///
    /// Returns the index now armed, or `None` if the interrupt was not a
    /// completion of this channel and should be reported as unhandled.
    pub fn on_interrupt(&mut self) -> Option<usize> {
        if !self.dma.is_complete(self.regs, self.channel) {
            return None;
        }

        let pending = self.slots.pending();
        let next = pending.unwrap_or_else(|| self.slots.armed());
        if !self
            .dma
            .clear_and_rearm(self.regs, self.channel, self.phys[next], self.words)
        {
            return None;
        }
        if let Some(index) = pending {
            // The producer cannot run until this returns, so the slot
            // still holds `index`
            let _ = self.slots.take_pending();
            self.slots.mark_armed(index);
        }

        self.completions.fetch_add(1, Ordering::Relaxed);
        trace!("re-armed buffer {next}");
        Some(next)
    }

    /// Completions handled so far
    pub fn completions(&self) -> u32 {
        self.completions.load(Ordering::Relaxed)
    }
}
