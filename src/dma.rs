//! Dedicated DMA channels streaming transfer buffers to the pin bus
//!
//! Every channel is used the same way: source is a transfer buffer in
//! SDRAM, destination is the fixed GPIO port D data register, and the
//! control word never changes. Only the source address and length vary
//! between arms.
//!
//! ## Re-arm order
//!
//! [`DmaChannelSet::clear_and_rearm`] acknowledges the completion status
//! before anything else. The controller does not raise another completion
//! for a channel whose status bit is still set, so acknowledging after the
//! restart could lose the next frame's interrupt. It never reprograms a
//! channel that is still loading or busy.

use core::sync::atomic::{Ordering, fence};

use log::{debug, trace, warn};

use crate::pool::DmaBuffer;
use crate::regs::{Block, RegisterAccess, RegisterMap, dma, gpio};

/// Dedicated DMA channel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Channel {
    /// Dedicated channel 0
    #[default]
    Ddma0,
    /// Dedicated channel 1
    Ddma1,
    /// Dedicated channel 2
    Ddma2,
    /// Dedicated channel 3
    Ddma3,
}

impl Channel {
    /// Every dedicated channel, by index
    pub const ALL: [Self; 4] = [Self::Ddma0, Self::Ddma1, Self::Ddma2, Self::Ddma3];

    /// Channel number
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Offset of a channel register within the DMA block
    pub const fn reg(self, offset: u32) -> u32 {
        dma::DDMA_BASE + self.index() as u32 * dma::DDMA_STRIDE + offset
    }

    /// Full-transfer bit in the interrupt enable and status registers
    pub const fn done_bit(self) -> u32 {
        dma::full_done(self.index() as u32)
    }

    /// Both status bits (half and full transfer) of this channel
    pub const fn status_bits(self) -> u32 {
        dma::half_done(self.index() as u32) | dma::full_done(self.index() as u32)
    }
}

/// Last configuration programmed into a channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelState {
    /// Bus address of the transfer buffer
    pub source: u32,
    /// Always the pin data register
    pub destination: u32,
    /// Transfer length in bytes
    pub byte_count: u32,
    /// Transfer mode control word
    pub control: u32,
    /// Completion acknowledged but not yet re-armed
    pub irq_pending: bool,
}

/// Register-level driver for the dedicated DMA channels
///
/// Holds a shadow of each channel's configuration; all hardware access goes
/// through the borrowed [`RegisterMap`].
#[derive(Debug)]
pub struct DmaChannelSet {
    states: [Option<ChannelState>; 4],
}

impl DmaChannelSet {
    /// Address every channel writes to
    pub const DESTINATION: u32 = Block::Gpio.addr(gpio::PD_DATA);

    /// Create a channel set with no channel configured
    pub const fn new() -> Self {
        Self { states: [None; 4] }
    }

    /// Disable every DMA interrupt and clear all pending status
    pub fn reset_interrupts<R: RegisterAccess>(&mut self, regs: &mut RegisterMap<R>) {
        regs.write(Block::Dma, dma::INT_CTRL, 0);
        regs.write(Block::Dma, dma::INT_STA, 0xFFFF_FFFF);
    }

    /// Enable the full-transfer interrupt of `channel`
    pub fn enable_completion_irq<R: RegisterAccess>(
        &mut self,
        regs: &mut RegisterMap<R>,
        channel: Channel,
    ) {
        regs.set_bits(Block::Dma, dma::INT_CTRL, channel.done_bit());
    }

    /// Point `channel` at the first `words` words of `buffer`
    ///
    /// The channel must be idle. Allocators may hand out buffers longer
    /// than one frame, so the length is never taken from the buffer alone;
    /// it is clamped to what the buffer holds.
    pub fn configure<R, B>(
        &mut self,
        regs: &mut RegisterMap<R>,
        channel: Channel,
        buffer: &B,
        words: usize,
    ) where
        R: RegisterAccess,
        B: DmaBuffer + ?Sized,
    {
        let words = words.min(buffer.as_words().len());
        self.configure_raw(regs, channel, buffer.phys_addr(), words);
    }

    /// Point `channel` at `words` transaction words at bus address `source`
    pub fn configure_raw<R: RegisterAccess>(
        &mut self,
        regs: &mut RegisterMap<R>,
        channel: Channel,
        source: u32,
        words: usize,
    ) {
        let byte_count = (words * 4) as u32;
        regs.write(Block::Dma, channel.reg(dma::DDMA_CFG), dma::TRANSFER_MODE);
        regs.write(Block::Dma, channel.reg(dma::DDMA_PAR), 0);
        regs.write(Block::Dma, channel.reg(dma::DDMA_SRC), source);
        regs.write(Block::Dma, channel.reg(dma::DDMA_DES), Self::DESTINATION);
        regs.write(Block::Dma, channel.reg(dma::DDMA_BYTE_CNT), byte_count);

        let irq_pending = self.states[channel.index()].is_some_and(|s| s.irq_pending);
        self.states[channel.index()] = Some(ChannelState {
            source,
            destination: Self::DESTINATION,
            byte_count,
            control: dma::TRANSFER_MODE,
            irq_pending,
        });
        trace!("{channel:?} -> {source:#010x}, {byte_count} bytes");
    }

    /// Enable `channel`
    ///
    /// A channel that is already loading or busy is left alone, so calling
    /// this twice is harmless.
    pub fn start<R: RegisterAccess>(&mut self, regs: &mut RegisterMap<R>, channel: Channel) {
        let cfg = regs.read(Block::Dma, channel.reg(dma::DDMA_CFG));
        if cfg & (dma::CFG_LOADING | dma::CFG_BUSY) != 0 {
            return;
        }
        // Buffer contents must reach memory before the engine starts reading
        fence(Ordering::SeqCst);
        regs.write(
            Block::Dma,
            channel.reg(dma::DDMA_CFG),
            cfg | dma::CFG_LOADING,
        );
        if let Some(state) = self.states[channel.index()].as_mut() {
            state.irq_pending = false;
        }
    }

    /// Disable `channel` and its completion interrupt
    pub fn stop<R: RegisterAccess>(&mut self, regs: &mut RegisterMap<R>, channel: Channel) {
        regs.clear_bits(Block::Dma, dma::INT_CTRL, channel.done_bit());
        regs.clear_bits(Block::Dma, channel.reg(dma::DDMA_CFG), dma::CFG_LOADING);
        regs.write(Block::Dma, dma::INT_STA, channel.status_bits());
        self.states[channel.index()] = None;
        debug!("{channel:?} stopped");
    }

    /// Disable every channel
    pub fn stop_all<R: RegisterAccess>(&mut self, regs: &mut RegisterMap<R>) {
        for channel in Channel::ALL {
            self.stop(regs, channel);
        }
    }

    /// Disable the channels this set has configured and not yet stopped
    pub fn stop_active<R: RegisterAccess>(&mut self, regs: &mut RegisterMap<R>) {
        for channel in Channel::ALL {
            if self.states[channel.index()].is_some() {
                self.stop(regs, channel);
            }
        }
    }

    /// Whether `channel` has its full-transfer status bit set
    ///
    /// The controller raises one interrupt line for every channel, so the
    /// completion handler checks this before touching anything.
    pub fn is_complete<R: RegisterAccess>(
        &self,
        regs: &mut RegisterMap<R>,
        channel: Channel,
    ) -> bool {
        regs.read(Block::Dma, dma::INT_STA) & channel.done_bit() != 0
    }

    /// Clear the completion status of `channel`
    pub fn acknowledge<R: RegisterAccess>(&mut self, regs: &mut RegisterMap<R>, channel: Channel) {
        regs.write(Block::Dma, dma::INT_STA, channel.status_bits());
        if let Some(state) = self.states[channel.index()].as_mut() {
            state.irq_pending = true;
        }
    }

    /// Acknowledge completion, then restart `channel` on a buffer
    ///
    /// This is the steady-state operation run from the completion
    /// interrupt: acknowledge, configure, enable, in that order. A channel
    /// that still reports loading or busy is acknowledged but left alone,
    /// and `false` is returned.
    #[must_use]
    pub fn clear_and_rearm<R: RegisterAccess>(
        &mut self,
        regs: &mut RegisterMap<R>,
        channel: Channel,
        source: u32,
        words: usize,
    ) -> bool {
        self.acknowledge(regs, channel);
        if self.is_enabled(regs, channel) {
            warn!("{channel:?} still running, not re-armed");
            return false;
        }
        self.configure_raw(regs, channel, source, words);
        self.start(regs, channel);
        true
    }

    /// Whether the hardware reports `channel` as loading or busy
    pub fn is_enabled<R: RegisterAccess>(
        &self,
        regs: &mut RegisterMap<R>,
        channel: Channel,
    ) -> bool {
        regs.read(Block::Dma, channel.reg(dma::DDMA_CFG)) & (dma::CFG_LOADING | dma::CFG_BUSY) != 0
    }

    /// Last configuration programmed into `channel`
    pub fn state(&self, channel: Channel) -> Option<&ChannelState> {
        self.states[channel.index()].as_ref()
    }
}

impl Default for DmaChannelSet {
    fn default() -> Self {
        Self::new()
    }
}
