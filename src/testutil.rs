//! Shared test doubles for register access, DMA memory, delays and IRQs

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::dma::Channel;
use crate::error::AllocError;
use crate::pipeline::InterruptLine;
use crate::pool::{DmaAllocator, DmaBuffer};
use crate::regs::{self, Block, RegisterAccess};

/// One recorded bus access
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read(u32, u32),
    Write(u32, u32),
}

/// Register file that records every access in order
///
/// The DMA interrupt status register behaves as write-one-to-clear.
#[derive(Debug, Default)]
pub struct RecordingBus {
    pub log: Vec<Access>,
    pub regs: BTreeMap<u32, u32>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set bits as the hardware would, without logging an access
    pub fn raise(&mut self, block: Block, offset: u32, bits: u32) {
        let addr = block.addr(offset);
        let value = self.regs.get(&addr).copied().unwrap_or(0);
        self.regs.insert(addr, value | bits);
    }

    /// Clear bits as the hardware would, without logging an access
    pub fn lower(&mut self, block: Block, offset: u32, bits: u32) {
        let addr = block.addr(offset);
        let value = self.regs.get(&addr).copied().unwrap_or(0);
        self.regs.insert(addr, value & !bits);
    }

    pub fn value(&self, block: Block, offset: u32) -> u32 {
        self.regs.get(&block.addr(offset)).copied().unwrap_or(0)
    }

    /// Values written to one register, in order
    pub fn writes_to(&self, block: Block, offset: u32) -> Vec<u32> {
        let addr = block.addr(offset);
        self.log
            .iter()
            .filter_map(|access| match access {
                Access::Write(a, v) if *a == addr => Some(*v),
                _ => None,
            })
            .collect()
    }

    /// Log position of the first write to a register
    pub fn first_write(&self, block: Block, offset: u32) -> Option<usize> {
        let addr = block.addr(offset);
        self.log
            .iter()
            .position(|access| matches!(access, Access::Write(a, _) if *a == addr))
    }

    /// Log position of the last write to a register
    pub fn last_write(&self, block: Block, offset: u32) -> Option<usize> {
        let addr = block.addr(offset);
        self.log
            .iter()
            .rposition(|access| matches!(access, Access::Write(a, _) if *a == addr))
    }

    /// End the transfer on `channel` as the hardware would: the channel
    /// goes idle and both of its status bits are raised
    pub fn finish_frame(&mut self, channel: Channel) {
        self.lower(
            Block::Dma,
            channel.reg(regs::dma::DDMA_CFG),
            regs::dma::CFG_LOADING | regs::dma::CFG_BUSY,
        );
        self.raise(Block::Dma, regs::dma::INT_STA, channel.status_bits());
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }
}

impl RegisterAccess for RecordingBus {
    fn read(&mut self, addr: u32) -> u32 {
        let value = self.regs.get(&addr).copied().unwrap_or(0);
        self.log.push(Access::Read(addr, value));
        value
    }

    fn write(&mut self, addr: u32, value: u32) {
        self.log.push(Access::Write(addr, value));
        if addr == Block::Dma.addr(regs::dma::INT_STA) {
            let old = self.regs.get(&addr).copied().unwrap_or(0);
            self.regs.insert(addr, old & !value);
        } else {
            self.regs.insert(addr, value);
        }
    }
}

/// Heap-backed stand-in for coherent DMA memory
#[derive(Debug)]
pub struct MockBuffer {
    pub phys: u32,
    pub words: Vec<u32>,
}

impl DmaBuffer for MockBuffer {
    fn phys_addr(&self) -> u32 {
        self.phys
    }

    fn as_words(&self) -> &[u32] {
        &self.words
    }

    fn as_words_mut(&mut self) -> &mut [u32] {
        &mut self.words
    }
}

/// Allocator that counts live buffers and can fail or come up one word
/// short on the n-th request
#[derive(Debug, Default)]
pub struct MockAllocator {
    pub live: usize,
    pub requests: usize,
    pub released: Vec<u32>,
    pub fail_at: Option<usize>,
    pub short: Option<usize>,
}

impl MockAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(request: usize) -> Self {
        Self {
            fail_at: Some(request),
            ..Self::default()
        }
    }

    pub fn short_at(request: usize) -> Self {
        Self {
            short: Some(request),
            ..Self::default()
        }
    }
}

impl DmaAllocator for MockAllocator {
    type Buffer = MockBuffer;

    fn allocate(&mut self, words: usize) -> Result<MockBuffer, AllocError> {
        let request = self.requests;
        self.requests += 1;
        if self.fail_at == Some(request) {
            return Err(AllocError {
                index: request,
                words,
            });
        }
        let len = if self.short == Some(request) {
            words - 1
        } else {
            words
        };
        self.live += 1;
        // Poison the memory so tests notice a missing clear
        Ok(MockBuffer {
            phys: 0x8100_0000 + (request as u32) * 0x0010_0000,
            words: vec![0xDEAD_BEEF; len],
        })
    }

    fn release(&mut self, buffer: MockBuffer) {
        self.live -= 1;
        self.released.push(buffer.phys);
    }
}

/// Delay that only adds up the time requested
#[derive(Debug, Default)]
pub struct MockDelay {
    pub total_ns: u64,
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

#[derive(Debug, Default)]
pub struct MockIrq {
    pub enabled: Option<u32>,
    pub events: Vec<(bool, u32)>,
}

impl InterruptLine for MockIrq {
    fn enable(&mut self, irq: u32) {
        self.enabled = Some(irq);
        self.events.push((true, irq));
    }

    fn disable(&mut self, irq: u32) {
        self.enabled = None;
        self.events.push((false, irq));
    }
}
