//! Volatile memory-mapped register backend

#![allow(unsafe_code)]

use core::ptr::{read_volatile, write_volatile};

use crate::regs::RegisterAccess;

/// Register access through volatile loads and stores
///
/// Physical addresses are translated by adding a fixed offset, which is
/// zero when the peripherals are identity-mapped (bare metal, MMU off).
#[derive(Debug)]
pub struct Mmio {
    offset: usize,
}

impl Mmio {
    /// Access registers at their physical addresses
    ///
    /// # Safety
    ///
    /// The CCM, DMA, GPIO and TCON register blocks must be identity-mapped
    /// as device memory, and nothing else may drive them concurrently.
    pub const unsafe fn new() -> Self {
        Self { offset: 0 }
    }

    /// Access registers through a mapping at `virt - phys` = `offset`
    ///
    /// # Safety
    ///
    /// Every register block used by the pipeline must be mapped as device
    /// memory at its physical address plus `offset`, and nothing else may
    /// drive it concurrently.
    pub const unsafe fn with_offset(offset: usize) -> Self {
        Self { offset }
    }

    #[inline]
    fn ptr(&self, addr: u32) -> *mut u32 {
        (addr as usize).wrapping_add(self.offset) as *mut u32
    }
}

impl RegisterAccess for Mmio {
    #[inline]
    fn read(&mut self, addr: u32) -> u32 {
        // SAFETY: mapping guaranteed by the constructor contract
        unsafe { read_volatile(self.ptr(addr)) }
    }

    #[inline]
    fn write(&mut self, addr: u32, value: u32) {
        // SAFETY: mapping guaranteed by the constructor contract
        unsafe { write_volatile(self.ptr(addr), value) }
    }
}
