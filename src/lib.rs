//! R61520 SLCD DMA Display Driver
//!
//! A driver that refreshes a Renesas R61520 panel from an Allwinner F1C100s
//! with no CPU involvement once running. The panel's 16-bit 8080 bus is
//! wired to GPIO port D; a dedicated DMA channel emulates the bus by
//! streaming pre-encoded port words into the port data register, and its
//! completion interrupt re-arms the transfer forever.
//!
//! ## Features
//!
//! - `no_std` compatible
//! - `embedded-hal` v1.0 delays during bring-up
//! - `embedded-graphics` integration (with `graphics` feature)
//! - Pluggable register backend ([`RegisterAccess`]) and DMA memory
//!   ([`DmaAllocator`]), so everything runs against mocks on the host
//! - Lock-free frame swapping at frame boundaries
//!
//! ## Usage
//!
//! ```rust,no_run
//! use r61520_slcd::{AllocError, Builder, DmaAllocator, DmaBuffer, InterruptLine, Mmio};
//! use r61520_slcd::{Pipeline, RegisterMap};
//! # use embedded_hal::delay::DelayNs;
//! # struct Uncached { phys: u32, words: &'static mut [u32] }
//! # impl DmaBuffer for Uncached {
//! #     fn phys_addr(&self) -> u32 { self.phys }
//! #     fn as_words(&self) -> &[u32] { &*self.words }
//! #     fn as_words_mut(&mut self) -> &mut [u32] { &mut *self.words }
//! # }
//! # struct Carveout;
//! # impl DmaAllocator for Carveout {
//! #     type Buffer = Uncached;
//! #     fn allocate(&mut self, words: usize) -> Result<Uncached, AllocError> {
//! #         Err(AllocError { index: 0, words })
//! #     }
//! #     fn release(&mut self, _buffer: Uncached) {}
//! # }
//! # struct Intc;
//! # impl InterruptLine for Intc {
//! #     fn enable(&mut self, _irq: u32) {}
//! #     fn disable(&mut self, _irq: u32) {}
//! # }
//! # struct Delay;
//! # impl DelayNs for Delay { fn delay_ns(&mut self, _ns: u32) {} }
//! # let (mut allocator, mut intc, mut delay) = (Carveout, Intc, Delay);
//! let config = match Builder::new().build() {
//!     Ok(config) => config,
//!     Err(_) => return,
//! };
//! let black = [0u16; 320 * 240];
//!
//! // SAFETY: peripherals are identity-mapped and owned by this driver
//! let regs = RegisterMap::new(unsafe { Mmio::new() });
//! let mut pipeline: Pipeline<_, _> =
//!     match Pipeline::bring_up(regs, &mut allocator, config, &black, &mut delay, &mut intc) {
//!         Ok(pipeline) => pipeline,
//!         Err(_) => return,
//!     };
//!
//! // From the DMA interrupt handler
//! let _ = pipeline.on_dma_complete();
//!
//! // Whenever the content changes
//! let _ = pipeline.present(&black);
//! ```

#![no_std]

#[cfg(any(test, feature = "alloc"))]
extern crate alloc;

/// Panel bring-up state machine and timing constants
pub mod bringup;
/// RGB565 pixel layout
pub mod color;
/// R61520 command definitions
pub mod command;
/// Pipeline configuration types and builder
pub mod config;
/// Dedicated DMA channel control
pub mod dma;
/// Pin protocol encoder
pub mod encoder;
/// Error types for the driver
pub mod error;
/// Producer and completion-handler halves
pub mod handler;
/// Processor-driven bus access
pub mod interface;
/// Volatile register backend
pub mod mmio;
/// Owning display pipeline
pub mod pipeline;
/// Transfer buffer pool and shared frame slots
pub mod pool;
/// Peripheral register map
pub mod regs;

/// Graphics support via embedded-graphics (requires `graphics` feature)
#[cfg(feature = "graphics")]
pub mod graphics;

#[cfg(test)]
mod testutil;

pub use bringup::{BringupState, PanelBringup, PanelTiming};
pub use color::PixelFormat;
pub use command::InitStep;
pub use config::{Builder, Config, DMA_IRQ, Geometry, MAX_HEIGHT, MAX_WIDTH, POOL_SIZE};
pub use dma::{Channel, ChannelState, DmaChannelSet};
pub use encoder::{TransactionWord, encode_command, encode_data, encode_frame};
pub use error::{AllocError, BuilderError, Error};
pub use handler::{FrameCompletionHandler, FrameProducer};
pub use interface::{PanelInterface, PinBus};
pub use mmio::Mmio;
pub use pipeline::{InterruptLine, Pipeline};
pub use pool::{DmaAllocator, DmaBuffer, FrameSlots, TransferBufferPool};
pub use regs::{Block, RegisterAccess, RegisterMap};

#[cfg(feature = "graphics")]
pub use graphics::FrameBuffer;
