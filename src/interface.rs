//! Processor-driven access to the panel bus
//!
//! Before the DMA engine takes over, the initialization sequence is clocked
//! out by the processor itself: each command or parameter is encoded into
//! its strobe pair and written to the port data register one word at a
//! time. [`PinBus`] does exactly that.
//!
//! The [`PanelInterface`] trait abstracts the bus so initialization
//! sequences can be replayed against anything that accepts commands and
//! parameter words.
//!
//! ## Example
//!
//! ```
//! use r61520_slcd::command::{self, InitStep};
//! use r61520_slcd::interface::{PanelInterface, PinBus};
//! use r61520_slcd::regs::{RegisterAccess, RegisterMap};
//! # struct Sink(u32);
//! # impl RegisterAccess for Sink {
//! #     fn read(&mut self, _addr: u32) -> u32 { self.0 }
//! #     fn write(&mut self, _addr: u32, value: u32) { self.0 = value; }
//! # }
//! # struct NoDelay;
//! # impl embedded_hal::delay::DelayNs for NoDelay { fn delay_ns(&mut self, _ns: u32) {} }
//! let mut regs = RegisterMap::new(Sink(0));
//! let mut bus = PinBus::new(&mut regs);
//!
//! let _ = bus.send_command(command::SET_PIXEL_FORMAT);
//! let _ = bus.send_data(&[command::PIXEL_FORMAT_16BPP]);
//! let _ = bus.run(&[InitStep::Command(command::SET_DISPLAY_ON)], &mut NoDelay);
//! ```

use core::convert::Infallible;
use core::fmt::Debug;

use embedded_hal::delay::DelayNs;
use log::trace;

use crate::command::InitStep;
use crate::encoder::{TransactionWord, encode_command, encode_data};
use crate::regs::{Block, RegisterAccess, RegisterMap, gpio};

/// Anything that can latch commands and parameter words into the panel
pub trait PanelInterface {
    /// Error type for bus operations
    ///
    /// Must implement [`Debug`] for error reporting.
    type Error: Debug;

    /// Latch a command byte (register select low)
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying bus fails.
    fn send_command(&mut self, command: u8) -> Result<(), Self::Error>;

    /// Latch parameter or pixel words (register select high)
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying bus fails.
    fn send_data(&mut self, data: &[u16]) -> Result<(), Self::Error>;

    /// Replay an initialization sequence
    ///
    /// # Errors
    ///
    /// Stops at the first failing step and returns its error.
    fn run<D: DelayNs>(&mut self, steps: &[InitStep], delay: &mut D) -> Result<(), Self::Error> {
        for step in steps {
            match *step {
                InitStep::Command(command) => self.send_command(command)?,
                InitStep::Data(word) => self.send_data(&[word])?,
                InitStep::DelayMs(ms) => delay.delay_ms(ms),
            }
        }
        Ok(())
    }
}

/// Bit-banged bus over GPIO port D
///
/// Each bus write costs two register writes: strobe low, then strobe high.
/// Register access cannot fail, so the error type is [`Infallible`].
pub struct PinBus<'a, R> {
    /// Register map the data register lives in
    regs: &'a mut RegisterMap<R>,
}

impl<'a, R: RegisterAccess> PinBus<'a, R> {
    /// Borrow the register map for processor-driven bus writes
    ///
    /// Port D must already be configured as outputs.
    pub fn new(regs: &'a mut RegisterMap<R>) -> Self {
        Self { regs }
    }

    fn write_pair(&mut self, pair: [TransactionWord; 2]) {
        for word in pair {
            self.regs.write(Block::Gpio, gpio::PD_DATA, word);
        }
    }
}

impl<R: RegisterAccess> PanelInterface for PinBus<'_, R> {
    type Error = Infallible;

    fn send_command(&mut self, command: u8) -> Result<(), Self::Error> {
        trace!("cmd {command:#04x}");
        self.write_pair(encode_command(command));
        Ok(())
    }

    fn send_data(&mut self, data: &[u16]) -> Result<(), Self::Error> {
        for &word in data {
            self.write_pair(encode_data(word));
        }
        Ok(())
    }
}
