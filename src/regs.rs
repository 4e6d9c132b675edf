//! Peripheral register map for the F1C100s display path
//!
//! This module holds every silicon-specific constant the pipeline touches:
//! block base addresses, register offsets and bit positions for the clock
//! controller (CCM), the DMA engine, the GPIO controller (port D) and the
//! timing controller (TCON). Porting to different silicon means replacing
//! the constants in this file; the algorithms elsewhere do not change.
//!
//! Register access goes through the [`RegisterAccess`] trait so the same
//! sequencing code runs against real memory-mapped I/O
//! ([`Mmio`](crate::mmio::Mmio)) or a recording mock in tests.
//!
//! ## Example
//!
//! ```
//! use r61520_slcd::regs::{gpio, Block, RegisterAccess, RegisterMap};
//!
//! # struct Fake([u32; 64]);
//! # impl RegisterAccess for Fake {
//! #     fn read(&mut self, addr: u32) -> u32 { self.0[((addr & 0xff) / 4) as usize] }
//! #     fn write(&mut self, addr: u32, value: u32) { self.0[((addr & 0xff) / 4) as usize] = value; }
//! # }
//! let mut regs = RegisterMap::new(Fake([0; 64]));
//! regs.write(Block::Gpio, gpio::PD_DATA, 0xFFFF_FFFF);
//! regs.clear_bits(Block::Gpio, gpio::PD_DATA, 1 << 18);
//! assert_eq!(regs.read(Block::Gpio, gpio::PD_DATA), 0xFFFB_FFFF);
//! ```

/// Raw 32-bit register access at absolute physical addresses
///
/// Implementations must perform each call as exactly one bus access, in
/// program order. Register access on this SoC cannot fail, so there is no
/// error type.
pub trait RegisterAccess {
    /// Read the 32-bit register at `addr`
    fn read(&mut self, addr: u32) -> u32;

    /// Write `value` to the 32-bit register at `addr`
    fn write(&mut self, addr: u32, value: u32);
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &mut T {
    fn read(&mut self, addr: u32) -> u32 {
        (**self).read(addr)
    }

    fn write(&mut self, addr: u32, value: u32) {
        (**self).write(addr, value);
    }
}

/// Peripheral blocks used by the display pipeline
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Block {
    /// Clock control module (clock gates, soft resets, special clocks)
    Ccm,
    /// DMA controller (normal and dedicated channels)
    Dma,
    /// GPIO controller
    Gpio,
    /// Timing controller (TCON0 drives the LCD interface)
    Tcon,
}

impl Block {
    /// Physical base address of the block
    pub const fn base(self) -> u32 {
        match self {
            Self::Ccm => CCM_BASE,
            Self::Dma => DMA_BASE,
            Self::Gpio => GPIO_BASE,
            Self::Tcon => TCON_BASE,
        }
    }

    /// Absolute physical address of `offset` within the block
    pub const fn addr(self, offset: u32) -> u32 {
        self.base() + offset
    }
}

/// DMA controller base address
pub const DMA_BASE: u32 = 0x01C0_2000;
/// Timing controller base address
pub const TCON_BASE: u32 = 0x01C0_C000;
/// Clock control module base address
pub const CCM_BASE: u32 = 0x01C2_0000;
/// GPIO controller base address
pub const GPIO_BASE: u32 = 0x01C2_0800;

/// Clock control module registers
pub mod ccm {
    /// Bus clock gating register 0
    pub const BUS_CLK_GATING0: u32 = 0x060;
    /// Bus clock gating register 1
    pub const BUS_CLK_GATING1: u32 = 0x064;
    /// Display back-end special clock
    pub const DEBE_CLK: u32 = 0x104;
    /// Display front-end special clock
    pub const DEFE_CLK: u32 = 0x10C;
    /// TCON special clock
    pub const TCON_CLK: u32 = 0x118;
    /// Bus soft reset register 0 (bit set = reset released)
    pub const BUS_SOFT_RST0: u32 = 0x2C0;
    /// Bus soft reset register 1 (bit set = reset released)
    pub const BUS_SOFT_RST1: u32 = 0x2C4;

    /// DMA bit in gating/reset register 0
    pub const DMA_GATE: u32 = 1 << 6;
    /// LCD (TCON) bit in gating/reset register 1
    pub const LCD_GATE: u32 = 1 << 4;
    /// Special clock enable bit
    pub const SCLK_GATING: u32 = 1 << 31;
    /// TCON clock gate field (four gates at bits 28..31)
    pub const TCON_CLK_GATES: u32 = 0xF << 28;
}

/// DMA controller registers
///
/// The dedicated channels (DDMA0..DDMA3) are laid out at a 0x20 stride
/// starting at [`DDMA_BASE`](dma::DDMA_BASE).
pub mod dma {
    /// Interrupt enable register
    pub const INT_CTRL: u32 = 0x00;
    /// Interrupt status register (write 1 to clear)
    pub const INT_STA: u32 = 0x04;

    /// First dedicated channel register block
    pub const DDMA_BASE: u32 = 0x300;
    /// Stride between dedicated channel blocks
    pub const DDMA_STRIDE: u32 = 0x20;
    /// Channel configuration register (within a channel block)
    pub const DDMA_CFG: u32 = 0x00;
    /// Channel source address register
    pub const DDMA_SRC: u32 = 0x04;
    /// Channel destination address register
    pub const DDMA_DES: u32 = 0x08;
    /// Channel byte count register
    pub const DDMA_BYTE_CNT: u32 = 0x0C;
    /// Channel parameter register
    pub const DDMA_PAR: u32 = 0x18;

    /// Load/enable bit of the channel configuration register
    pub const CFG_LOADING: u32 = 1 << 31;
    /// Busy bit of the channel configuration register
    pub const CFG_BUSY: u32 = 1 << 30;

    /// Fixed transfer mode for SDRAM -> GPIO streaming
    ///
    /// Source: SDRAM request, linear addressing, 32-bit width.
    /// Destination: IO (fixed) addressing, 32-bit width.
    pub const TRANSFER_MODE: u32 = 0x0229_0201;

    /// Half-transfer interrupt bit of dedicated channel `n`
    pub const fn half_done(n: u32) -> u32 {
        1 << (16 + 2 * n)
    }

    /// Full-transfer interrupt bit of dedicated channel `n`
    pub const fn full_done(n: u32) -> u32 {
        1 << (17 + 2 * n)
    }
}

/// GPIO port D registers and the bus pin wiring
pub mod gpio {
    /// Port D configuration register 0 (pins 0..7)
    pub const PD_CFG0: u32 = 0x6C;
    /// Port D configuration register 1 (pins 8..15)
    pub const PD_CFG1: u32 = 0x70;
    /// Port D configuration register 2 (pins 16..21)
    pub const PD_CFG2: u32 = 0x74;
    /// Port D data register (the DMA destination)
    pub const PD_DATA: u32 = 0x7C;
    /// Port D drive strength register 0
    pub const PD_DRV0: u32 = 0x80;
    /// Port D drive strength register 1
    pub const PD_DRV1: u32 = 0x84;
    /// Port D pull register 0
    pub const PD_PUL0: u32 = 0x88;
    /// Port D pull register 1
    pub const PD_PUL1: u32 = 0x8C;

    /// Output mode for all eight pins of a configuration register
    pub const CFG_OUTPUT_ALL: u32 = 0x1111_1111;
    /// Output mode for pins 16..21
    pub const CFG2_OUTPUT: u32 = 0x0011_1111;
    /// Pull-up/down disabled on every pin
    pub const PULL_NONE: u32 = 0x0000_0000;
    /// Maximum drive strength on every pin
    pub const DRIVE_MAX: u32 = 0xFFFF_FFFF;
    /// Data register value with every line idle-high
    pub const DATA_IDLE: u32 = 0xFFFF_FFFF;

    /// Shift applied to the low data byte (pins 1..8)
    pub const DATA_LOW_SHIFT: u32 = 1;
    /// Shift applied to the high data byte, in place (pins 10..17)
    pub const DATA_HIGH_SHIFT: u32 = 2;
    /// Write strobe, latched on the low -> high edge (pin 18)
    pub const WR: u32 = 1 << 18;
    /// Register select: set for data, clear for command (pin 19)
    pub const RS: u32 = 1 << 19;
    /// Read strobe, held high while writing (pin 20)
    pub const RD: u32 = 1 << 20;
}

/// Timing controller registers
pub mod tcon {
    /// Global control register
    pub const CTRL: u32 = 0x000;
    /// Interrupt register 0
    pub const INT0: u32 = 0x004;
    /// TCON0 control register
    pub const TCON0_CTRL: u32 = 0x040;
    /// TCON0 basic timing 0 (active size)
    pub const TCON0_BASIC0: u32 = 0x048;
    /// TCON0 basic timing 1 (horizontal total / back porch)
    pub const TCON0_BASIC1: u32 = 0x04C;
    /// TCON0 basic timing 2 (vertical total / back porch)
    pub const TCON0_BASIC2: u32 = 0x050;
    /// TCON0 basic timing 3 (sync pulse widths)
    pub const TCON0_BASIC3: u32 = 0x054;
    /// TCON0 HV interface timing
    pub const TCON0_HV_TIMING: u32 = 0x058;
    /// TCON0 CPU interface control
    pub const TCON0_CPU_IF: u32 = 0x060;
    /// TCON0 IO control 0
    pub const TCON0_IO_CTRL0: u32 = 0x088;
    /// TCON0 IO control 1
    pub const TCON0_IO_CTRL1: u32 = 0x08C;

    /// Module enable bit of the global control register
    pub const CTRL_ENABLE: u32 = 1 << 31;
    /// Output select bit of the global control register (clear = TCON0)
    pub const CTRL_IO_MAP_TCON1: u32 = 1 << 0;
    /// TCON0 enable bit
    pub const TCON0_ENABLE: u32 = 1 << 31;
    /// TCON0 interface select: 8080 CPU interface
    pub const TCON0_IF_CPU: u32 = 0x1 << 24;
    /// CPU interface mode: 8-bit 65k colors, two cycles per pixel
    pub const CPU_IF_MODE_8BIT_65K: u32 = 0x7 << 29;
    /// CPU interface flash-mode select
    pub const CPU_IF_FLASH: u32 = 1 << 26;
    /// IO control 0: DCLK polarity
    pub const IO_CTRL0_DCLK: u32 = 1 << 28;
}

/// Typed view over the four peripheral blocks
///
/// Constructed once at bring-up and then borrowed by every component that
/// touches hardware. All helpers are plain read, write, and read-modify-write
/// operations; the map keeps no state of its own.
#[derive(Debug)]
pub struct RegisterMap<R> {
    /// Backend performing the actual bus accesses
    access: R,
}

impl<R: RegisterAccess> RegisterMap<R> {
    /// Wrap a register backend
    pub fn new(access: R) -> Self {
        Self { access }
    }

    /// Read a register
    pub fn read(&mut self, block: Block, offset: u32) -> u32 {
        self.access.read(block.addr(offset))
    }

    /// Write a register
    pub fn write(&mut self, block: Block, offset: u32, value: u32) {
        self.access.write(block.addr(offset), value);
    }

    /// Read-modify-write a register
    pub fn modify<F>(&mut self, block: Block, offset: u32, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(block, offset);
        self.write(block, offset, f(value));
    }

    /// Set `bits` in a register
    pub fn set_bits(&mut self, block: Block, offset: u32, bits: u32) {
        self.modify(block, offset, |v| v | bits);
    }

    /// Clear `bits` in a register
    pub fn clear_bits(&mut self, block: Block, offset: u32, bits: u32) {
        self.modify(block, offset, |v| v & !bits);
    }

    /// Borrow the register backend
    pub fn access(&self) -> &R {
        &self.access
    }

    /// Mutably borrow the register backend
    pub fn access_mut(&mut self) -> &mut R {
        &mut self.access
    }

    /// Release the register backend
    pub fn into_inner(self) -> R {
        self.access
    }
}
