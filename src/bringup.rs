//! One-shot hardware bring-up
//!
//! [`PanelBringup`] walks the hardware from reset to a running DMA stream:
//!
//! ```text
//! Unconfigured -> ClocksEnabled -> PinsConfigured -> TimingConfigured
//!              -> StreamingCommand -> Armed
//! ```
//!
//! Every step checks that it runs from the state directly before it and
//! returns [`Error::InvalidState`] otherwise, without touching a register.
//! [`teardown`](PanelBringup::teardown) is the only way back to
//! `Unconfigured`.

use embedded_hal::delay::DelayNs;
use log::{debug, info};

use crate::command::InitStep;
use crate::config::Geometry;
use crate::dma::{Channel, DmaChannelSet};
use crate::error::Error;
use crate::interface::{PanelInterface, PinBus};
use crate::regs::{Block, RegisterAccess, RegisterMap, ccm, gpio, tcon};

/// Bring-up progress
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum BringupState {
    /// Nothing configured yet, or torn down
    #[default]
    Unconfigured,
    /// Resets released, bus and special clocks running
    ClocksEnabled,
    /// Port D switched to bus output mode
    PinsConfigured,
    /// Timing controller programmed for the panel geometry
    TimingConfigured,
    /// Panel initialization sequence clocked out
    StreamingCommand,
    /// First DMA transfer running; steady state
    Armed,
}

impl BringupState {
    /// State that must precede this one
    const fn previous(self) -> Self {
        match self {
            Self::Unconfigured | Self::ClocksEnabled => Self::Unconfigured,
            Self::PinsConfigured => Self::ClocksEnabled,
            Self::TimingConfigured => Self::PinsConfigured,
            Self::StreamingCommand => Self::TimingConfigured,
            Self::Armed => Self::StreamingCommand,
        }
    }
}

/// Timing generator constants for a panel geometry
///
/// These are structural properties of the panel in 8080 CPU mode, not
/// tunables. In that mode every pixel takes three clocks per line, hence
/// the `3 * width` in the horizontal total.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelTiming {
    /// Active width in pixels
    pub width: u16,
    /// Active height in lines
    pub height: u16,
    /// Horizontal total, in clocks
    pub horizontal_total: u32,
    /// Horizontal back porch, in clocks
    pub horizontal_back_porch: u32,
    /// Vertical total, in half-lines
    pub vertical_total: u32,
    /// Vertical back porch, in lines
    pub vertical_back_porch: u32,
    /// TCON0 start delay (5 bits)
    pub start_delay: u32,
    /// TCON clock divisor
    pub clock_divider: u32,
}

impl PanelTiming {
    const BACK_PORCH: u32 = 1 + 31;
    const H_FRONT_PORCH: u32 = 40;
    const V_FRONT_PORCH: u32 = 13;

    /// Derive the timing constants for `geometry`
    pub const fn for_geometry(geometry: Geometry) -> Self {
        let width = geometry.width as u32;
        let height = geometry.height as u32;
        Self {
            width: geometry.width,
            height: geometry.height,
            horizontal_total: width * 3 + Self::H_FRONT_PORCH + Self::BACK_PORCH,
            horizontal_back_porch: Self::BACK_PORCH,
            vertical_total: height + Self::V_FRONT_PORCH + Self::BACK_PORCH,
            vertical_back_porch: Self::BACK_PORCH,
            start_delay: (Self::V_FRONT_PORCH + Self::BACK_PORCH) & 0x1F,
            clock_divider: 0xFF,
        }
    }

    /// TCON0 control word: enabled, CPU interface, start delay
    pub const fn tcon0_ctrl(&self) -> u32 {
        tcon::TCON0_ENABLE | ((self.start_delay & 0x1F) << 4) | tcon::TCON0_IF_CPU
    }

    /// TCON special clock word: all gates open, divisor
    pub const fn tcon_clk(&self) -> u32 {
        ccm::TCON_CLK_GATES | self.clock_divider
    }

    /// Basic timing 0: active size
    pub const fn basic0(&self) -> u32 {
        ((self.width as u32 - 1) << 16) | (self.height as u32 - 1)
    }

    /// Basic timing 1: horizontal total and back porch
    pub const fn basic1(&self) -> u32 {
        ((self.horizontal_total - 1) << 16) | (self.horizontal_back_porch - 1)
    }

    /// Basic timing 2: vertical total (doubled) and back porch
    pub const fn basic2(&self) -> u32 {
        ((self.vertical_total * 2) << 16) | (self.vertical_back_porch - 1)
    }
}

impl Default for PanelTiming {
    fn default() -> Self {
        Self::for_geometry(Geometry::PANEL)
    }
}

/// Bring-up sequencer
///
/// Holds only the current [`BringupState`]; hardware is reached through
/// the register map passed to each step.
#[derive(Debug, Default)]
pub struct PanelBringup {
    state: BringupState,
}

impl PanelBringup {
    /// Sequencer in the `Unconfigured` state
    pub const fn new() -> Self {
        Self {
            state: BringupState::Unconfigured,
        }
    }

    /// Current state
    pub const fn state(&self) -> BringupState {
        self.state
    }

    fn require(&self, next: BringupState) -> Result<(), Error> {
        let expected = next.previous();
        if self.state != expected {
            return Err(Error::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn advance(&mut self, next: BringupState) {
        debug!("bring-up {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Release resets and open the clock gates of the DMA and LCD blocks
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` unless `Unconfigured`.
    pub fn enable_clocks<R: RegisterAccess>(
        &mut self,
        regs: &mut RegisterMap<R>,
    ) -> Result<(), Error> {
        self.require(BringupState::ClocksEnabled)?;

        regs.set_bits(Block::Ccm, ccm::BUS_SOFT_RST0, ccm::DMA_GATE);
        regs.set_bits(Block::Ccm, ccm::BUS_CLK_GATING0, ccm::DMA_GATE);
        regs.set_bits(Block::Ccm, ccm::BUS_SOFT_RST1, ccm::LCD_GATE);
        regs.set_bits(Block::Ccm, ccm::BUS_CLK_GATING1, ccm::LCD_GATE);
        for clk in [ccm::DEFE_CLK, ccm::DEBE_CLK, ccm::TCON_CLK] {
            regs.set_bits(Block::Ccm, clk, ccm::SCLK_GATING);
        }

        self.advance(BringupState::ClocksEnabled);
        Ok(())
    }

    /// Switch port D to bus output mode
    ///
    /// Takes the pins away from any other function, so it runs once per
    /// bring-up. Every line is left idle-high.
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` unless `ClocksEnabled`.
    pub fn configure_pins<R: RegisterAccess>(
        &mut self,
        regs: &mut RegisterMap<R>,
    ) -> Result<(), Error> {
        self.require(BringupState::PinsConfigured)?;

        regs.write(Block::Gpio, gpio::PD_CFG0, gpio::CFG_OUTPUT_ALL);
        regs.write(Block::Gpio, gpio::PD_CFG1, gpio::CFG_OUTPUT_ALL);
        regs.write(Block::Gpio, gpio::PD_CFG2, gpio::CFG2_OUTPUT);
        regs.write(Block::Gpio, gpio::PD_DATA, gpio::DATA_IDLE);
        regs.write(Block::Gpio, gpio::PD_PUL0, gpio::PULL_NONE);
        regs.write(Block::Gpio, gpio::PD_PUL1, gpio::PULL_NONE);
        regs.write(Block::Gpio, gpio::PD_DRV0, gpio::DRIVE_MAX);
        regs.write(Block::Gpio, gpio::PD_DRV1, gpio::DRIVE_MAX);

        self.advance(BringupState::PinsConfigured);
        Ok(())
    }

    /// Program the timing controller for 8080 CPU mode
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` unless `PinsConfigured`.
    pub fn configure_timing<R: RegisterAccess>(
        &mut self,
        regs: &mut RegisterMap<R>,
        timing: &PanelTiming,
    ) -> Result<(), Error> {
        self.require(BringupState::TimingConfigured)?;

        regs.write(Block::Tcon, tcon::CTRL, 0);
        regs.write(Block::Tcon, tcon::INT0, 0);
        regs.clear_bits(Block::Ccm, ccm::TCON_CLK, ccm::TCON_CLK_GATES);
        regs.write(Block::Tcon, tcon::TCON0_IO_CTRL0, 0xFFFF_FFFF);
        regs.write(Block::Tcon, tcon::TCON0_IO_CTRL1, 0xFFFF_FFFF);

        regs.clear_bits(Block::Tcon, tcon::CTRL, tcon::CTRL_IO_MAP_TCON1);
        regs.write(Block::Tcon, tcon::TCON0_CTRL, timing.tcon0_ctrl());
        regs.write(Block::Ccm, ccm::TCON_CLK, timing.tcon_clk());
        regs.write(Block::Tcon, tcon::TCON0_BASIC0, timing.basic0());
        regs.write(Block::Tcon, tcon::TCON0_BASIC1, timing.basic1());
        regs.write(Block::Tcon, tcon::TCON0_BASIC2, timing.basic2());
        regs.write(Block::Tcon, tcon::TCON0_BASIC3, 0);
        regs.write(Block::Tcon, tcon::TCON0_HV_TIMING, 0);
        regs.write(
            Block::Tcon,
            tcon::TCON0_CPU_IF,
            tcon::CPU_IF_MODE_8BIT_65K | tcon::CPU_IF_FLASH,
        );
        regs.write(Block::Tcon, tcon::TCON0_IO_CTRL0, tcon::IO_CTRL0_DCLK);
        regs.write(Block::Tcon, tcon::TCON0_IO_CTRL1, 0xFFFF_FFFF);
        regs.set_bits(Block::Tcon, tcon::CTRL, tcon::CTRL_ENABLE);

        self.advance(BringupState::TimingConfigured);
        Ok(())
    }

    /// Clock the panel initialization sequence out over the pin bus
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` unless `TimingConfigured`.
    pub fn stream_init_sequence<R, D>(
        &mut self,
        regs: &mut RegisterMap<R>,
        sequence: &[InitStep],
        delay: &mut D,
    ) -> Result<(), Error>
    where
        R: RegisterAccess,
        D: DelayNs,
    {
        self.require(BringupState::StreamingCommand)?;

        let Ok(()) = PinBus::new(regs).run(sequence, delay);

        self.advance(BringupState::StreamingCommand);
        Ok(())
    }

    /// Start the first DMA transfer of `words` words at bus address `source`
    ///
    /// Resets the controller's interrupt state, enables only the completion
    /// interrupt of `channel`, then configures and starts it.
    ///
    /// # Errors
    ///
    /// `Error::InvalidState` unless `StreamingCommand`.
    pub fn arm<R: RegisterAccess>(
        &mut self,
        regs: &mut RegisterMap<R>,
        dma: &mut DmaChannelSet,
        channel: Channel,
        source: u32,
        words: usize,
    ) -> Result<(), Error> {
        self.require(BringupState::Armed)?;

        dma.reset_interrupts(regs);
        dma.enable_completion_irq(regs, channel);
        dma.configure_raw(regs, channel, source, words);
        dma.start(regs, channel);

        self.advance(BringupState::Armed);
        info!("{channel:?} armed at {source:#010x}");
        Ok(())
    }

    /// Stop the DMA channels still running, then shut the clocks down
    ///
    /// Channels already stopped through `dma` are not touched again. Safe
    /// to call from any state; a sequencer that is already `Unconfigured`
    /// touches nothing.
    pub fn teardown<R: RegisterAccess>(
        &mut self,
        regs: &mut RegisterMap<R>,
        dma: &mut DmaChannelSet,
    ) {
        if self.state == BringupState::Unconfigured {
            return;
        }

        dma.stop_active(regs);

        if self.state >= BringupState::TimingConfigured {
            regs.clear_bits(Block::Tcon, tcon::CTRL, tcon::CTRL_ENABLE);
        }
        for clk in [ccm::TCON_CLK, ccm::DEBE_CLK, ccm::DEFE_CLK] {
            regs.clear_bits(Block::Ccm, clk, ccm::SCLK_GATING);
        }
        regs.clear_bits(Block::Ccm, ccm::BUS_CLK_GATING1, ccm::LCD_GATE);
        regs.clear_bits(Block::Ccm, ccm::BUS_SOFT_RST1, ccm::LCD_GATE);
        regs.clear_bits(Block::Ccm, ccm::BUS_CLK_GATING0, ccm::DMA_GATE);
        regs.clear_bits(Block::Ccm, ccm::BUS_SOFT_RST0, ccm::DMA_GATE);

        self.advance(BringupState::Unconfigured);
        info!("display pipeline torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::DEFAULT_INIT_SEQUENCE;
    use crate::regs::dma;
    use crate::testutil::{Access, MockDelay, RecordingBus};

    fn regs() -> RegisterMap<RecordingBus> {
        RegisterMap::new(RecordingBus::new())
    }

    const SOURCE: u32 = 0x8100_0000;
    const WORDS: usize = Geometry::PANEL.transfer_words();

    fn run_to_armed(
        regs: &mut RegisterMap<RecordingBus>,
        bringup: &mut PanelBringup,
        dma: &mut DmaChannelSet,
    ) {
        bringup.enable_clocks(regs).unwrap();
        bringup.configure_pins(regs).unwrap();
        bringup
            .configure_timing(regs, &PanelTiming::default())
            .unwrap();
        bringup
            .stream_init_sequence(regs, DEFAULT_INIT_SEQUENCE, &mut MockDelay::default())
            .unwrap();
        bringup
            .arm(regs, dma, Channel::Ddma0, SOURCE, WORDS)
            .unwrap();
    }

    #[test]
    fn test_panel_timing_constants() {
        let timing = PanelTiming::for_geometry(Geometry::PANEL);
        assert_eq!(timing.tcon0_ctrl(), 0x8100_00D0);
        assert_eq!(timing.tcon_clk(), 0xF000_00FF);
        assert_eq!(timing.basic0(), (319 << 16) | 239);
        assert_eq!(timing.basic1(), (1031 << 16) | 31);
        assert_eq!(timing.basic2(), (570 << 16) | 31);
    }

    #[test]
    fn test_full_sequence_reaches_armed() {
        let mut regs = regs();
        let mut bringup = PanelBringup::new();
        let mut dma = DmaChannelSet::new();
        run_to_armed(&mut regs, &mut bringup, &mut dma);

        assert_eq!(bringup.state(), BringupState::Armed);
        let bus = regs.access();
        assert_eq!(bus.value(Block::Ccm, ccm::BUS_CLK_GATING0), ccm::DMA_GATE);
        assert_eq!(bus.value(Block::Ccm, ccm::BUS_SOFT_RST1), ccm::LCD_GATE);
        assert_eq!(bus.value(Block::Ccm, ccm::TCON_CLK), 0xF000_00FF);
        assert_eq!(bus.value(Block::Gpio, gpio::PD_CFG2), 0x0011_1111);
        assert_eq!(bus.value(Block::Tcon, tcon::CTRL), tcon::CTRL_ENABLE);
        assert_eq!(bus.value(Block::Tcon, tcon::TCON0_IO_CTRL0), 1 << 28);
        assert_eq!(bus.value(Block::Dma, dma::INT_CTRL), 1 << 17);
        assert!(dma.is_enabled(&mut regs, Channel::Ddma0));
    }

    #[test]
    fn test_steps_run_in_order() {
        let mut regs = regs();
        let mut bringup = PanelBringup::new();
        let mut dma = DmaChannelSet::new();
        run_to_armed(&mut regs, &mut bringup, &mut dma);

        let bus = regs.access();
        let clocks = bus.first_write(Block::Ccm, ccm::BUS_SOFT_RST0).unwrap();
        let pins = bus.first_write(Block::Gpio, gpio::PD_CFG0).unwrap();
        let timing = bus.first_write(Block::Tcon, tcon::TCON0_BASIC0).unwrap();
        let init = bus
            .log
            .iter()
            .rposition(|a| {
                matches!(a, Access::Write(addr, _)
                    if *addr == Block::Gpio.addr(gpio::PD_DATA))
            })
            .unwrap();
        let armed = bus.last_write(Block::Dma, 0x300).unwrap();
        assert!(clocks < pins && pins < timing && timing < init && init < armed);
    }

    #[test]
    fn test_out_of_order_step_touches_nothing() {
        let mut regs = regs();
        let mut bringup = PanelBringup::new();

        let result = bringup.configure_pins(&mut regs);
        assert_eq!(
            result,
            Err(Error::InvalidState {
                expected: BringupState::ClocksEnabled,
                actual: BringupState::Unconfigured,
            })
        );
        assert!(regs.access().log.is_empty());

        bringup.enable_clocks(&mut regs).unwrap();
        assert!(bringup.enable_clocks(&mut regs).is_err());
        let mut dma = DmaChannelSet::new();
        assert!(
            bringup
                .arm(&mut regs, &mut dma, Channel::Ddma0, SOURCE, WORDS)
                .is_err()
        );
        assert_eq!(bringup.state(), BringupState::ClocksEnabled);
    }

    #[test]
    fn test_teardown_stops_dma_before_clocks() {
        let mut regs = regs();
        let mut bringup = PanelBringup::new();
        let mut dma = DmaChannelSet::new();
        run_to_armed(&mut regs, &mut bringup, &mut dma);
        regs.access_mut().clear_log();

        bringup.teardown(&mut regs, &mut dma);

        assert_eq!(bringup.state(), BringupState::Unconfigured);
        let bus = regs.access();
        let stopped = bus.last_write(Block::Dma, 0x300).unwrap();
        let gated = bus.first_write(Block::Ccm, ccm::BUS_CLK_GATING0).unwrap();
        assert!(stopped < gated);
        assert_eq!(bus.value(Block::Ccm, ccm::BUS_CLK_GATING0), 0);
        assert_eq!(bus.value(Block::Ccm, ccm::BUS_SOFT_RST1), 0);
        assert_eq!(bus.value(Block::Ccm, ccm::TCON_CLK) & ccm::SCLK_GATING, 0);
        assert_eq!(bus.value(Block::Tcon, tcon::CTRL), 0);
        assert!(!dma.is_enabled(&mut regs, Channel::Ddma0));

        // Back to the start: bring-up can run again
        regs.access_mut().clear_log();
        bringup.teardown(&mut regs, &mut dma);
        assert!(regs.access().log.is_empty());
        assert!(bringup.enable_clocks(&mut regs).is_ok());
    }

    #[test]
    fn test_teardown_after_stop_leaves_dma_alone() {
        let mut regs = regs();
        let mut bringup = PanelBringup::new();
        let mut dma = DmaChannelSet::new();
        run_to_armed(&mut regs, &mut bringup, &mut dma);
        dma.stop_all(&mut regs);
        regs.access_mut().clear_log();

        bringup.teardown(&mut regs, &mut dma);

        let bus = regs.access();
        let dma_block = Block::Dma.base()..Block::Dma.base() + 0x1000;
        assert!(!bus.log.iter().any(|access| {
            let (Access::Read(addr, _) | Access::Write(addr, _)) = *access;
            dma_block.contains(&addr)
        }));
        assert_eq!(bus.value(Block::Ccm, ccm::BUS_CLK_GATING0), 0);
        assert_eq!(bringup.state(), BringupState::Unconfigured);
    }
}
