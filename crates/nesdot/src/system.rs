//! Top-level system composition and the master clock.

use std::fmt;

use cpu_2a03::Cpu;
use log::info;
use nesdot_cartridge::CartridgeError;
use nesdot_core::{Bus, PixelSink};
use ppu_2c02::{Palette, PaletteError};

use crate::bus::SystemBus;
use crate::config::{SystemConfig, timing};
use crate::dma::OamDma;
use crate::framebuffer::Framebuffer;

/// Construction failed before any component was built.
#[derive(Debug)]
pub enum SystemError {
    Cartridge(CartridgeError),
    Palette(PaletteError),
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cartridge(err) => write!(f, "cartridge: {err}"),
            Self::Palette(err) => write!(f, "palette: {err}"),
        }
    }
}

impl std::error::Error for SystemError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cartridge(err) => Some(err),
            Self::Palette(err) => Some(err),
        }
    }
}

impl From<CartridgeError> for SystemError {
    fn from(err: CartridgeError) -> Self {
        Self::Cartridge(err)
    }
}

impl From<PaletteError> for SystemError {
    fn from(err: PaletteError) -> Self {
        Self::Palette(err)
    }
}

/// The whole console.
///
/// Generic over the pixel sink; [`System::new`] wires up the bundled
/// [`Framebuffer`], and `with_sink` accepts anything else that consumes
/// the dot stream.
pub struct System<S: PixelSink = Framebuffer> {
    cpu: Cpu,
    bus: SystemBus,
    dma: OamDma,
    sink: S,
    /// Dot counter modulo 3: the CPU and DMA run on the third dot.
    dot_phase: u8,
    /// Total dots stepped since power-on.
    dots: u64,
}

impl System<Framebuffer> {
    /// Build a console rendering into the bundled framebuffer.
    pub fn new(config: SystemConfig) -> Result<Self, SystemError> {
        Self::with_sink(config, Framebuffer::new())
    }
}

impl<S: PixelSink> System<S> {
    /// Build a console rendering into a caller-supplied sink.
    pub fn with_sink(config: SystemConfig, sink: S) -> Result<Self, SystemError> {
        let cartridge = nesdot_cartridge::load(&config.rom_data)?;
        let palette = Palette::from_bytes(config.palette_data)?;
        let mut bus = SystemBus::new(cartridge, palette);

        let mut cpu = Cpu::new();
        cpu.regs.pc = read_reset_vector(&mut bus);
        info!("power-on: PC=${:04X}", cpu.regs.pc);

        Ok(Self {
            cpu,
            bus,
            dma: OamDma::new(),
            sink,
            dot_phase: 0,
            dots: 0,
        })
    }

    /// Advance the master clock by one PPU dot. Every third dot also runs
    /// one DMA tick and one CPU cycle, in that order, so a DMA-initiated
    /// RDY drop is visible to the CPU within the same cycle.
    pub fn step_dot(&mut self) {
        self.bus
            .ppu
            .step(&mut *self.bus.cartridge, &mut self.sink);

        // Interrupt lines are resampled every dot; the CPU's detectors do
        // their own edge/level discipline.
        self.cpu.set_nmi_line(self.bus.ppu.nmi_asserted());
        self.cpu.set_irq_line(self.bus.cartridge.irq_line());

        self.dot_phase += 1;
        if self.dot_phase == timing::DOTS_PER_CPU_CYCLE as u8 {
            self.dot_phase = 0;
            self.dma.step(&mut self.cpu, &mut self.bus);
            self.cpu.step(&mut self.bus);
        }

        self.dots += 1;
    }

    /// Run until the PPU finishes the current frame.
    pub fn run_frame(&mut self) {
        let frame = self.bus.ppu.frame_count();
        while self.bus.ppu.frame_count() == frame {
            self.step_dot();
        }
    }

    /// Soft reset: the reset button. Mapper latches and the CPU fetch
    /// state reset; RAM survives.
    pub fn reset(&mut self) {
        self.bus.cartridge.reset();
        self.cpu.reset();
        self.cpu.regs.pc = read_reset_vector(&mut self.bus);
        info!("reset: PC=${:04X}", self.cpu.regs.pc);
    }

    /// Hard reset: a power cycle. RAM decays back to noise and every
    /// component returns to its power-on state.
    pub fn hard_reset(&mut self) {
        let mut seed = self.dots as u32 | 1;
        self.bus.scramble_ram(&mut seed);
        self.bus.cartridge.hard_reset();
        self.cpu = Cpu::new();
        self.cpu.regs.pc = read_reset_vector(&mut self.bus);
        self.dma = OamDma::new();
        self.dot_phase = 0;
        info!("hard reset: PC=${:04X}", self.cpu.regs.pc);
    }

    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &SystemBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Total dots stepped since power-on.
    #[must_use]
    pub fn dots(&self) -> u64 {
        self.dots
    }
}

fn read_reset_vector(bus: &mut SystemBus) -> u16 {
    let lo = bus.read(0xFFFC);
    let hi = bus.read(0xFFFD);
    u16::from_le_bytes([lo, hi])
}
