//! OAM DMA: 256 bytes from CPU memory into sprite memory, with the CPU
//! held off the bus for the duration.
//!
//! A write to $4014 latches the source page. From then on the DMA engine
//! drives RDY low; the CPU halts on its next read, and the engine starts
//! copying once its get/put phase lines up; a transfer may only begin on
//! a get cycle, so a trigger landing on the wrong parity costs one extra
//! alignment cycle (513 stolen cycles instead of 512). Each pair is a read
//! from `(page << 8) | offset` and a write to $2004, so OAMADDR advances
//! exactly as if the CPU had written the port itself.

use cpu_2a03::Cpu;
use nesdot_core::Bus;

use crate::bus::SystemBus;

/// The OAM DMA engine.
pub struct OamDma {
    /// Get/put parity. Toggles every CPU cycle, transfer or not, so the
    /// alignment of a trigger is well defined.
    phase: bool,
    /// Byte latched by the most recent get cycle.
    value: u8,
    /// Transfer position, 0-255.
    offset: u8,
    /// Whether the engine has synchronized to a get cycle.
    aligned: bool,
    /// Source page (high byte of the CPU-space address).
    page: u8,
    active: bool,
}

impl OamDma {
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: false,
            value: 0,
            offset: 0,
            aligned: false,
            page: 0,
            active: false,
        }
    }

    /// True while a transfer holds the bus.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// One CPU-cycle-equivalent tick.
    pub fn step(&mut self, cpu: &mut Cpu, bus: &mut SystemBus) {
        if let Some(page) = bus.dma_request.take() {
            self.page = page;
            self.active = true;
        }

        if self.active {
            cpu.set_rdy(false);
            // Wait for the CPU to actually halt, then for phase alignment.
            if cpu.is_halted() && (self.aligned || !self.phase) {
                if self.phase {
                    // Put cycle: through the register port, so OAMADDR
                    // side effects apply.
                    bus.write(0x2004, self.value);
                    self.offset = self.offset.wrapping_add(1);
                    if self.offset == 0 {
                        // 256 pairs done; hand the bus back.
                        self.active = false;
                        cpu.set_rdy(true);
                    }
                } else {
                    let addr = (u16::from(self.page) << 8) | u16::from(self.offset);
                    self.value = bus.read(addr);
                }
                self.aligned = true;
            }
        } else {
            self.aligned = false;
            self.offset = 0;
        }

        self.phase = !self.phase;
    }
}

impl Default for OamDma {
    fn default() -> Self {
        Self::new()
    }
}
