//! Cycle-stepped 6502 core of the Ricoh 2A03.
//!
//! One call to [`Cpu::step`] is one clock cycle, and performs at most one
//! bus read or one bus write, never both. Instructions are modeled as
//! per-cycle state machines indexed by an instruction-internal cycle
//! counter, so mid-instruction bus traffic (dummy reads, double RMW
//! writes) happens on the exact cycles real hardware produces it.
//!
//! Differences from a stock NMOS 6502:
//! - No decimal mode: the 2A03 hardwires the D flag to have no effect on
//!   ADC/SBC. The flag itself is still settable and pushable.
//! - All 256 opcodes decode, including the undocumented ones; the
//!   `$x2`-column STP opcodes jam the CPU permanently.
//!
//! Interrupt lines are sampled every cycle: NMI with a falling-edge
//! detector, IRQ with a level detector gated by the I flag. A detected
//! request only takes effect if its one-cycle service pulse is alive at the
//! instruction's polling point, which is late in the instruction for most
//! opcodes and one cycle early for branches.

mod addressing;
mod dispatch;
mod registers;
mod status;

use log::warn;
use nesdot_core::Bus;

pub use registers::Registers;
pub use status::{Status, flags};

/// The 6502 core.
pub struct Cpu {
    /// Architectural registers.
    pub regs: Registers,

    /// Cycle number within the current instruction, starting at 1.
    cycle: u8,
    /// Final cycle of the current instruction. Set on cycle 1, bumped only
    /// by page-cross fix-up paths.
    target_cycle: u8,

    /// Opcode being executed.
    opcode: u8,
    /// Operand latch (`t` on the real die): the byte fetched on cycle 2,
    /// also reused as zero-page pointer and RMW scratch.
    operand: u8,
    /// Effective address latch.
    addr: u16,
    /// Uncorrected-address latch for page-cross fix-ups.
    addr2: u16,

    /// Vector select for the current interrupt-ish sequence (BRK or forced).
    is_irq: bool,
    /// Set when an unstable store-high opcode saw RDY low on its address
    /// cycle, which skips the high-byte AND.
    skip_and: bool,

    /// Set by a branch that fetched the next opcode early; re-enters the
    /// decode state without another bus access.
    opcode_loaded: bool,

    /// Permanently stopped by an STP opcode.
    jammed: bool,
    /// Paused because a read was attempted while RDY was low.
    halted: bool,
    /// External ready line (driven low by DMA).
    rdy: bool,
    /// Address of the most recent read, replayed while halted to keep the
    /// bus alive.
    last_read: u16,

    // Interrupt inputs and detectors. `*_asserted` mirror the (active-low)
    // pins as booleans: true = line pulled low.
    nmi_asserted: bool,
    nmi_asserted_last: bool,
    irq_asserted: bool,
    /// Raised by the phase-2 edge/level detectors, one cycle behind the pin.
    nmi_detected: bool,
    irq_detected: bool,
    /// Service pulses raised on phase 1 from the detectors. NMI latches
    /// until serviced; IRQ lives for a single cycle.
    should_nmi: bool,
    should_irq: bool,
    /// Poll result: the next opcode fetch becomes a forced interrupt.
    take_interrupt: bool,
    /// Currently running the 7-cycle forced interrupt sequence.
    servicing_interrupt: bool,
}

impl Cpu {
    /// Power-on state. The cycle counter is primed past `target_cycle` so
    /// the first `step` fetches an opcode from whatever PC the system
    /// installed from the reset vector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            cycle: 8,
            target_cycle: 0,
            opcode: 0,
            operand: 0,
            addr: 0,
            addr2: 0,
            is_irq: false,
            skip_and: false,
            opcode_loaded: false,
            jammed: false,
            halted: false,
            rdy: true,
            last_read: 0,
            nmi_asserted: false,
            nmi_asserted_last: false,
            irq_asserted: false,
            nmi_detected: false,
            irq_detected: false,
            should_nmi: false,
            should_irq: false,
            take_interrupt: false,
            servicing_interrupt: false,
        }
    }

    /// Soft reset: re-prime the fetch state machine and set I. Registers
    /// other than P keep their values; the system re-installs PC from the
    /// reset vector. Clears a jam; reset is the one way out of it.
    pub fn reset(&mut self) {
        self.cycle = 8;
        self.target_cycle = 0;
        self.regs.p.set(flags::I);
        self.jammed = false;
        self.halted = false;
        self.rdy = true;
        self.opcode_loaded = false;
        self.servicing_interrupt = false;
        self.take_interrupt = false;
        self.should_nmi = false;
        self.should_irq = false;
        self.nmi_detected = false;
        self.irq_detected = false;
    }

    // =========================================================================
    // External lines
    // =========================================================================

    /// Drive the NMI line. `asserted` means pulled low; the edge detector
    /// fires on the transition into assertion.
    pub fn set_nmi_line(&mut self, asserted: bool) {
        self.nmi_asserted = asserted;
    }

    /// Drive the IRQ line. Level-sensitive: held assertion keeps requesting
    /// service whenever the I flag is clear.
    pub fn set_irq_line(&mut self, asserted: bool) {
        self.irq_asserted = asserted;
    }

    /// Drive the RDY line. While low, the next read halts the CPU; DMA uses
    /// this to steal cycles.
    pub fn set_rdy(&mut self, ready: bool) {
        self.rdy = ready;
    }

    /// True if the CPU executed a jam opcode. Terminal until `reset`.
    #[must_use]
    pub fn is_jammed(&self) -> bool {
        self.jammed
    }

    /// True while the CPU is stopped on a not-ready bus.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// True between instructions: the next `step` fetches an opcode.
    #[must_use]
    pub fn instruction_complete(&self) -> bool {
        self.cycle > self.target_cycle
    }

    // =========================================================================
    // Bus access
    // =========================================================================

    pub(crate) fn read(&mut self, bus: &mut impl Bus, addr: u16) -> u8 {
        // RDY is only honored on reads; writes always complete.
        if !self.rdy {
            self.halted = true;
        }
        self.last_read = addr;
        bus.read(addr)
    }

    pub(crate) fn write(&mut self, bus: &mut impl Bus, addr: u16, value: u8) {
        bus.write(addr, value);
    }

    // =========================================================================
    // Core state machine
    // =========================================================================

    /// Advance the CPU by exactly one clock cycle.
    pub fn step(&mut self, bus: &mut impl Bus) {
        if self.jammed {
            return;
        }
        if self.halted {
            // Keep the bus alive by replaying the last read.
            bus.read(self.last_read);
            if self.rdy {
                self.halted = false;
            }
            return;
        }

        // Phase 1: the detectors raise the internal service signals.
        if self.nmi_detected {
            self.should_nmi = true;
        }
        if self.irq_detected {
            self.should_irq = true;
        }

        if self.cycle == 2 {
            // Every instruction reads the byte after the opcode on cycle 2,
            // whether it wants one or not.
            self.operand = self.read(bus, self.regs.pc);
        } else if self.cycle > self.target_cycle {
            self.opcode = self.read(bus, self.regs.pc);
            self.begin_instruction();
        }

        if self.servicing_interrupt {
            self.interrupt_cycle(bus);
            self.cycle += 1;
            return;
        }

        self.dispatch(bus);

        if self.opcode_loaded {
            // A branch fetched the next opcode on its final read. Re-enter
            // decode without touching the bus again; the new instruction's
            // first cycle runs in this same clock.
            self.opcode_loaded = false;
            self.begin_instruction();
            if self.servicing_interrupt {
                self.interrupt_cycle(bus);
                self.cycle += 1;
                return;
            }
            self.dispatch(bus);
        }

        // Interrupt poll point: one cycle before the last, for everything
        // except branches (polled on cycle 1) and BRK (never re-polled).
        if (self.opcode & 0x1F) != 0x10
            && self.opcode != 0x00
            && self.cycle == self.target_cycle.wrapping_sub(1)
        {
            self.poll_interrupts();
        }

        // Phase 2: sample the pins into the detectors. The edge detector
        // fires once per assertion; the level detector follows the pin.
        self.nmi_detected = self.nmi_asserted && !self.nmi_asserted_last;
        self.irq_detected = self.irq_asserted;
        // The IRQ service signal is only alive for the cycle it was raised.
        self.should_irq = false;

        self.cycle += 1;
        self.nmi_asserted_last = self.nmi_asserted;
    }

    /// Transition into a fresh instruction: entered from the normal fetch
    /// path and from the branch early-fetch path.
    fn begin_instruction(&mut self) {
        self.cycle = 1;
        self.target_cycle = 2;
        if self.take_interrupt {
            // The fetched opcode is discarded; a forced BRK-shaped
            // sequence runs instead, without advancing PC.
            self.take_interrupt = false;
            self.servicing_interrupt = true;
        } else {
            self.regs.pc = self.regs.pc.wrapping_add(1);
        }
    }

    fn poll_interrupts(&mut self) {
        if self.should_nmi || (self.should_irq && !self.regs.p.is_set(flags::I)) {
            self.take_interrupt = true;
        }
    }

    /// The forced 7-cycle interrupt sequence (hardware IRQ/NMI). BRK runs
    /// its own nearly identical copy with PC increment and B set.
    fn interrupt_cycle(&mut self, bus: &mut impl Bus) {
        match self.cycle {
            1 => {
                self.target_cycle = 7;
                // BRK is forced into the opcode register.
                self.opcode = 0x00;
            }
            2 => {
                // Dummy operand fetch already happened; PC does not move.
            }
            3 => {
                self.write(bus, 0x0100 + u16::from(self.regs.s), (self.regs.pc >> 8) as u8);
                self.regs.s = self.regs.s.wrapping_sub(1);
            }
            4 => {
                self.write(bus, 0x0100 + u16::from(self.regs.s), self.regs.pc as u8);
                self.regs.s = self.regs.s.wrapping_sub(1);
                // Vector selection happens here, so a late NMI can hijack
                // an in-flight IRQ sequence.
                self.is_irq = true;
                if self.should_nmi {
                    self.is_irq = false;
                    self.should_nmi = false;
                }
            }
            5 => {
                self.write(
                    bus,
                    0x0100 + u16::from(self.regs.s),
                    self.regs.p.for_push(false),
                );
                self.regs.s = self.regs.s.wrapping_sub(1);
                self.regs.p.set(flags::I);
            }
            6 => {
                let vector = if self.is_irq { 0xFFFE } else { 0xFFFA };
                let lo = self.read(bus, vector);
                self.regs.pc = (self.regs.pc & 0xFF00) | u16::from(lo);
            }
            7 => {
                let vector = if self.is_irq { 0xFFFF } else { 0xFFFB };
                let hi = self.read(bus, vector);
                self.regs.pc = (self.regs.pc & 0x00FF) | (u16::from(hi) << 8);
                if !self.is_irq {
                    self.should_nmi = false;
                }
                self.servicing_interrupt = false;
            }
            _ => {}
        }
    }

    pub(crate) fn jam(&mut self) {
        if !self.jammed {
            warn!("CPU jammed on opcode ${:02X} at PC ${:04X}", self.opcode, self.regs.pc);
        }
        self.jammed = true;
    }

    // =========================================================================
    // ALU
    // =========================================================================

    pub(crate) fn update_nz(&mut self, value: u8) {
        self.regs.p.assign(flags::Z, value == 0);
        self.regs.p.assign(flags::N, value & 0x80 != 0);
    }

    /// Add with carry. Binary only; the 2A03 ignores the D flag.
    pub(crate) fn adc(&mut self, value: u8) {
        let a = self.regs.a;
        let carry = u16::from(self.regs.p.is_set(flags::C));
        let result = u16::from(a) + u16::from(value) + carry;
        let out = result as u8;

        self.regs.p.assign(flags::C, result > 0xFF);
        self.regs.p.assign(flags::V, (a ^ out) & (value ^ out) & 0x80 != 0);
        self.regs.a = out;
        self.update_nz(out);
    }

    /// Subtract with borrow (carry clear = borrow).
    pub(crate) fn sbc(&mut self, value: u8) {
        let a = self.regs.a;
        let borrow = u16::from(!self.regs.p.is_set(flags::C));
        let result = u16::from(a)
            .wrapping_sub(u16::from(value))
            .wrapping_sub(borrow);
        let out = result as u8;

        self.regs.p.assign(flags::C, result < 0x100);
        self.regs.p.assign(flags::V, (a ^ out) & (!value ^ out) & 0x80 != 0);
        self.regs.a = out;
        self.update_nz(out);
    }

    /// Compare: carry set when the register is >= the operand.
    pub(crate) fn compare(&mut self, reg: u8, value: u8) {
        let result = reg.wrapping_sub(value);
        self.regs.p.assign(flags::C, reg >= value);
        self.update_nz(result);
    }

    pub(crate) fn asl(&mut self, value: u8) -> u8 {
        self.regs.p.assign(flags::C, value & 0x80 != 0);
        let result = value << 1;
        self.update_nz(result);
        result
    }

    pub(crate) fn lsr(&mut self, value: u8) -> u8 {
        self.regs.p.assign(flags::C, value & 0x01 != 0);
        let result = value >> 1;
        self.update_nz(result);
        result
    }

    pub(crate) fn rol(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.regs.p.is_set(flags::C));
        self.regs.p.assign(flags::C, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.update_nz(result);
        result
    }

    pub(crate) fn ror(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.regs.p.is_set(flags::C)) << 7;
        self.regs.p.assign(flags::C, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.update_nz(result);
        result
    }

    /// BIT: Z from A & M, N and V copied straight from the memory byte.
    pub(crate) fn bit(&mut self, value: u8) {
        self.regs.p.assign(flags::Z, value & self.regs.a == 0);
        self.regs.p.assign(flags::N, value & 0x80 != 0);
        self.regs.p.assign(flags::V, value & 0x40 != 0);
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
