//! Opcode decode and execution.
//!
//! Every one of the 256 opcode values lands in exactly one arm of
//! [`Cpu::dispatch`]: documented, undocumented, and the `$x2` jam column.
//! Addressing-mode sequencing lives in `addressing.rs`; the arms here bind
//! an opcode to a mode and a register-level operation.

use crate::Cpu;
use crate::status::flags;
use nesdot_core::Bus;

impl Cpu {
    pub(crate) fn dispatch(&mut self, bus: &mut impl Bus) {
        let x = self.regs.x;
        let y = self.regs.y;

        match self.opcode {
            // === Interrupt and subroutine flow ===
            0x00 => self.op_brk(bus),
            0x20 => self.op_jsr(bus),
            0x40 => self.op_rti(bus),
            0x60 => self.op_rts(bus),
            0x4C => self.op_jmp_abs(bus),
            0x6C => self.op_jmp_ind(bus),

            // === Stack pushes and pulls ===
            0x48 => self.op_pha(bus),
            0x08 => self.op_php(bus),
            0x68 => self.op_pla(bus),
            0x28 => self.op_plp(bus),

            // === Implied / accumulator ===
            0x0A => self.imp(|c| c.regs.a = c.asl(c.regs.a)),
            0x2A => self.imp(|c| c.regs.a = c.rol(c.regs.a)),
            0x4A => self.imp(|c| c.regs.a = c.lsr(c.regs.a)),
            0x6A => self.imp(|c| c.regs.a = c.ror(c.regs.a)),
            0x18 => self.imp(|c| c.regs.p.clear(flags::C)),
            0x38 => self.imp(|c| c.regs.p.set(flags::C)),
            0x58 => self.imp(|c| c.regs.p.clear(flags::I)),
            0x78 => self.imp(|c| c.regs.p.set(flags::I)),
            0xB8 => self.imp(|c| c.regs.p.clear(flags::V)),
            0xD8 => self.imp(|c| c.regs.p.clear(flags::D)),
            0xF8 => self.imp(|c| c.regs.p.set(flags::D)),
            0xAA => self.imp(|c| {
                c.regs.x = c.regs.a;
                c.update_nz(c.regs.x);
            }),
            0xA8 => self.imp(|c| {
                c.regs.y = c.regs.a;
                c.update_nz(c.regs.y);
            }),
            0x8A => self.imp(|c| {
                c.regs.a = c.regs.x;
                c.update_nz(c.regs.a);
            }),
            0x98 => self.imp(|c| {
                c.regs.a = c.regs.y;
                c.update_nz(c.regs.a);
            }),
            0x9A => self.imp(|c| c.regs.s = c.regs.x),
            0xBA => self.imp(|c| {
                c.regs.x = c.regs.s;
                c.update_nz(c.regs.x);
            }),
            0xE8 => self.imp(|c| {
                c.regs.x = c.regs.x.wrapping_add(1);
                c.update_nz(c.regs.x);
            }),
            0xC8 => self.imp(|c| {
                c.regs.y = c.regs.y.wrapping_add(1);
                c.update_nz(c.regs.y);
            }),
            0xCA => self.imp(|c| {
                c.regs.x = c.regs.x.wrapping_sub(1);
                c.update_nz(c.regs.x);
            }),
            0x88 => self.imp(|c| {
                c.regs.y = c.regs.y.wrapping_sub(1);
                c.update_nz(c.regs.y);
            }),
            // NOP, official and the undocumented implied copies.
            0xEA | 0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA => self.imp(|_| {}),

            // === Immediate ===
            0xA9 => self.imm(Cpu::op_lda),
            0xA2 => self.imm(Cpu::op_ldx),
            0xA0 => self.imm(Cpu::op_ldy),
            0x09 => self.imm(Cpu::op_ora),
            0x29 => self.imm(Cpu::op_and),
            0x49 => self.imm(Cpu::op_eor),
            0x69 => self.imm(Cpu::adc),
            0xE9 | 0xEB => self.imm(Cpu::sbc),
            0xC9 => self.imm(Cpu::op_cmp),
            0xE0 => self.imm(Cpu::op_cpx),
            0xC0 => self.imm(Cpu::op_cpy),
            // Undocumented immediate group.
            0xAB => self.imm(Cpu::op_lax),
            0x0B | 0x2B => self.imm(Cpu::op_anc),
            0x4B => self.imm(Cpu::op_alr),
            0x6B => self.imm(Cpu::op_arr),
            0x8B => self.imm(Cpu::op_xaa),
            0xCB => self.imm(Cpu::op_axs),
            // Multi-byte NOPs with an immediate operand.
            0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 => self.imm(|_, _| {}),

            // === Absolute ===
            0xAD => self.abs_read(bus, Cpu::op_lda),
            0xAE => self.abs_read(bus, Cpu::op_ldx),
            0xAC => self.abs_read(bus, Cpu::op_ldy),
            0x0D => self.abs_read(bus, Cpu::op_ora),
            0x2D => self.abs_read(bus, Cpu::op_and),
            0x4D => self.abs_read(bus, Cpu::op_eor),
            0x6D => self.abs_read(bus, Cpu::adc),
            0xED => self.abs_read(bus, Cpu::sbc),
            0xCD => self.abs_read(bus, Cpu::op_cmp),
            0xEC => self.abs_read(bus, Cpu::op_cpx),
            0xCC => self.abs_read(bus, Cpu::op_cpy),
            0x2C => self.abs_read(bus, Cpu::bit),
            0xAF => self.abs_read(bus, Cpu::op_lax),
            0x0C => self.abs_read(bus, |_, _| {}),

            0x0E => self.abs_rmw(bus, Cpu::asl),
            0x2E => self.abs_rmw(bus, Cpu::rol),
            0x4E => self.abs_rmw(bus, Cpu::lsr),
            0x6E => self.abs_rmw(bus, Cpu::ror),
            0xCE => self.abs_rmw(bus, Cpu::op_dec),
            0xEE => self.abs_rmw(bus, Cpu::op_inc),
            0x0F => self.abs_rmw(bus, Cpu::op_slo),
            0x2F => self.abs_rmw(bus, Cpu::op_rla),
            0x4F => self.abs_rmw(bus, Cpu::op_sre),
            0x6F => self.abs_rmw(bus, Cpu::op_rra),
            0xCF => self.abs_rmw(bus, Cpu::op_dcp),
            0xEF => self.abs_rmw(bus, Cpu::op_isc),

            0x8D => self.abs_store(bus, |c| c.regs.a),
            0x8E => self.abs_store(bus, |c| c.regs.x),
            0x8C => self.abs_store(bus, |c| c.regs.y),
            0x8F => self.abs_store(bus, |c| c.regs.a & c.regs.x),

            // === Zero page ===
            0xA5 => self.zp_read(bus, Cpu::op_lda),
            0xA6 => self.zp_read(bus, Cpu::op_ldx),
            0xA4 => self.zp_read(bus, Cpu::op_ldy),
            0x05 => self.zp_read(bus, Cpu::op_ora),
            0x25 => self.zp_read(bus, Cpu::op_and),
            0x45 => self.zp_read(bus, Cpu::op_eor),
            0x65 => self.zp_read(bus, Cpu::adc),
            0xE5 => self.zp_read(bus, Cpu::sbc),
            0xC5 => self.zp_read(bus, Cpu::op_cmp),
            0xE4 => self.zp_read(bus, Cpu::op_cpx),
            0xC4 => self.zp_read(bus, Cpu::op_cpy),
            0x24 => self.zp_read(bus, Cpu::bit),
            0xA7 => self.zp_read(bus, Cpu::op_lax),
            0x04 | 0x44 | 0x64 => self.zp_read(bus, |_, _| {}),

            0x06 => self.zp_rmw(bus, Cpu::asl),
            0x26 => self.zp_rmw(bus, Cpu::rol),
            0x46 => self.zp_rmw(bus, Cpu::lsr),
            0x66 => self.zp_rmw(bus, Cpu::ror),
            0xC6 => self.zp_rmw(bus, Cpu::op_dec),
            0xE6 => self.zp_rmw(bus, Cpu::op_inc),
            0x07 => self.zp_rmw(bus, Cpu::op_slo),
            0x27 => self.zp_rmw(bus, Cpu::op_rla),
            0x47 => self.zp_rmw(bus, Cpu::op_sre),
            0x67 => self.zp_rmw(bus, Cpu::op_rra),
            0xC7 => self.zp_rmw(bus, Cpu::op_dcp),
            0xE7 => self.zp_rmw(bus, Cpu::op_isc),

            0x85 => self.zp_store(bus, |c| c.regs.a),
            0x86 => self.zp_store(bus, |c| c.regs.x),
            0x84 => self.zp_store(bus, |c| c.regs.y),
            0x87 => self.zp_store(bus, |c| c.regs.a & c.regs.x),

            // === Zero page indexed ===
            0xB5 => self.zpi_read(bus, x, Cpu::op_lda),
            0xB4 => self.zpi_read(bus, x, Cpu::op_ldy),
            0xB6 => self.zpi_read(bus, y, Cpu::op_ldx),
            0x15 => self.zpi_read(bus, x, Cpu::op_ora),
            0x35 => self.zpi_read(bus, x, Cpu::op_and),
            0x55 => self.zpi_read(bus, x, Cpu::op_eor),
            0x75 => self.zpi_read(bus, x, Cpu::adc),
            0xF5 => self.zpi_read(bus, x, Cpu::sbc),
            0xD5 => self.zpi_read(bus, x, Cpu::op_cmp),
            0xB7 => self.zpi_read(bus, y, Cpu::op_lax),
            0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 => self.zpi_read(bus, x, |_, _| {}),

            0x16 => self.zpi_rmw(bus, Cpu::asl),
            0x36 => self.zpi_rmw(bus, Cpu::rol),
            0x56 => self.zpi_rmw(bus, Cpu::lsr),
            0x76 => self.zpi_rmw(bus, Cpu::ror),
            0xD6 => self.zpi_rmw(bus, Cpu::op_dec),
            0xF6 => self.zpi_rmw(bus, Cpu::op_inc),
            0x17 => self.zpi_rmw(bus, Cpu::op_slo),
            0x37 => self.zpi_rmw(bus, Cpu::op_rla),
            0x57 => self.zpi_rmw(bus, Cpu::op_sre),
            0x77 => self.zpi_rmw(bus, Cpu::op_rra),
            0xD7 => self.zpi_rmw(bus, Cpu::op_dcp),
            0xF7 => self.zpi_rmw(bus, Cpu::op_isc),

            0x95 => self.zpi_store(bus, x, |c| c.regs.a),
            0x96 => self.zpi_store(bus, y, |c| c.regs.x),
            0x94 => self.zpi_store(bus, x, |c| c.regs.y),
            0x97 => self.zpi_store(bus, y, |c| c.regs.a & c.regs.x),

            // === Absolute indexed ===
            0xBD => self.absi_read(bus, x, Cpu::op_lda),
            0xB9 => self.absi_read(bus, y, Cpu::op_lda),
            0xBE => self.absi_read(bus, y, Cpu::op_ldx),
            0xBC => self.absi_read(bus, x, Cpu::op_ldy),
            0x1D => self.absi_read(bus, x, Cpu::op_ora),
            0x19 => self.absi_read(bus, y, Cpu::op_ora),
            0x3D => self.absi_read(bus, x, Cpu::op_and),
            0x39 => self.absi_read(bus, y, Cpu::op_and),
            0x5D => self.absi_read(bus, x, Cpu::op_eor),
            0x59 => self.absi_read(bus, y, Cpu::op_eor),
            0x7D => self.absi_read(bus, x, Cpu::adc),
            0x79 => self.absi_read(bus, y, Cpu::adc),
            0xFD => self.absi_read(bus, x, Cpu::sbc),
            0xF9 => self.absi_read(bus, y, Cpu::sbc),
            0xDD => self.absi_read(bus, x, Cpu::op_cmp),
            0xD9 => self.absi_read(bus, y, Cpu::op_cmp),
            0xBF => self.absi_read(bus, y, Cpu::op_lax),
            0xBB => self.absi_read(bus, y, Cpu::op_las),
            0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => self.absi_read(bus, x, |_, _| {}),

            0x1E => self.absi_rmw(bus, x, Cpu::asl),
            0x3E => self.absi_rmw(bus, x, Cpu::rol),
            0x5E => self.absi_rmw(bus, x, Cpu::lsr),
            0x7E => self.absi_rmw(bus, x, Cpu::ror),
            0xDE => self.absi_rmw(bus, x, Cpu::op_dec),
            0xFE => self.absi_rmw(bus, x, Cpu::op_inc),
            0x1F => self.absi_rmw(bus, x, Cpu::op_slo),
            0x1B => self.absi_rmw(bus, y, Cpu::op_slo),
            0x3F => self.absi_rmw(bus, x, Cpu::op_rla),
            0x3B => self.absi_rmw(bus, y, Cpu::op_rla),
            0x5F => self.absi_rmw(bus, x, Cpu::op_sre),
            0x5B => self.absi_rmw(bus, y, Cpu::op_sre),
            0x7F => self.absi_rmw(bus, x, Cpu::op_rra),
            0x7B => self.absi_rmw(bus, y, Cpu::op_rra),
            0xDF => self.absi_rmw(bus, x, Cpu::op_dcp),
            0xDB => self.absi_rmw(bus, y, Cpu::op_dcp),
            0xFF => self.absi_rmw(bus, x, Cpu::op_isc),
            0xFB => self.absi_rmw(bus, y, Cpu::op_isc),

            0x9D => self.absi_store(bus, x, |c| c.regs.a),
            0x99 => self.absi_store(bus, y, |c| c.regs.a),

            // Unstable store-high group.
            0x9C => self.absi_sh(bus, x, |c| c.regs.y),
            0x9E => self.absi_sh(bus, y, |c| c.regs.x),
            0x9F => self.absi_sh(bus, y, |c| c.regs.a & c.regs.x),
            0x9B => self.absi_sh(bus, y, |c| {
                c.regs.s = c.regs.a & c.regs.x;
                c.regs.s
            }),

            // === Indexed indirect ($nn,X) ===
            0xA1 => self.idxind_read(bus, Cpu::op_lda),
            0x01 => self.idxind_read(bus, Cpu::op_ora),
            0x21 => self.idxind_read(bus, Cpu::op_and),
            0x41 => self.idxind_read(bus, Cpu::op_eor),
            0x61 => self.idxind_read(bus, Cpu::adc),
            0xE1 => self.idxind_read(bus, Cpu::sbc),
            0xC1 => self.idxind_read(bus, Cpu::op_cmp),
            0xA3 => self.idxind_read(bus, Cpu::op_lax),
            0x03 => self.idxind_rmw(bus, Cpu::op_slo),
            0x23 => self.idxind_rmw(bus, Cpu::op_rla),
            0x43 => self.idxind_rmw(bus, Cpu::op_sre),
            0x63 => self.idxind_rmw(bus, Cpu::op_rra),
            0xC3 => self.idxind_rmw(bus, Cpu::op_dcp),
            0xE3 => self.idxind_rmw(bus, Cpu::op_isc),
            0x81 => self.idxind_store(bus, |c| c.regs.a),
            0x83 => self.idxind_store(bus, |c| c.regs.a & c.regs.x),

            // === Indirect indexed ($nn),Y ===
            0xB1 => self.indidx_read(bus, Cpu::op_lda),
            0x11 => self.indidx_read(bus, Cpu::op_ora),
            0x31 => self.indidx_read(bus, Cpu::op_and),
            0x51 => self.indidx_read(bus, Cpu::op_eor),
            0x71 => self.indidx_read(bus, Cpu::adc),
            0xF1 => self.indidx_read(bus, Cpu::sbc),
            0xD1 => self.indidx_read(bus, Cpu::op_cmp),
            0xB3 => self.indidx_read(bus, Cpu::op_lax),
            0x13 => self.indidx_rmw(bus, Cpu::op_slo),
            0x33 => self.indidx_rmw(bus, Cpu::op_rla),
            0x53 => self.indidx_rmw(bus, Cpu::op_sre),
            0x73 => self.indidx_rmw(bus, Cpu::op_rra),
            0xD3 => self.indidx_rmw(bus, Cpu::op_dcp),
            0xF3 => self.indidx_rmw(bus, Cpu::op_isc),
            0x91 => self.indidx_store(bus, |c| c.regs.a),
            0x93 => self.indidx_sh(bus, |c| c.regs.a & c.regs.x),

            // === Relative branches ===
            0x10 => {
                let taken = !self.regs.p.is_set(flags::N);
                self.relative(bus, taken);
            }
            0x30 => {
                let taken = self.regs.p.is_set(flags::N);
                self.relative(bus, taken);
            }
            0x50 => {
                let taken = !self.regs.p.is_set(flags::V);
                self.relative(bus, taken);
            }
            0x70 => {
                let taken = self.regs.p.is_set(flags::V);
                self.relative(bus, taken);
            }
            0x90 => {
                let taken = !self.regs.p.is_set(flags::C);
                self.relative(bus, taken);
            }
            0xB0 => {
                let taken = self.regs.p.is_set(flags::C);
                self.relative(bus, taken);
            }
            0xD0 => {
                let taken = !self.regs.p.is_set(flags::Z);
                self.relative(bus, taken);
            }
            0xF0 => {
                let taken = self.regs.p.is_set(flags::Z);
                self.relative(bus, taken);
            }

            // === STP: halt until reset ===
            0x02 | 0x12 | 0x22 | 0x32 | 0x42 | 0x52 | 0x62 | 0x72 | 0x92 | 0xB2 | 0xD2
            | 0xF2 => self.jam(),
        }
    }

    // =========================================================================
    // Register-level operations
    // =========================================================================

    fn op_lda(&mut self, value: u8) {
        self.regs.a = value;
        self.update_nz(value);
    }

    fn op_ldx(&mut self, value: u8) {
        self.regs.x = value;
        self.update_nz(value);
    }

    fn op_ldy(&mut self, value: u8) {
        self.regs.y = value;
        self.update_nz(value);
    }

    fn op_ora(&mut self, value: u8) {
        self.regs.a |= value;
        self.update_nz(self.regs.a);
    }

    fn op_and(&mut self, value: u8) {
        self.regs.a &= value;
        self.update_nz(self.regs.a);
    }

    fn op_eor(&mut self, value: u8) {
        self.regs.a ^= value;
        self.update_nz(self.regs.a);
    }

    fn op_cmp(&mut self, value: u8) {
        self.compare(self.regs.a, value);
    }

    fn op_cpx(&mut self, value: u8) {
        self.compare(self.regs.x, value);
    }

    fn op_cpy(&mut self, value: u8) {
        self.compare(self.regs.y, value);
    }

    /// LAX: load A and X together.
    fn op_lax(&mut self, value: u8) {
        self.regs.a = value;
        self.regs.x = value;
        self.update_nz(value);
    }

    /// LAS: A, X and S all become M & S.
    fn op_las(&mut self, value: u8) {
        let result = value & self.regs.s;
        self.regs.a = result;
        self.regs.x = result;
        self.regs.s = result;
        self.update_nz(result);
    }

    /// ANC: AND, then copy N into C.
    fn op_anc(&mut self, value: u8) {
        self.regs.a &= value;
        self.update_nz(self.regs.a);
        self.regs.p.assign(flags::C, self.regs.a & 0x80 != 0);
    }

    /// ALR: AND then LSR A.
    fn op_alr(&mut self, value: u8) {
        self.regs.a &= value;
        self.regs.a = self.lsr(self.regs.a);
    }

    /// ARR: AND then ROR A, with C and V derived from the rotated result.
    fn op_arr(&mut self, value: u8) {
        self.regs.a &= value;
        let carry_in = u8::from(self.regs.p.is_set(flags::C)) << 7;
        let result = (self.regs.a >> 1) | carry_in;
        self.regs.a = result;
        self.update_nz(result);
        self.regs.p.assign(flags::C, result & 0x40 != 0);
        self.regs.p
            .assign(flags::V, (result ^ (result << 1)) & 0x40 != 0);
    }

    /// XAA: highly unstable on silicon; modeled as A = X & M.
    fn op_xaa(&mut self, value: u8) {
        self.regs.a = self.regs.x & value;
        self.update_nz(self.regs.a);
    }

    /// AXS (SBX): X = (A & X) - M, carry as in a compare.
    fn op_axs(&mut self, value: u8) {
        let base = self.regs.a & self.regs.x;
        self.compare(base, value);
        self.regs.x = base.wrapping_sub(value);
        self.update_nz(self.regs.x);
    }

    fn op_inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.update_nz(result);
        result
    }

    fn op_dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.update_nz(result);
        result
    }

    /// SLO: ASL memory, then ORA the result.
    fn op_slo(&mut self, value: u8) -> u8 {
        let result = self.asl(value);
        self.regs.a |= result;
        self.update_nz(self.regs.a);
        result
    }

    /// RLA: ROL memory, then AND the result.
    fn op_rla(&mut self, value: u8) -> u8 {
        let result = self.rol(value);
        self.regs.a &= result;
        self.update_nz(self.regs.a);
        result
    }

    /// SRE: LSR memory, then EOR the result.
    fn op_sre(&mut self, value: u8) -> u8 {
        let result = self.lsr(value);
        self.regs.a ^= result;
        self.update_nz(self.regs.a);
        result
    }

    /// RRA: ROR memory, then ADC the result.
    fn op_rra(&mut self, value: u8) -> u8 {
        let result = self.ror(value);
        self.adc(result);
        result
    }

    /// DCP: DEC memory, then CMP the result.
    fn op_dcp(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.compare(self.regs.a, result);
        result
    }

    /// ISC: INC memory, then SBC the result.
    fn op_isc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.sbc(result);
        result
    }

    // =========================================================================
    // Flow-control sequences
    // =========================================================================

    /// BRK: 7 cycles. Unlike a hardware interrupt the return PC skips the
    /// padding byte and the pushed status carries B. An NMI arriving before
    /// the vector cycles hijacks the sequence onto the NMI vector.
    fn op_brk(&mut self, bus: &mut impl Bus) {
        match self.cycle {
            1 => self.target_cycle = 7,
            2 => self.regs.pc = self.regs.pc.wrapping_add(1),
            3 => {
                self.write(bus, 0x0100 + u16::from(self.regs.s), (self.regs.pc >> 8) as u8);
                self.regs.s = self.regs.s.wrapping_sub(1);
            }
            4 => {
                self.write(bus, 0x0100 + u16::from(self.regs.s), self.regs.pc as u8);
                self.regs.s = self.regs.s.wrapping_sub(1);
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
                    self.regs.p.for_push(true),
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
            }
            _ => {}
        }
    }

    /// JSR: 6 cycles. The return address pushed is the address of the last
    /// operand byte, which RTS compensates for.
    fn op_jsr(&mut self, bus: &mut impl Bus) {
        match self.cycle {
            1 => self.target_cycle = 6,
            2 => self.regs.pc = self.regs.pc.wrapping_add(1),
            3 => {
                // Internal stack cycle.
            }
            4 => {
                self.write(bus, 0x0100 + u16::from(self.regs.s), (self.regs.pc >> 8) as u8);
                self.regs.s = self.regs.s.wrapping_sub(1);
            }
            5 => {
                self.write(bus, 0x0100 + u16::from(self.regs.s), self.regs.pc as u8);
                self.regs.s = self.regs.s.wrapping_sub(1);
            }
            6 => {
                let hi = self.read(bus, self.regs.pc);
                self.regs.pc = u16::from(self.operand) | (u16::from(hi) << 8);
            }
            _ => {}
        }
    }

    /// RTI: 6 cycles.
    fn op_rti(&mut self, bus: &mut impl Bus) {
        match self.cycle {
            1 => self.target_cycle = 6,
            3 => self.regs.s = self.regs.s.wrapping_add(1),
            4 => {
                let p = self.read(bus, 0x0100 + u16::from(self.regs.s));
                self.regs.p.load_from_stack(p);
                self.regs.s = self.regs.s.wrapping_add(1);
            }
            5 => {
                let lo = self.read(bus, 0x0100 + u16::from(self.regs.s));
                self.regs.pc = (self.regs.pc & 0xFF00) | u16::from(lo);
                self.regs.s = self.regs.s.wrapping_add(1);
            }
            6 => {
                let hi = self.read(bus, 0x0100 + u16::from(self.regs.s));
                self.regs.pc = (self.regs.pc & 0x00FF) | (u16::from(hi) << 8);
            }
            _ => {}
        }
    }

    /// RTS: 6 cycles; the final cycle steps past the byte JSR pushed.
    fn op_rts(&mut self, bus: &mut impl Bus) {
        match self.cycle {
            1 => self.target_cycle = 6,
            3 => self.regs.s = self.regs.s.wrapping_add(1),
            4 => {
                let lo = self.read(bus, 0x0100 + u16::from(self.regs.s));
                self.regs.pc = (self.regs.pc & 0xFF00) | u16::from(lo);
                self.regs.s = self.regs.s.wrapping_add(1);
            }
            5 => {
                let hi = self.read(bus, 0x0100 + u16::from(self.regs.s));
                self.regs.pc = (self.regs.pc & 0x00FF) | (u16::from(hi) << 8);
            }
            6 => self.regs.pc = self.regs.pc.wrapping_add(1),
            _ => {}
        }
    }

    /// PHA: 3 cycles.
    fn op_pha(&mut self, bus: &mut impl Bus) {
        match self.cycle {
            1 => self.target_cycle = 3,
            3 => {
                self.write(bus, 0x0100 + u16::from(self.regs.s), self.regs.a);
                self.regs.s = self.regs.s.wrapping_sub(1);
            }
            _ => {}
        }
    }

    /// PHP: 3 cycles; pushed copy always has B and U set.
    fn op_php(&mut self, bus: &mut impl Bus) {
        match self.cycle {
            1 => self.target_cycle = 3,
            3 => {
                self.write(
                    bus,
                    0x0100 + u16::from(self.regs.s),
                    self.regs.p.for_push(true),
                );
                self.regs.s = self.regs.s.wrapping_sub(1);
            }
            _ => {}
        }
    }

    /// PLA: 4 cycles.
    fn op_pla(&mut self, bus: &mut impl Bus) {
        match self.cycle {
            1 => self.target_cycle = 4,
            3 => self.regs.s = self.regs.s.wrapping_add(1),
            4 => {
                self.regs.a = self.read(bus, 0x0100 + u16::from(self.regs.s));
                self.update_nz(self.regs.a);
            }
            _ => {}
        }
    }

    /// PLP: 4 cycles; B is discarded on the way in.
    fn op_plp(&mut self, bus: &mut impl Bus) {
        match self.cycle {
            1 => self.target_cycle = 4,
            3 => self.regs.s = self.regs.s.wrapping_add(1),
            4 => {
                let p = self.read(bus, 0x0100 + u16::from(self.regs.s));
                self.regs.p.load_from_stack(p);
            }
            _ => {}
        }
    }

    /// JMP absolute: 3 cycles.
    fn op_jmp_abs(&mut self, bus: &mut impl Bus) {
        match self.cycle {
            1 => self.target_cycle = 3,
            2 => self.regs.pc = self.regs.pc.wrapping_add(1),
            3 => {
                let hi = self.read(bus, self.regs.pc);
                self.regs.pc = u16::from(self.operand) | (u16::from(hi) << 8);
            }
            _ => {}
        }
    }

    /// JMP indirect: 5 cycles, with the page-wrap bug: a pointer at $xxFF
    /// takes its high byte from $xx00.
    fn op_jmp_ind(&mut self, bus: &mut impl Bus) {
        match self.cycle {
            1 => self.target_cycle = 5,
            2 => self.regs.pc = self.regs.pc.wrapping_add(1),
            3 => {
                let hi = self.read(bus, self.regs.pc);
                self.addr = (u16::from(hi) << 8) | u16::from(self.operand);
                self.regs.pc = self.regs.pc.wrapping_add(1);
            }
            4 => self.operand = self.read(bus, self.addr),
            5 => {
                let hi_addr = (self.addr & 0xFF00) | (self.addr.wrapping_add(1) & 0x00FF);
                let hi = self.read(bus, hi_addr);
                self.regs.pc = (u16::from(hi) << 8) | u16::from(self.operand);
            }
            _ => {}
        }
    }
}
