//! Behavioral tests for the 6502 core: stack discipline, interrupt
//! sequencing, RMW bus traffic, and the jam column.

use cpu_2a03::{Cpu, flags};
use nesdot_core::{Bus, SimpleBus};

/// Run one complete instruction (fetch through final cycle).
fn run_instruction(cpu: &mut Cpu, bus: &mut SimpleBus) {
    cpu.step(bus);
    for _ in 0..20 {
        if cpu.instruction_complete() {
            return;
        }
        cpu.step(bus);
    }
    panic!("instruction did not complete within 20 cycles");
}

/// Load a program at $0200 and point PC at it.
fn setup_program(bus: &mut SimpleBus, cpu: &mut Cpu, program: &[u8]) {
    bus.load(0x0200, program);
    cpu.regs.pc = 0x0200;
}

#[test]
fn lda_sta_roundtrip() {
    let mut bus = SimpleBus::new();
    let mut cpu = Cpu::new();

    let program = [
        0xA9, 0x42, // LDA #$42
        0x85, 0x10, // STA $10
    ];
    setup_program(&mut bus, &mut cpu, &program);

    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);

    assert_eq!(cpu.regs.a, 0x42);
    assert_eq!(bus.peek(0x0010), 0x42);
    assert!(!cpu.regs.p.is_set(flags::Z));
    assert!(!cpu.regs.p.is_set(flags::N));
}

#[test]
fn stack_pha_pla() {
    let mut bus = SimpleBus::new();
    let mut cpu = Cpu::new();

    let program = [
        0xA9, 0x42, // LDA #$42
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0x48, // PHA
        0xA9, 0x00, // LDA #$00
        0x68, // PLA
    ];
    setup_program(&mut bus, &mut cpu, &program);

    for _ in 0..6 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert_eq!(cpu.regs.a, 0x42, "PLA should restore A");
    assert_eq!(cpu.regs.s, 0xFF, "SP should be back after push/pull");
}

#[test]
fn stack_php_plp() {
    let mut bus = SimpleBus::new();
    let mut cpu = Cpu::new();

    let program = [
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0x38, // SEC
        0x08, // PHP
        0x18, // CLC
        0x28, // PLP
    ];
    setup_program(&mut bus, &mut cpu, &program);

    for _ in 0..6 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert!(cpu.regs.p.is_set(flags::C), "PLP should restore carry");
    assert_eq!(cpu.regs.s, 0xFF);
}

#[test]
fn brk_pushes_return_address_and_status() {
    let mut bus = SimpleBus::new();
    let mut cpu = Cpu::new();

    bus.write(0xFFFE, 0x00);
    bus.write(0xFFFF, 0x03);

    let program = [
        0xA2, 0xFF, // LDX #$FF   @ $0200
        0x9A, // TXS              @ $0202
        0x58, // CLI              @ $0203
        0x00, // BRK              @ $0204
        0xEA, // padding byte BRK skips
    ];
    setup_program(&mut bus, &mut cpu, &program);

    for _ in 0..4 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert_eq!(cpu.regs.pc, 0x0300, "PC should come from the BRK vector");
    assert_eq!(cpu.regs.s, 0xFC, "three pushes from $FF");
    assert!(cpu.regs.p.is_set(flags::I), "I should be set after BRK");

    // Return address skips the padding byte: $0206.
    assert_eq!(bus.peek(0x01FF), 0x02);
    assert_eq!(bus.peek(0x01FE), 0x06);
    // Pushed status has B and U set, I clear (we ran CLI).
    let pushed = bus.peek(0x01FD);
    assert_eq!(pushed & (flags::B | flags::U), flags::B | flags::U);
    assert_eq!(pushed & flags::I, 0);
}

#[test]
fn rti_returns_from_brk() {
    let mut bus = SimpleBus::new();
    let mut cpu = Cpu::new();

    bus.write(0xFFFE, 0x00);
    bus.write(0xFFFF, 0x03);
    bus.write(0x0300, 0x40); // RTI at the handler

    let program = [
        0xA2, 0xFF, // LDX #$FF
        0x9A, // TXS
        0x00, // BRK @ $0203
        0xEA, // padding
        0xEA, // BRK returns here ($0205)
    ];
    setup_program(&mut bus, &mut cpu, &program);

    for _ in 0..4 {
        run_instruction(&mut cpu, &mut bus);
    }

    assert_eq!(cpu.regs.pc, 0x0205, "RTI should land after the padding byte");
    assert_eq!(cpu.regs.s, 0xFF, "stack balanced");
}

/// Bus wrapper that records every write, to observe RMW's double write.
struct RecordingBus {
    inner: SimpleBus,
    writes: Vec<(u16, u8)>,
}

impl Bus for RecordingBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.inner.read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.writes.push((addr, value));
        self.inner.write(addr, value);
    }
}

#[test]
fn rmw_writes_unmodified_value_first() {
    let mut bus = RecordingBus {
        inner: SimpleBus::new(),
        writes: Vec::new(),
    };
    let mut cpu = Cpu::new();

    bus.inner.load(0x0200, &[0xE6, 0x10]); // INC $10
    bus.inner.write(0x0010, 0x41);
    cpu.regs.pc = 0x0200;

    for _ in 0..5 {
        cpu.step(&mut bus);
    }
    assert!(cpu.instruction_complete());

    // The unmodified value hits the bus before the incremented one.
    assert_eq!(bus.writes, vec![(0x0010, 0x41), (0x0010, 0x42)]);
    assert_eq!(bus.inner.peek(0x0010), 0x42);
}

#[test]
fn jmp_indirect_wraps_within_page() {
    let mut bus = SimpleBus::new();
    let mut cpu = Cpu::new();

    // Pointer at $02FF: low byte from $02FF, high byte from $0200, not
    // $0300.
    bus.write(0x02FF, 0x34);
    bus.write(0x0200, 0x12);
    bus.write(0x0300, 0x99); // Would be wrong

    bus.load(0x0400, &[0x6C, 0xFF, 0x02]);
    cpu.regs.pc = 0x0400;

    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.pc, 0x1234);
}

#[test]
fn jam_opcode_is_terminal() {
    let mut bus = SimpleBus::new();
    let mut cpu = Cpu::new();

    setup_program(&mut bus, &mut cpu, &[0x02, 0xEA, 0xEA]);

    cpu.step(&mut bus);
    assert!(cpu.is_jammed());
    let pc = cpu.regs.pc;

    for _ in 0..50 {
        cpu.step(&mut bus);
    }
    assert!(cpu.is_jammed());
    assert_eq!(cpu.regs.pc, pc, "a jammed CPU makes no progress");

    // Reset is the only way out.
    cpu.reset();
    assert!(!cpu.is_jammed());
}

#[test]
fn nmi_defers_to_poll_point_then_runs_seven_cycles() {
    let mut bus = SimpleBus::new();
    let mut cpu = Cpu::new();

    bus.write(0xFFFA, 0x00);
    bus.write(0xFFFB, 0x05); // NMI vector → $0500
    bus.write(0xFFFE, 0x00);
    bus.write(0xFFFF, 0x07); // IRQ vector → $0700 (must not be used)

    cpu.regs.s = 0xFF;
    // LDA $0010 (4 cycles), then NOPs.
    setup_program(&mut bus, &mut cpu, &[0xAD, 0x10, 0x00, 0xEA, 0xEA]);

    // Cycle 1 of LDA.
    cpu.step(&mut bus);
    // NMI falls during cycle 2; the edge is detected but service waits
    // for the instruction's poll point.
    cpu.set_nmi_line(true);
    cpu.step(&mut bus);
    assert!(!cpu.instruction_complete());
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert!(cpu.instruction_complete(), "LDA must finish first");
    assert_eq!(cpu.regs.a, 0x00);

    // The next fetch is replaced by the 7-cycle forced sequence.
    for _ in 0..7 {
        cpu.step(&mut bus);
    }
    assert!(cpu.instruction_complete());
    assert_eq!(cpu.regs.pc, 0x0500, "must use the NMI vector");

    // Pushed return address is the interrupted instruction's address.
    assert_eq!(bus.peek(0x01FF), 0x02);
    assert_eq!(bus.peek(0x01FE), 0x03);
    // Pushed status has B clear for a hardware interrupt.
    let pushed = bus.peek(0x01FD);
    assert_eq!(pushed & flags::B, 0);
    assert_eq!(pushed & flags::U, flags::U);
    assert!(cpu.regs.p.is_set(flags::I));
}

#[test]
fn nmi_after_poll_point_waits_one_more_instruction() {
    let mut bus = SimpleBus::new();
    let mut cpu = Cpu::new();

    bus.write(0xFFFA, 0x00);
    bus.write(0xFFFB, 0x05);

    cpu.regs.s = 0xFF;
    setup_program(&mut bus, &mut cpu, &[0xAD, 0x10, 0x00, 0xEA, 0xEA]);

    // Let the LDA pass its poll point (cycle 3) before asserting.
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.set_nmi_line(true);
    cpu.step(&mut bus);
    assert!(cpu.instruction_complete());

    // The NOP at $0203 still runs...
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.pc, 0x0204);

    // ...and only then does the sequence fire.
    for _ in 0..7 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.regs.pc, 0x0500);
}

#[test]
fn irq_respects_interrupt_disable() {
    let mut bus = SimpleBus::new();
    let mut cpu = Cpu::new();

    bus.write(0xFFFE, 0x00);
    bus.write(0xFFFF, 0x07);

    cpu.regs.s = 0xFF;
    setup_program(&mut bus, &mut cpu, &[0xEA, 0xEA, 0xEA, 0xEA]);
    cpu.set_irq_line(true);

    // I is set at power-on: the level request is ignored.
    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.pc, 0x0202);

    // Clear I: the held line is serviced after the next instruction.
    cpu.regs.p.clear(flags::I);
    run_instruction(&mut cpu, &mut bus);
    for _ in 0..7 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.regs.pc, 0x0700);
    assert!(cpu.regs.p.is_set(flags::I), "servicing sets I");
}

#[test]
fn nmi_wins_when_both_lines_pend() {
    let mut bus = SimpleBus::new();
    let mut cpu = Cpu::new();

    bus.write(0xFFFA, 0x00);
    bus.write(0xFFFB, 0x05);
    bus.write(0xFFFE, 0x00);
    bus.write(0xFFFF, 0x07);

    cpu.regs.s = 0xFF;
    cpu.regs.p.clear(flags::I);
    setup_program(&mut bus, &mut cpu, &[0xEA, 0xEA, 0xEA]);

    cpu.set_irq_line(true);
    cpu.set_nmi_line(true);

    // One instruction for the edge to latch, one that polls it.
    run_instruction(&mut cpu, &mut bus);
    run_instruction(&mut cpu, &mut bus);
    for _ in 0..7 {
        cpu.step(&mut bus);
    }
    assert_eq!(cpu.regs.pc, 0x0500, "NMI vector must win");
}

#[test]
fn rdy_low_halts_on_the_next_read() {
    let mut bus = SimpleBus::new();
    let mut cpu = Cpu::new();

    setup_program(&mut bus, &mut cpu, &[0xAD, 0x10, 0x00, 0xEA]); // LDA $0010
    bus.write(0x0010, 0x77);

    cpu.step(&mut bus);
    cpu.set_rdy(false);
    // The next read completes but leaves the CPU halted.
    cpu.step(&mut bus);
    assert!(cpu.is_halted());

    // Halted steps are bus-refresh reads; no progress is made.
    for _ in 0..10 {
        cpu.step(&mut bus);
    }
    assert!(cpu.is_halted());
    assert!(!cpu.instruction_complete());

    // Restoring RDY releases the halt and the instruction finishes.
    cpu.set_rdy(true);
    cpu.step(&mut bus); // clears the halt
    assert!(!cpu.is_halted());
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert!(cpu.instruction_complete());
    assert_eq!(cpu.regs.a, 0x77);
}
