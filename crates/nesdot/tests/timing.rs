//! System-level timing: DMA cycle stealing and the basic execute path.

use cpu_2a03::Cpu;
use nesdot::{OamDma, System, SystemBus, SystemConfig};
use nesdot_core::Bus;
use ppu_2c02::{PALETTE_SIZE, Palette};

/// NROM image with the given code at $8000 and the reset vector on it.
fn build_rom(code: &[u8]) -> Vec<u8> {
    let prg_size = 32 * 1024;
    let mut rom = vec![0u8; 16 + prg_size + 8 * 1024];
    rom[0..4].copy_from_slice(b"NES\x1a");
    rom[4] = 2;
    rom[5] = 1;
    rom[16..16 + code.len()].copy_from_slice(code);
    rom[16 + 0x7FFC] = 0x00;
    rom[16 + 0x7FFD] = 0x80;
    rom
}

#[test]
fn lda_sta_loop_executes_without_jamming() {
    // LDA #$42; STA $00; idle: JMP idle
    let rom = build_rom(&[
        0xA9, 0x42, // $8000
        0x85, 0x00, // $8002
        0x4C, 0x04, 0x80, // $8004
    ]);
    let mut system = System::new(SystemConfig {
        rom_data: rom,
        palette_data: vec![0; PALETTE_SIZE],
    })
    .expect("image parses");

    // LDA (2) + STA (3) are done well within 20 CPU cycles = 60 dots.
    for _ in 0..60 {
        system.step_dot();
    }
    assert_eq!(system.cpu().regs.a, 0x42);
    assert_eq!(system.bus().peek_ram(0x0000), 0x42);
    assert!(!system.cpu().is_jammed());

    // The JMP spins forever without jamming.
    for _ in 0..3000 {
        system.step_dot();
    }
    assert!(!system.cpu().is_jammed());
    let pc = system.cpu().regs.pc;
    assert!(
        (0x8004..=0x8006).contains(&pc),
        "expected the idle loop, PC=${pc:04X}"
    );
}

/// Build the raw parts for driving DMA by hand: a NOP-sled cartridge, a
/// bus, and a CPU already fetching from $8000.
fn dma_fixture() -> (Cpu, SystemBus, OamDma) {
    let rom = build_rom(&vec![0xEA; 0x100]);
    let cartridge = nesdot_cartridge::load(&rom).expect("image parses");
    let palette = Palette::from_bytes(vec![0; PALETTE_SIZE]).expect("palette");
    let mut bus = SystemBus::new(cartridge, palette);

    let mut cpu = Cpu::new();
    let lo = bus.read(0xFFFC);
    let hi = bus.read(0xFFFD);
    cpu.regs.pc = u16::from_le_bytes([lo, hi]);

    (cpu, bus, OamDma::new())
}

/// Run CPU cycles with the DMA engine in front, counting how many end
/// with the CPU halted. `warmup_cycles` shifts the get/put parity the
/// trigger lands on.
fn stolen_cycles(warmup_cycles: u32) -> u32 {
    let (mut cpu, mut bus, mut dma) = dma_fixture();

    // Known data in page 2 so the transfer is verifiable.
    for i in 0..256u16 {
        bus.write(0x0200 + i, i as u8);
    }

    for _ in 0..warmup_cycles {
        dma.step(&mut cpu, &mut bus);
        cpu.step(&mut bus);
    }

    bus.dma_request = Some(0x02);

    let mut halted = 0;
    let mut seen_active = false;
    for _ in 0..600 {
        dma.step(&mut cpu, &mut bus);
        cpu.step(&mut bus);
        if dma.is_active() {
            seen_active = true;
        }
        if cpu.is_halted() {
            halted += 1;
            assert!(
                seen_active || dma.is_active(),
                "halt must come from the DMA engine"
            );
        }
        if seen_active && !dma.is_active() && !cpu.is_halted() {
            break;
        }
    }

    // The copy landed: OAM[i] == page 2 byte i, read back via $2003/$2004.
    for i in [0u8, 1, 127, 255] {
        bus.write(0x2003, i);
        assert_eq!(bus.read(0x2004), i, "OAM byte {i} wrong after DMA");
    }

    halted
}

#[test]
fn dma_aligned_trigger_steals_512_cycles() {
    assert_eq!(stolen_cycles(1), 512);
}

#[test]
fn dma_misaligned_trigger_steals_513_cycles() {
    assert_eq!(stolen_cycles(2), 513);
}

#[test]
fn cpu_runs_freely_without_dma() {
    let (mut cpu, mut bus, mut dma) = dma_fixture();
    for _ in 0..100 {
        dma.step(&mut cpu, &mut bus);
        cpu.step(&mut bus);
        assert!(!cpu.is_halted());
    }
    assert!(cpu.regs.pc > 0x8000, "NOP sled should make progress");
}
