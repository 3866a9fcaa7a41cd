//! End-to-end runs through the public API.
//!
//! The published functional and decimal test images are not vendored. Point
//! `MOS6502_FUNCTIONAL_IMAGE` / `MOS6502_DECIMAL_IMAGE` at the binaries and run
//! with `--ignored` to execute them.

use mos6502_core::{Cpu6502, FlatMemory, Memory6502, RunOutcome};
use std::env;

fn image_path(var: &str) -> Option<String> {
    match env::var(var) {
        Ok(path) => Some(path),
        Err(_) => {
            eprintln!("{} not set, skipping", var);
            None
        }
    }
}

#[test]
#[ignore]
fn functional_test_image_reaches_success_trap() {
    let Some(path) = image_path("MOS6502_FUNCTIONAL_IMAGE") else {
        return;
    };
    let mut mem = FlatMemory::new();
    mem.load_file(&path, 0x0000).expect("load functional image");
    let mut cpu = Cpu6502::new(mem);
    cpu.reset(0x0400);

    let outcome = cpu.run_until_trap(200_000_000);
    assert!(
        matches!(outcome, RunOutcome::Trapped { pc: 0x3469, .. }),
        "{:?} {}",
        outcome,
        cpu.registers()
    );
    assert_eq!(cpu.memory.read(0x0200), 0xF0);
}

#[test]
#[ignore]
fn decimal_test_image_reports_no_error() {
    let Some(path) = image_path("MOS6502_DECIMAL_IMAGE") else {
        return;
    };
    let mut mem = FlatMemory::new();
    mem.load_file(&path, 0x0200).expect("load decimal image");
    let mut cpu = Cpu6502::new(mem);
    cpu.reset(0x0200);

    let outcome = cpu.run_while(|c| c.pc >= 0x0200, 200_000_000);
    assert!(matches!(outcome, RunOutcome::Stopped { .. }), "{:?}", outcome);
    assert_eq!(cpu.memory.read(0x000B), 0);
}

#[test]
fn multiply_routine_runs_to_trap() {
    // 8x8 shift-and-add multiply of $10 * $0D into $12 (lo) / $13 (hi), then JMP *.
    #[rustfmt::skip]
    let program = [
        0xA9, 0x00,       // 0600 LDA #$00
        0x85, 0x13,       // 0602 STA $13
        0xA2, 0x08,       // 0604 LDX #$08
        0x46, 0x11,       // 0606 loop: LSR $11
        0x90, 0x03,       // 0608 BCC skip
        0x18,             // 060A CLC
        0x65, 0x10,       // 060B ADC $10
        0x6A,             // 060D skip: ROR A
        0x66, 0x12,       // 060E ROR $12
        0xCA,             // 0610 DEX
        0xD0, 0xF3,       // 0611 BNE loop
        0x85, 0x13,       // 0613 STA $13
        0x4C, 0x15, 0x06, // 0615 JMP $0615
    ];
    let mut mem = FlatMemory::new();
    mem.load_program(0x0600, &program);
    mem.write(0x0010, 0x10);
    mem.write(0x0011, 0x0D);
    let mut cpu = Cpu6502::new(mem);
    cpu.reset_from_vector();

    let outcome = cpu.run_until_trap(1_000);
    assert!(matches!(outcome, RunOutcome::Trapped { pc: 0x0615, .. }), "{:?}", outcome);
    let product = u16::from_le_bytes([cpu.memory.read(0x0012), cpu.memory.read(0x0013)]);
    assert_eq!(product, 0x10 * 0x0D);
}

#[test]
fn run_for_cycles_tracks_counter() {
    let mut mem = FlatMemory::new();
    // INX ; JMP $0600
    mem.load_program(0x0600, &[0xE8, 0x4C, 0x00, 0x06]);
    let mut cpu = Cpu6502::new(mem);
    cpu.reset_from_vector();
    let used = cpu.run_for_cycles(50);
    assert_eq!(used, 50);
    assert_eq!(cpu.cycles, 50);
    assert_eq!(cpu.x, 10);
}
