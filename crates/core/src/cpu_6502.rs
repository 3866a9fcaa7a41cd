//! MOS 6502 CPU core implementation
//!
//! This module provides a reusable, generic NMOS 6502 execution engine that any
//! host can drive by implementing the `Memory6502` trait. Decoding is table
//! driven: the opcode byte selects an (operation, addressing mode, base cycles)
//! entry from [`OPCODE_TABLE`], the mode is resolved, and the operation runs.
//!
//! Undocumented opcodes are implemented. The twelve JAM opcodes, which lock
//! real silicon, are executed as no-ops and reported through
//! [`Cpu6502::take_diagnostic`] and the `Unofficial` log category.

mod addressing;
mod execute;
mod opcodes;

pub use addressing::{AddressingMode, Operand};
pub use opcodes::{decode, OpcodeEntry, Operation, OPCODE_TABLE};

use crate::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory interface trait for the 6502 CPU
///
/// Hosts implement this to provide the 64K address space. Calls must not
/// re-enter the CPU.
pub trait Memory6502 {
    /// Read a byte from memory at the given address
    fn read(&self, addr: u16) -> u8;

    /// Write a byte to memory at the given address
    fn write(&mut self, addr: u16, val: u8);
}

pub const FLAG_C: u8 = 0x01; // Carry
pub const FLAG_Z: u8 = 0x02; // Zero
pub const FLAG_I: u8 = 0x04; // Interrupt disable
pub const FLAG_D: u8 = 0x08; // Decimal
pub const FLAG_B: u8 = 0x10; // Break (only exists in pushed copies)
pub const FLAG_U: u8 = 0x20; // Unused, reads as 1
pub const FLAG_V: u8 = 0x40; // Overflow
pub const FLAG_N: u8 = 0x80; // Negative

pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

/// Cycles taken to enter an IRQ or NMI handler.
const INTERRUPT_CYCLES: u32 = 7;

/// Notice raised by the last executed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// A JAM opcode was executed as a no-op instead of halting.
    Jam { opcode: u8, pc: u16 },
    /// An opcode whose real-hardware result is unstable; the result is a
    /// best-effort approximation.
    Unstable { opcode: u8, pc: u16 },
}

/// How a bounded run loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// An instruction left PC unchanged (`JMP *`, branch-to-self).
    Trapped { pc: u16, instructions: u64 },
    /// The caller's predicate asked to stop.
    Stopped { pc: u16, instructions: u64 },
    /// The instruction limit was reached first.
    LimitReached { pc: u16, instructions: u64 },
}

/// Serializable snapshot of the programmer-visible registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
    pub cycles: u64,
}

impl Registers {
    /// Status rendered as `NV-BDIZC`, with `.` for clear bits.
    pub fn status_pattern(&self) -> String {
        const NAMES: [char; 8] = ['N', 'V', '-', 'B', 'D', 'I', 'Z', 'C'];
        NAMES
            .iter()
            .enumerate()
            .map(|(i, &c)| if self.status & (0x80 >> i) != 0 { c } else { '.' })
            .collect()
    }
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A={:02X} X={:02X} Y={:02X} SP={:02X} PC={:04X} P={:02X} {} CYC={}",
            self.a,
            self.x,
            self.y,
            self.sp,
            self.pc,
            self.status,
            self.status_pattern(),
            self.cycles
        )
    }
}

/// MOS 6502 CPU state and execution engine
///
/// Generic over the memory bus; the CPU owns its bus value but never its
/// contents' meaning.
#[derive(Debug)]
pub struct Cpu6502<M: Memory6502> {
    /// Accumulator register
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// Stack pointer (points to 0x0100 + sp)
    pub sp: u8,
    /// Status register (NV-BDIZC)
    pub status: u8,
    /// Program counter
    pub pc: u16,
    /// Total cycles executed
    pub cycles: u64,
    /// Memory interface
    pub memory: M,
    /// Set by indexed address resolution, consumed by the cycle accountant.
    page_crossed: bool,
    /// Notice raised by the instruction that just ran.
    diagnostic: Option<Diagnostic>,
}

impl<M: Memory6502> Cpu6502<M> {
    /// Create a new 6502 CPU with the given memory interface
    pub fn new(memory: M) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFF,
            status: FLAG_U,
            pc: 0,
            cycles: 0,
            memory,
            page_crossed: false,
            diagnostic: None,
        }
    }

    /// Reset registers and start execution at `entry`. Memory is preserved.
    pub fn reset(&mut self, entry: u16) {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = 0xFF;
        self.status = FLAG_U;
        self.pc = entry;
        self.cycles = 0;
        self.page_crossed = false;
        self.diagnostic = None;
    }

    /// Reset and start at the address held in the reset vector ($FFFC).
    pub fn reset_from_vector(&mut self) {
        let entry = self.read_u16(RESET_VECTOR);
        self.reset(entry);
    }

    pub fn registers(&self) -> Registers {
        Registers {
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            pc: self.pc,
            status: self.status,
            cycles: self.cycles,
        }
    }

    pub fn restore_registers(&mut self, regs: &Registers) {
        self.a = regs.a;
        self.x = regs.x;
        self.y = regs.y;
        self.sp = regs.sp;
        self.pc = regs.pc;
        self.status = regs.status | FLAG_U;
        self.cycles = regs.cycles;
    }

    /// Take the notice raised by the most recent `step()`, if any.
    pub fn take_diagnostic(&mut self) -> Option<Diagnostic> {
        self.diagnostic.take()
    }

    #[inline]
    pub fn flag(&self, mask: u8) -> bool {
        (self.status & mask) != 0
    }

    #[inline]
    pub(crate) fn set_flag(&mut self, mask: u8, on: bool) {
        if on {
            self.status |= mask;
        } else {
            self.status &= !mask;
        }
    }

    #[inline]
    pub(crate) fn set_zero_and_negative(&mut self, v: u8) {
        self.set_flag(FLAG_Z, v == 0);
        self.set_flag(FLAG_N, (v & 0x80) != 0);
    }

    /// PLP/RTI: B does not exist as a latch, bit 5 always reads back as 1.
    #[inline]
    pub(crate) fn restore_status(&mut self, pulled: u8) {
        self.status = (pulled & !FLAG_B) | FLAG_U;
    }

    /// Read a byte from memory
    #[inline]
    fn read(&self, addr: u16) -> u8 {
        self.memory.read(addr)
    }

    /// Write a byte to memory
    #[inline]
    fn write(&mut self, addr: u16, val: u8) {
        self.memory.write(addr, val);
    }

    fn read_u16(&self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi = self.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    #[inline]
    fn fetch_u8(&mut self) -> u8 {
        let v = self.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        v
    }

    #[inline]
    fn fetch_u16(&mut self) -> u16 {
        let lo = self.fetch_u8() as u16;
        let hi = self.fetch_u8() as u16;
        (hi << 8) | lo
    }

    #[inline]
    fn push_u8(&mut self, v: u8) {
        let addr = 0x0100u16.wrapping_add(self.sp as u16);
        self.write(addr, v);
        self.sp = self.sp.wrapping_sub(1);
    }

    #[inline]
    fn pop_u8(&mut self) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        let addr = 0x0100u16.wrapping_add(self.sp as u16);
        self.read(addr)
    }

    #[inline]
    fn push_u16(&mut self, v: u16) {
        self.push_u8((v >> 8) as u8);
        self.push_u8(v as u8);
    }

    #[inline]
    fn pop_u16(&mut self) -> u16 {
        let lo = self.pop_u8() as u16;
        let hi = self.pop_u8() as u16;
        (hi << 8) | lo
    }

    /// Push PC and status (B clear), set I and jump through `vector`.
    fn enter_interrupt(&mut self, vector: u16) -> u32 {
        self.push_u16(self.pc);
        self.push_u8((self.status & !FLAG_B) | FLAG_U);
        self.status |= FLAG_I;
        self.pc = self.read_u16(vector);
        self.cycles += INTERRUPT_CYCLES as u64;
        INTERRUPT_CYCLES
    }

    /// Service a maskable interrupt request. Returns the cycles used, or 0
    /// when the I flag masks the request.
    pub fn irq(&mut self) -> u32 {
        if self.flag(FLAG_I) {
            log(LogCategory::Interrupts, LogLevel::Debug, || {
                format!("IRQ masked at PC={:04X}", self.pc)
            });
            return 0;
        }
        let from = self.pc;
        let used = self.enter_interrupt(IRQ_VECTOR);
        log(LogCategory::Interrupts, LogLevel::Debug, || {
            format!("IRQ taken at PC={:04X}, handler {:04X}", from, self.pc)
        });
        used
    }

    /// Service a non-maskable interrupt. Always taken.
    pub fn nmi(&mut self) -> u32 {
        let from = self.pc;
        let used = self.enter_interrupt(NMI_VECTOR);
        log(LogCategory::Interrupts, LogLevel::Debug, || {
            format!("NMI taken at PC={:04X}, handler {:04X}", from, self.pc)
        });
        used
    }

    /// Execute one instruction and return cycles used.
    pub fn step(&mut self) -> u32 {
        self.page_crossed = false;
        self.diagnostic = None;

        let pc = self.pc;
        let opcode = self.fetch_u8();
        let entry = decode(opcode);
        log(LogCategory::CPU, LogLevel::Trace, || {
            format!(
                "{:04X}  {:02X}  {:<4} {}",
                pc,
                opcode,
                entry.operation.mnemonic(),
                Registers { pc, ..self.registers() }
            )
        });

        let operand = self.resolve(entry.mode);
        let mut used = entry.cycles as u32 + self.execute(opcode, pc, entry.operation, operand);
        if self.page_crossed && entry.operation.pays_page_cross_penalty() {
            used += 1;
        }
        self.page_crossed = false;

        self.cycles += used as u64;
        used
    }

    /// Step until at least `budget` cycles have elapsed. Returns the cycles
    /// actually consumed, which may overshoot by part of one instruction.
    pub fn run_for_cycles(&mut self, budget: u64) -> u64 {
        let start = self.cycles;
        while self.cycles - start < budget {
            self.step();
        }
        self.cycles - start
    }

    /// Step until an instruction jumps to itself or `max_instructions` have run.
    pub fn run_until_trap(&mut self, max_instructions: u64) -> RunOutcome {
        let mut instructions = 0;
        while instructions < max_instructions {
            let before = self.pc;
            self.step();
            instructions += 1;
            if self.pc == before {
                return RunOutcome::Trapped {
                    pc: before,
                    instructions,
                };
            }
        }
        RunOutcome::LimitReached {
            pc: self.pc,
            instructions,
        }
    }

    /// Step while `keep_going` holds, trapping on self-jumps like
    /// [`run_until_trap`](Self::run_until_trap).
    pub fn run_while<F>(&mut self, mut keep_going: F, max_instructions: u64) -> RunOutcome
    where
        F: FnMut(&Self) -> bool,
    {
        let mut instructions = 0;
        while instructions < max_instructions {
            if !keep_going(self) {
                return RunOutcome::Stopped {
                    pc: self.pc,
                    instructions,
                };
            }
            let before = self.pc;
            self.step();
            instructions += 1;
            if self.pc == before {
                return RunOutcome::Trapped {
                    pc: before,
                    instructions,
                };
            }
        }
        RunOutcome::LimitReached {
            pc: self.pc,
            instructions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FlatMemory;

    mod tests_alu;
    mod tests_control;
    mod tests_cycles;
    mod tests_decimal;
    mod tests_load_store;
    mod tests_stack;
    mod tests_unofficial;

    /// CPU with `program` loaded at $8000 and PC pointing at it.
    pub(super) fn cpu_with(program: &[u8]) -> Cpu6502<FlatMemory> {
        let mut mem = FlatMemory::new();
        mem.load_program(0x8000, program);
        let mut cpu = Cpu6502::new(mem);
        cpu.reset_from_vector();
        cpu
    }

    #[test]
    fn reset_state() {
        let mut cpu = Cpu6502::new(FlatMemory::new());
        cpu.a = 1;
        cpu.cycles = 99;
        cpu.reset(0x0400);
        assert_eq!(cpu.a, 0);
        assert_eq!(cpu.x, 0);
        assert_eq!(cpu.y, 0);
        assert_eq!(cpu.sp, 0xFF);
        assert_eq!(cpu.status, 0x20);
        assert_eq!(cpu.pc, 0x0400);
        assert_eq!(cpu.cycles, 0);
    }

    #[test]
    fn reset_from_vector_reads_fffc() {
        let cpu = cpu_with(&[0xEA]);
        assert_eq!(cpu.pc, 0x8000);
    }

    #[test]
    fn lda_immediate_sets_a_and_flags() {
        let mut cpu = cpu_with(&[0xA9, 0x05, 0xEA]);
        assert_eq!(cpu.step(), 2);
        assert_eq!(cpu.a, 5);
        assert_eq!(cpu.status & FLAG_Z, 0);
        assert_eq!(cpu.step(), 2);
        assert_eq!(cpu.pc, 0x8003);
        assert_eq!(cpu.cycles, 4);
    }

    #[test]
    fn pc_advances_by_instruction_length() {
        // Every opcode that does not redirect control flow moves PC by its length.
        for opcode in 0..=255u8 {
            let entry = decode(opcode);
            if matches!(
                entry.operation,
                Operation::Jmp
                    | Operation::Jsr
                    | Operation::Rts
                    | Operation::Rti
                    | Operation::Brk
                    | Operation::Bcc
                    | Operation::Bcs
                    | Operation::Beq
                    | Operation::Bne
                    | Operation::Bmi
                    | Operation::Bpl
                    | Operation::Bvc
                    | Operation::Bvs
            ) {
                continue;
            }
            let mut cpu = cpu_with(&[opcode, 0x10, 0x20]);
            cpu.step();
            assert_eq!(
                cpu.pc,
                0x8000 + entry.len(),
                "opcode {:02X} ({})",
                opcode,
                entry.operation.mnemonic()
            );
        }
    }

    #[test]
    fn every_opcode_costs_at_least_its_base() {
        for opcode in 0..=255u8 {
            let mut cpu = cpu_with(&[opcode, 0x10, 0x20]);
            let used = cpu.step();
            assert!(used >= decode(opcode).cycles as u32, "opcode {:02X}", opcode);
            assert_eq!(cpu.cycles, used as u64);
        }
    }

    #[test]
    fn jam_is_a_diagnosed_nop() {
        let mut cpu = cpu_with(&[0x02, 0xEA]);
        cpu.a = 0x42;
        assert_eq!(cpu.step(), 2);
        assert_eq!(cpu.pc, 0x8001);
        assert_eq!(cpu.a, 0x42);
        assert_eq!(
            cpu.take_diagnostic(),
            Some(Diagnostic::Jam {
                opcode: 0x02,
                pc: 0x8000
            })
        );
        assert_eq!(cpu.take_diagnostic(), None);
        cpu.step();
        assert_eq!(cpu.take_diagnostic(), None);
    }

    #[test]
    fn registers_roundtrip_through_json() {
        let mut cpu = cpu_with(&[0xA9, 0x80]);
        cpu.step();
        let regs = cpu.registers();
        let s = serde_json::to_string(&regs).expect("serialize");
        let back: Registers = serde_json::from_str(&s).expect("deserialize");
        assert_eq!(back, regs);

        let mut other = Cpu6502::new(FlatMemory::new());
        other.restore_registers(&back);
        assert_eq!(other.registers(), regs);
    }

    #[test]
    fn status_pattern_rendering() {
        let regs = Registers {
            status: 0xA3,
            ..Registers::default()
        };
        assert_eq!(regs.status_pattern(), "N.-...ZC");
        let line = regs.to_string();
        assert!(line.contains("P=A3"));
    }

    #[test]
    fn run_until_trap_stops_on_jmp_self() {
        // INX ; INX ; JMP $8002
        let mut cpu = cpu_with(&[0xE8, 0xE8, 0x4C, 0x02, 0x80]);
        let outcome = cpu.run_until_trap(100);
        assert_eq!(
            outcome,
            RunOutcome::Trapped {
                pc: 0x8002,
                instructions: 3
            }
        );
        assert_eq!(cpu.x, 2);
    }

    #[test]
    fn run_until_trap_respects_limit() {
        // INX ; JMP $8000
        let mut cpu = cpu_with(&[0xE8, 0x4C, 0x00, 0x80]);
        let outcome = cpu.run_until_trap(10);
        assert!(matches!(
            outcome,
            RunOutcome::LimitReached {
                instructions: 10,
                ..
            }
        ));
        assert_eq!(cpu.x, 5);
    }

    #[test]
    fn run_while_stops_on_predicate() {
        let mut cpu = cpu_with(&[0xE8, 0xE8, 0xE8, 0xE8]);
        let outcome = cpu.run_while(|c| c.x < 3, 100);
        assert_eq!(
            outcome,
            RunOutcome::Stopped {
                pc: 0x8003,
                instructions: 3
            }
        );
    }

    #[test]
    fn run_for_cycles_reaches_budget() {
        let mut cpu = cpu_with(&[0xEA; 16]);
        assert_eq!(cpu.run_for_cycles(10), 10);
        assert_eq!(cpu.pc, 0x8005);
        // Overshoot by a partial instruction is allowed.
        assert_eq!(cpu.run_for_cycles(3), 4);
    }
}
