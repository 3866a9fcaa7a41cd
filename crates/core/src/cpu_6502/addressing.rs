//! Addressing-mode resolution for the 6502.
//!
//! Each mode consumes its operand bytes from the instruction stream and yields
//! an [`Operand`]. Indexed modes record page crossings on the CPU so the cycle
//! accountant can charge the extra cycle once the instruction has executed.

use super::{Cpu6502, Memory6502};

/// The thirteen 6502 addressing modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// JMP only. Reproduces the NMOS page-wrap bug.
    Indirect,
    /// (zp,X)
    IndirectX,
    /// (zp),Y
    IndirectY,
    /// Signed branch offset.
    Relative,
}

impl AddressingMode {
    /// Number of instruction-stream bytes that follow the opcode.
    pub const fn operand_bytes(self) -> u16 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 0,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::IndirectX
            | AddressingMode::IndirectY
            | AddressingMode::Relative => 1,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 2,
        }
    }
}

/// Result of resolving an addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Implied: nothing was consumed.
    None,
    /// The instruction works on the accumulator.
    Accumulator,
    /// Literal byte taken from the instruction stream.
    Immediate(u8),
    /// Effective memory address.
    Address(u16),
    /// Branch displacement.
    Relative(i8),
}

impl<M: Memory6502> Cpu6502<M> {
    /// Resolve `mode`, consuming its operand bytes and advancing PC.
    pub(crate) fn resolve(&mut self, mode: AddressingMode) -> Operand {
        match mode {
            AddressingMode::Implied => Operand::None,
            AddressingMode::Accumulator => Operand::Accumulator,
            AddressingMode::Immediate => Operand::Immediate(self.fetch_u8()),
            AddressingMode::Relative => Operand::Relative(self.fetch_u8() as i8),
            AddressingMode::ZeroPage => Operand::Address(self.fetch_u8() as u16),
            AddressingMode::ZeroPageX => Operand::Address(self.addr_zero_page_indexed(self.x)),
            AddressingMode::ZeroPageY => Operand::Address(self.addr_zero_page_indexed(self.y)),
            AddressingMode::Absolute => Operand::Address(self.fetch_u16()),
            AddressingMode::AbsoluteX => Operand::Address(self.addr_absolute_indexed(self.x)),
            AddressingMode::AbsoluteY => Operand::Address(self.addr_absolute_indexed(self.y)),
            AddressingMode::Indirect => {
                let ptr = self.fetch_u16();
                Operand::Address(self.read_indirect_u16_bug(ptr))
            }
            AddressingMode::IndirectX => Operand::Address(self.addr_indirect_x()),
            AddressingMode::IndirectY => Operand::Address(self.addr_indirect_y()),
        }
    }

    /// Zero-page base plus index, never leaving page zero.
    #[inline]
    fn addr_zero_page_indexed(&mut self, index: u8) -> u16 {
        let zp = self.fetch_u8();
        zp.wrapping_add(index) as u16
    }

    #[inline]
    fn addr_absolute_indexed(&mut self, index: u8) -> u16 {
        let base = self.fetch_u16();
        let addr = base.wrapping_add(index as u16);
        self.note_page_cross(base, addr);
        addr
    }

    /// (Indirect,X): operand plus X selects a zero-page pointer.
    #[inline]
    fn addr_indirect_x(&mut self) -> u16 {
        let zp = self.fetch_u8().wrapping_add(self.x);
        self.read_zero_page_u16(zp)
    }

    /// (Indirect),Y: zero-page pointer gives the base, Y is added afterwards.
    #[inline]
    fn addr_indirect_y(&mut self) -> u16 {
        let zp = self.fetch_u8();
        let base = self.read_zero_page_u16(zp);
        let addr = base.wrapping_add(self.y as u16);
        self.note_page_cross(base, addr);
        addr
    }

    /// Little-endian pointer stored in zero page; the high byte wraps to $00.
    #[inline]
    fn read_zero_page_u16(&self, zp: u8) -> u16 {
        let lo = self.read(zp as u16) as u16;
        let hi = self.read(zp.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    /// Read a 16-bit pointer for JMP (indirect) with the 6502 page-wrapping bug.
    ///
    /// A pointer at $xxFF takes its high byte from $xx00, not from the next page.
    #[inline]
    pub(crate) fn read_indirect_u16_bug(&self, addr: u16) -> u16 {
        let lo = self.read(addr) as u16;
        let hi_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
        let hi = self.read(hi_addr) as u16;
        (hi << 8) | lo
    }

    #[inline]
    fn note_page_cross(&mut self, base: u16, addr: u16) {
        if (base & 0xFF00) != (addr & 0xFF00) {
            self.page_crossed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FlatMemory;

    fn cpu_at(program: &[u8]) -> Cpu6502<FlatMemory> {
        let mut mem = FlatMemory::new();
        mem.load_program(0x0600, program);
        let mut cpu = Cpu6502::new(mem);
        cpu.reset(0x0600);
        cpu
    }

    #[test]
    fn operand_byte_counts() {
        assert_eq!(AddressingMode::Implied.operand_bytes(), 0);
        assert_eq!(AddressingMode::Accumulator.operand_bytes(), 0);
        assert_eq!(AddressingMode::Relative.operand_bytes(), 1);
        assert_eq!(AddressingMode::IndirectY.operand_bytes(), 1);
        assert_eq!(AddressingMode::Indirect.operand_bytes(), 2);
        assert_eq!(AddressingMode::AbsoluteY.operand_bytes(), 2);
    }

    #[test]
    fn zero_page_x_wraps_inside_page_zero() {
        let mut cpu = cpu_at(&[0xF0]);
        cpu.x = 0x20;
        assert_eq!(cpu.resolve(AddressingMode::ZeroPageX), Operand::Address(0x0010));
        assert_eq!(cpu.pc, 0x0601);
    }

    #[test]
    fn zero_page_y_wraps_inside_page_zero() {
        let mut cpu = cpu_at(&[0xFF]);
        cpu.y = 0x01;
        assert_eq!(cpu.resolve(AddressingMode::ZeroPageY), Operand::Address(0x0000));
    }

    #[test]
    fn absolute_x_flags_page_cross() {
        let mut cpu = cpu_at(&[0xFF, 0x20]);
        cpu.x = 1;
        assert_eq!(cpu.resolve(AddressingMode::AbsoluteX), Operand::Address(0x2100));
        assert!(cpu.page_crossed);

        let mut cpu = cpu_at(&[0x00, 0x20]);
        cpu.x = 1;
        assert_eq!(cpu.resolve(AddressingMode::AbsoluteX), Operand::Address(0x2001));
        assert!(!cpu.page_crossed);
    }

    #[test]
    fn absolute_y_wraps_at_top_of_memory() {
        let mut cpu = cpu_at(&[0xFF, 0xFF]);
        cpu.y = 2;
        assert_eq!(cpu.resolve(AddressingMode::AbsoluteY), Operand::Address(0x0001));
        assert!(cpu.page_crossed);
    }

    #[test]
    fn indirect_x_pointer_wraps_at_zero_page_end() {
        let mut cpu = cpu_at(&[0xFE]);
        cpu.x = 1;
        cpu.memory.write(0x00FF, 0x34);
        cpu.memory.write(0x0000, 0x12);
        assert_eq!(cpu.resolve(AddressingMode::IndirectX), Operand::Address(0x1234));
    }

    #[test]
    fn indirect_y_adds_index_after_dereference() {
        let mut cpu = cpu_at(&[0xFF]);
        cpu.y = 0x10;
        cpu.memory.write(0x00FF, 0xF8);
        cpu.memory.write(0x0000, 0x30);
        assert_eq!(cpu.resolve(AddressingMode::IndirectY), Operand::Address(0x3108));
        assert!(cpu.page_crossed);
    }

    #[test]
    fn indirect_reads_high_byte_from_same_page() {
        let mut cpu = cpu_at(&[0xFF, 0x30]);
        cpu.memory.write(0x30FF, 0x80);
        cpu.memory.write(0x3000, 0x40);
        cpu.memory.write(0x3100, 0x50);
        assert_eq!(cpu.resolve(AddressingMode::Indirect), Operand::Address(0x4080));
    }

    #[test]
    fn relative_offset_is_signed() {
        let mut cpu = cpu_at(&[0xFE]);
        assert_eq!(cpu.resolve(AddressingMode::Relative), Operand::Relative(-2));
    }

    #[test]
    fn fetch_wraps_program_counter() {
        let mut cpu = cpu_at(&[]);
        cpu.memory.write(0xFFFF, 0x42);
        cpu.pc = 0xFFFF;
        assert_eq!(cpu.resolve(AddressingMode::Immediate), Operand::Immediate(0x42));
        assert_eq!(cpu.pc, 0x0000);
    }
}
