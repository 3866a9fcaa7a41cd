//! The 256-entry NMOS 6502 opcode table.
//!
//! Every byte decodes to an entry, including undocumented opcodes and the
//! JAM group. Cycle counts are base costs; page-cross and branch penalties are
//! added at execution time.

use super::addressing::AddressingMode;
use AddressingMode::*;

/// Operation performed by an opcode, independent of its addressing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
    // Undocumented, stable
    /// ASL then ORA
    Slo,
    /// ROL then AND
    Rla,
    /// LSR then EOR
    Sre,
    /// ROR then ADC
    Rra,
    /// Store A & X
    Sax,
    /// LDA and LDX from the same operand
    Lax,
    /// DEC then CMP
    Dcp,
    /// INC then SBC
    Isc,
    /// AND immediate, carry from bit 7
    Anc,
    /// AND immediate then LSR A
    Alr,
    /// AND immediate then ROR A, odd flags
    Arr,
    /// X = (A & X) - immediate
    Sbx,
    /// A, X, SP = memory & SP
    Las,
    /// Undocumented alias of SBC immediate ($EB)
    Usbc,
    // Undocumented, unstable on real silicon
    Ane,
    Lxa,
    Sha,
    Shx,
    Shy,
    Tas,
    /// Locks the processor on real hardware; treated as a no-op here.
    Jam,
}

impl Operation {
    pub const fn mnemonic(self) -> &'static str {
        use Operation::*;
        match self {
            Adc => "ADC",
            And => "AND",
            Asl => "ASL",
            Bcc => "BCC",
            Bcs => "BCS",
            Beq => "BEQ",
            Bit => "BIT",
            Bmi => "BMI",
            Bne => "BNE",
            Bpl => "BPL",
            Brk => "BRK",
            Bvc => "BVC",
            Bvs => "BVS",
            Clc => "CLC",
            Cld => "CLD",
            Cli => "CLI",
            Clv => "CLV",
            Cmp => "CMP",
            Cpx => "CPX",
            Cpy => "CPY",
            Dec => "DEC",
            Dex => "DEX",
            Dey => "DEY",
            Eor => "EOR",
            Inc => "INC",
            Inx => "INX",
            Iny => "INY",
            Jmp => "JMP",
            Jsr => "JSR",
            Lda => "LDA",
            Ldx => "LDX",
            Ldy => "LDY",
            Lsr => "LSR",
            Nop => "NOP",
            Ora => "ORA",
            Pha => "PHA",
            Php => "PHP",
            Pla => "PLA",
            Plp => "PLP",
            Rol => "ROL",
            Ror => "ROR",
            Rti => "RTI",
            Rts => "RTS",
            Sbc => "SBC",
            Sec => "SEC",
            Sed => "SED",
            Sei => "SEI",
            Sta => "STA",
            Stx => "STX",
            Sty => "STY",
            Tax => "TAX",
            Tay => "TAY",
            Tsx => "TSX",
            Txa => "TXA",
            Txs => "TXS",
            Tya => "TYA",
            Slo => "SLO",
            Rla => "RLA",
            Sre => "SRE",
            Rra => "RRA",
            Sax => "SAX",
            Lax => "LAX",
            Dcp => "DCP",
            Isc => "ISC",
            Anc => "ANC",
            Alr => "ALR",
            Arr => "ARR",
            Sbx => "SBX",
            Las => "LAS",
            Usbc => "USBC",
            Ane => "ANE",
            Lxa => "LXA",
            Sha => "SHA",
            Shx => "SHX",
            Shy => "SHY",
            Tas => "TAS",
            Jam => "JAM",
        }
    }

    /// Read-type operations pay one extra cycle when indexing crosses a page.
    /// Stores and read-modify-write operations always take their fixed cost.
    pub const fn pays_page_cross_penalty(self) -> bool {
        use Operation::*;
        matches!(
            self,
            Adc | And | Cmp | Eor | Lda | Ldx | Ldy | Ora | Sbc | Nop | Lax | Las
        )
    }

    /// Opcodes whose result depends on analog effects of the real chip.
    pub const fn is_unstable(self) -> bool {
        use Operation::*;
        matches!(self, Ane | Lxa | Sha | Shx | Shy | Tas)
    }
}

/// One row of the decode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeEntry {
    pub operation: Operation,
    pub mode: AddressingMode,
    /// Base cost before page-cross and branch penalties.
    pub cycles: u8,
}

impl OpcodeEntry {
    /// Instruction length in bytes, opcode included.
    pub const fn len(&self) -> u16 {
        1 + self.mode.operand_bytes()
    }
}

const fn op(operation: Operation, mode: AddressingMode, cycles: u8) -> OpcodeEntry {
    OpcodeEntry {
        operation,
        mode,
        cycles,
    }
}

use Operation::*;

#[rustfmt::skip]
pub static OPCODE_TABLE: [OpcodeEntry; 256] = [
    // 0x00
    op(Brk, Implied, 7),     op(Ora, IndirectX, 6),   op(Jam, Implied, 2),     op(Slo, IndirectX, 8),
    op(Nop, ZeroPage, 3),    op(Ora, ZeroPage, 3),    op(Asl, ZeroPage, 5),    op(Slo, ZeroPage, 5),
    op(Php, Implied, 3),     op(Ora, Immediate, 2),   op(Asl, Accumulator, 2), op(Anc, Immediate, 2),
    op(Nop, Absolute, 4),    op(Ora, Absolute, 4),    op(Asl, Absolute, 6),    op(Slo, Absolute, 6),
    // 0x10
    op(Bpl, Relative, 2),    op(Ora, IndirectY, 5),   op(Jam, Implied, 2),     op(Slo, IndirectY, 8),
    op(Nop, ZeroPageX, 4),   op(Ora, ZeroPageX, 4),   op(Asl, ZeroPageX, 6),   op(Slo, ZeroPageX, 6),
    op(Clc, Implied, 2),     op(Ora, AbsoluteY, 4),   op(Nop, Implied, 2),     op(Slo, AbsoluteY, 7),
    op(Nop, AbsoluteX, 4),   op(Ora, AbsoluteX, 4),   op(Asl, AbsoluteX, 7),   op(Slo, AbsoluteX, 7),
    // 0x20
    op(Jsr, Absolute, 6),    op(And, IndirectX, 6),   op(Jam, Implied, 2),     op(Rla, IndirectX, 8),
    op(Bit, ZeroPage, 3),    op(And, ZeroPage, 3),    op(Rol, ZeroPage, 5),    op(Rla, ZeroPage, 5),
    op(Plp, Implied, 4),     op(And, Immediate, 2),   op(Rol, Accumulator, 2), op(Anc, Immediate, 2),
    op(Bit, Absolute, 4),    op(And, Absolute, 4),    op(Rol, Absolute, 6),    op(Rla, Absolute, 6),
    // 0x30
    op(Bmi, Relative, 2),    op(And, IndirectY, 5),   op(Jam, Implied, 2),     op(Rla, IndirectY, 8),
    op(Nop, ZeroPageX, 4),   op(And, ZeroPageX, 4),   op(Rol, ZeroPageX, 6),   op(Rla, ZeroPageX, 6),
    op(Sec, Implied, 2),     op(And, AbsoluteY, 4),   op(Nop, Implied, 2),     op(Rla, AbsoluteY, 7),
    op(Nop, AbsoluteX, 4),   op(And, AbsoluteX, 4),   op(Rol, AbsoluteX, 7),   op(Rla, AbsoluteX, 7),
    // 0x40
    op(Rti, Implied, 6),     op(Eor, IndirectX, 6),   op(Jam, Implied, 2),     op(Sre, IndirectX, 8),
    op(Nop, ZeroPage, 3),    op(Eor, ZeroPage, 3),    op(Lsr, ZeroPage, 5),    op(Sre, ZeroPage, 5),
    op(Pha, Implied, 3),     op(Eor, Immediate, 2),   op(Lsr, Accumulator, 2), op(Alr, Immediate, 2),
    op(Jmp, Absolute, 3),    op(Eor, Absolute, 4),    op(Lsr, Absolute, 6),    op(Sre, Absolute, 6),
    // 0x50
    op(Bvc, Relative, 2),    op(Eor, IndirectY, 5),   op(Jam, Implied, 2),     op(Sre, IndirectY, 8),
    op(Nop, ZeroPageX, 4),   op(Eor, ZeroPageX, 4),   op(Lsr, ZeroPageX, 6),   op(Sre, ZeroPageX, 6),
    op(Cli, Implied, 2),     op(Eor, AbsoluteY, 4),   op(Nop, Implied, 2),     op(Sre, AbsoluteY, 7),
    op(Nop, AbsoluteX, 4),   op(Eor, AbsoluteX, 4),   op(Lsr, AbsoluteX, 7),   op(Sre, AbsoluteX, 7),
    // 0x60
    op(Rts, Implied, 6),     op(Adc, IndirectX, 6),   op(Jam, Implied, 2),     op(Rra, IndirectX, 8),
    op(Nop, ZeroPage, 3),    op(Adc, ZeroPage, 3),    op(Ror, ZeroPage, 5),    op(Rra, ZeroPage, 5),
    op(Pla, Implied, 4),     op(Adc, Immediate, 2),   op(Ror, Accumulator, 2), op(Arr, Immediate, 2),
    op(Jmp, Indirect, 5),    op(Adc, Absolute, 4),    op(Ror, Absolute, 6),    op(Rra, Absolute, 6),
    // 0x70
    op(Bvs, Relative, 2),    op(Adc, IndirectY, 5),   op(Jam, Implied, 2),     op(Rra, IndirectY, 8),
    op(Nop, ZeroPageX, 4),   op(Adc, ZeroPageX, 4),   op(Ror, ZeroPageX, 6),   op(Rra, ZeroPageX, 6),
    op(Sei, Implied, 2),     op(Adc, AbsoluteY, 4),   op(Nop, Implied, 2),     op(Rra, AbsoluteY, 7),
    op(Nop, AbsoluteX, 4),   op(Adc, AbsoluteX, 4),   op(Ror, AbsoluteX, 7),   op(Rra, AbsoluteX, 7),
    // 0x80
    op(Nop, Immediate, 2),   op(Sta, IndirectX, 6),   op(Nop, Immediate, 2),   op(Sax, IndirectX, 6),
    op(Sty, ZeroPage, 3),    op(Sta, ZeroPage, 3),    op(Stx, ZeroPage, 3),    op(Sax, ZeroPage, 3),
    op(Dey, Implied, 2),     op(Nop, Immediate, 2),   op(Txa, Implied, 2),     op(Ane, Immediate, 2),
    op(Sty, Absolute, 4),    op(Sta, Absolute, 4),    op(Stx, Absolute, 4),    op(Sax, Absolute, 4),
    // 0x90
    op(Bcc, Relative, 2),    op(Sta, IndirectY, 6),   op(Jam, Implied, 2),     op(Sha, IndirectY, 6),
    op(Sty, ZeroPageX, 4),   op(Sta, ZeroPageX, 4),   op(Stx, ZeroPageY, 4),   op(Sax, ZeroPageY, 4),
    op(Tya, Implied, 2),     op(Sta, AbsoluteY, 5),   op(Txs, Implied, 2),     op(Tas, AbsoluteY, 5),
    op(Shy, AbsoluteX, 5),   op(Sta, AbsoluteX, 5),   op(Shx, AbsoluteY, 5),   op(Sha, AbsoluteY, 5),
    // 0xA0
    op(Ldy, Immediate, 2),   op(Lda, IndirectX, 6),   op(Ldx, Immediate, 2),   op(Lax, IndirectX, 6),
    op(Ldy, ZeroPage, 3),    op(Lda, ZeroPage, 3),    op(Ldx, ZeroPage, 3),    op(Lax, ZeroPage, 3),
    op(Tay, Implied, 2),     op(Lda, Immediate, 2),   op(Tax, Implied, 2),     op(Lxa, Immediate, 2),
    op(Ldy, Absolute, 4),    op(Lda, Absolute, 4),    op(Ldx, Absolute, 4),    op(Lax, Absolute, 4),
    // 0xB0
    op(Bcs, Relative, 2),    op(Lda, IndirectY, 5),   op(Jam, Implied, 2),     op(Lax, IndirectY, 5),
    op(Ldy, ZeroPageX, 4),   op(Lda, ZeroPageX, 4),   op(Ldx, ZeroPageY, 4),   op(Lax, ZeroPageY, 4),
    op(Clv, Implied, 2),     op(Lda, AbsoluteY, 4),   op(Tsx, Implied, 2),     op(Las, AbsoluteY, 4),
    op(Ldy, AbsoluteX, 4),   op(Lda, AbsoluteX, 4),   op(Ldx, AbsoluteY, 4),   op(Lax, AbsoluteY, 4),
    // 0xC0
    op(Cpy, Immediate, 2),   op(Cmp, IndirectX, 6),   op(Nop, Immediate, 2),   op(Dcp, IndirectX, 8),
    op(Cpy, ZeroPage, 3),    op(Cmp, ZeroPage, 3),    op(Dec, ZeroPage, 5),    op(Dcp, ZeroPage, 5),
    op(Iny, Implied, 2),     op(Cmp, Immediate, 2),   op(Dex, Implied, 2),     op(Sbx, Immediate, 2),
    op(Cpy, Absolute, 4),    op(Cmp, Absolute, 4),    op(Dec, Absolute, 6),    op(Dcp, Absolute, 6),
    // 0xD0
    op(Bne, Relative, 2),    op(Cmp, IndirectY, 5),   op(Jam, Implied, 2),     op(Dcp, IndirectY, 8),
    op(Nop, ZeroPageX, 4),   op(Cmp, ZeroPageX, 4),   op(Dec, ZeroPageX, 6),   op(Dcp, ZeroPageX, 6),
    op(Cld, Implied, 2),     op(Cmp, AbsoluteY, 4),   op(Nop, Implied, 2),     op(Dcp, AbsoluteY, 7),
    op(Nop, AbsoluteX, 4),   op(Cmp, AbsoluteX, 4),   op(Dec, AbsoluteX, 7),   op(Dcp, AbsoluteX, 7),
    // 0xE0
    op(Cpx, Immediate, 2),   op(Sbc, IndirectX, 6),   op(Nop, Immediate, 2),   op(Isc, IndirectX, 8),
    op(Cpx, ZeroPage, 3),    op(Sbc, ZeroPage, 3),    op(Inc, ZeroPage, 5),    op(Isc, ZeroPage, 5),
    op(Inx, Implied, 2),     op(Sbc, Immediate, 2),   op(Nop, Implied, 2),     op(Usbc, Immediate, 2),
    op(Cpx, Absolute, 4),    op(Sbc, Absolute, 4),    op(Inc, Absolute, 6),    op(Isc, Absolute, 6),
    // 0xF0
    op(Beq, Relative, 2),    op(Sbc, IndirectY, 5),   op(Jam, Implied, 2),     op(Isc, IndirectY, 8),
    op(Nop, ZeroPageX, 4),   op(Sbc, ZeroPageX, 4),   op(Inc, ZeroPageX, 6),   op(Isc, ZeroPageX, 6),
    op(Sed, Implied, 2),     op(Sbc, AbsoluteY, 4),   op(Nop, Implied, 2),     op(Isc, AbsoluteY, 7),
    op(Nop, AbsoluteX, 4),   op(Sbc, AbsoluteX, 4),   op(Inc, AbsoluteX, 7),   op(Isc, AbsoluteX, 7),
];

/// Decode an opcode byte.
#[inline]
pub fn decode(opcode: u8) -> &'static OpcodeEntry {
    &OPCODE_TABLE[opcode as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    const JAMS: [u8; 12] = [
        0x02, 0x12, 0x22, 0x32, 0x42, 0x52, 0x62, 0x72, 0x92, 0xB2, 0xD2, 0xF2,
    ];

    #[test]
    fn documented_opcodes_decode() {
        assert_eq!(decode(0xA9), &op(Lda, Immediate, 2));
        assert_eq!(decode(0x6C), &op(Jmp, Indirect, 5));
        assert_eq!(decode(0x91), &op(Sta, IndirectY, 6));
        assert_eq!(decode(0x1E), &op(Asl, AbsoluteX, 7));
        assert_eq!(decode(0x00), &op(Brk, Implied, 7));
        assert_eq!(decode(0xBE), &op(Ldx, AbsoluteY, 4));
        assert_eq!(decode(0x96), &op(Stx, ZeroPageY, 4));
    }

    #[test]
    fn documented_opcode_count() {
        let documented = OPCODE_TABLE
            .iter()
            .enumerate()
            .filter(|(i, e)| {
                let undocumented_nop = e.operation == Nop && *i != 0xEA;
                !undocumented_nop
                    && !matches!(
                        e.operation,
                        Slo | Rla | Sre | Rra | Sax | Lax | Dcp | Isc | Anc | Alr | Arr | Sbx
                            | Las | Usbc | Ane | Lxa | Sha | Shx | Shy | Tas | Jam
                    )
            })
            .count();
        assert_eq!(documented, 151);
    }

    #[test]
    fn jam_group() {
        for (i, entry) in OPCODE_TABLE.iter().enumerate() {
            let is_jam = JAMS.contains(&(i as u8));
            assert_eq!(entry.operation == Jam, is_jam, "opcode {:02X}", i);
        }
    }

    #[test]
    fn lengths_follow_mode() {
        assert_eq!(decode(0xEA).len(), 1);
        assert_eq!(decode(0x80).len(), 2);
        assert_eq!(decode(0x04).len(), 2);
        assert_eq!(decode(0x0C).len(), 3);
        assert_eq!(decode(0x20).len(), 3);
    }

    #[test]
    fn penalties_only_on_reads() {
        assert!(decode(0xBD).operation.pays_page_cross_penalty());
        assert!(decode(0x1C).operation.pays_page_cross_penalty());
        assert!(decode(0xB3).operation.pays_page_cross_penalty());
        assert!(!decode(0x9D).operation.pays_page_cross_penalty());
        assert!(!decode(0xFE).operation.pays_page_cross_penalty());
        assert!(!decode(0xDB).operation.pays_page_cross_penalty());
    }

    #[test]
    fn unstable_set() {
        let unstable: Vec<u8> = (0..=255u8)
            .filter(|&b| decode(b).operation.is_unstable())
            .collect();
        assert_eq!(unstable, vec![0x8B, 0x93, 0x9B, 0x9C, 0x9E, 0x9F, 0xAB]);
    }

    #[test]
    fn cycle_costs_in_range() {
        for (i, entry) in OPCODE_TABLE.iter().enumerate() {
            assert!((2..=8).contains(&entry.cycles), "opcode {:02X}", i);
        }
    }
}
