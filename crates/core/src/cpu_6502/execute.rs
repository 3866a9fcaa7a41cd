//! Per-operation semantics.
//!
//! `step()` has already fetched the opcode and resolved its operand; these
//! handlers only apply the operation to registers, flags and memory.

use super::addressing::Operand;
use super::opcodes::Operation;
use super::{
    Cpu6502, Diagnostic, Memory6502, FLAG_B, FLAG_C, FLAG_D, FLAG_I, FLAG_N, FLAG_U, FLAG_V,
    FLAG_Z, IRQ_VECTOR,
};
use crate::logging::{log, LogCategory, LogLevel};

/// Magic constant used by the unstable ANE/LXA opcodes. Varies between chips.
const UNSTABLE_MAGIC: u8 = 0xEE;

impl<M: Memory6502> Cpu6502<M> {
    /// Run `operation` against `operand`. Returns the extra cycles a taken
    /// branch costs; every other operation returns 0.
    pub(crate) fn execute(&mut self, opcode: u8, pc: u16, operation: Operation, operand: Operand) -> u32 {
        use Operation::*;
        match operation {
            Bcc => return self.branch(!self.flag(FLAG_C), operand),
            Bcs => return self.branch(self.flag(FLAG_C), operand),
            Bne => return self.branch(!self.flag(FLAG_Z), operand),
            Beq => return self.branch(self.flag(FLAG_Z), operand),
            Bpl => return self.branch(!self.flag(FLAG_N), operand),
            Bmi => return self.branch(self.flag(FLAG_N), operand),
            Bvc => return self.branch(!self.flag(FLAG_V), operand),
            Bvs => return self.branch(self.flag(FLAG_V), operand),
            _ => {}
        }

        match operation {
            // Loads and stores
            Lda => {
                self.a = self.load(operand);
                self.set_zero_and_negative(self.a);
            }
            Ldx => {
                self.x = self.load(operand);
                self.set_zero_and_negative(self.x);
            }
            Ldy => {
                self.y = self.load(operand);
                self.set_zero_and_negative(self.y);
            }
            Sta => self.store(operand, self.a),
            Stx => self.store(operand, self.x),
            Sty => self.store(operand, self.y),

            // Arithmetic and logic
            Adc => {
                let v = self.load(operand);
                self.adc(v);
            }
            Sbc | Usbc => {
                let v = self.load(operand);
                self.sbc(v);
            }
            And => {
                let v = self.load(operand);
                self.a &= v;
                self.set_zero_and_negative(self.a);
            }
            Ora => {
                let v = self.load(operand);
                self.a |= v;
                self.set_zero_and_negative(self.a);
            }
            Eor => {
                let v = self.load(operand);
                self.a ^= v;
                self.set_zero_and_negative(self.a);
            }
            Cmp => {
                let v = self.load(operand);
                self.compare(self.a, v);
            }
            Cpx => {
                let v = self.load(operand);
                self.compare(self.x, v);
            }
            Cpy => {
                let v = self.load(operand);
                self.compare(self.y, v);
            }
            Bit => {
                let v = self.load(operand);
                self.set_flag(FLAG_Z, (self.a & v) == 0);
                self.set_flag(FLAG_V, (v & 0x40) != 0);
                self.set_flag(FLAG_N, (v & 0x80) != 0);
            }

            // Shifts and rotates
            Asl => {
                self.modify(operand, Self::asl);
            }
            Lsr => {
                self.modify(operand, Self::lsr);
            }
            Rol => {
                self.modify(operand, Self::rol);
            }
            Ror => {
                self.modify(operand, Self::ror);
            }

            // Increments and decrements
            Inc => {
                self.modify(operand, Self::inc);
            }
            Dec => {
                self.modify(operand, Self::dec);
            }
            Inx => {
                self.x = self.x.wrapping_add(1);
                self.set_zero_and_negative(self.x);
            }
            Iny => {
                self.y = self.y.wrapping_add(1);
                self.set_zero_and_negative(self.y);
            }
            Dex => {
                self.x = self.x.wrapping_sub(1);
                self.set_zero_and_negative(self.x);
            }
            Dey => {
                self.y = self.y.wrapping_sub(1);
                self.set_zero_and_negative(self.y);
            }

            // Transfers
            Tax => {
                self.x = self.a;
                self.set_zero_and_negative(self.x);
            }
            Tay => {
                self.y = self.a;
                self.set_zero_and_negative(self.y);
            }
            Txa => {
                self.a = self.x;
                self.set_zero_and_negative(self.a);
            }
            Tya => {
                self.a = self.y;
                self.set_zero_and_negative(self.a);
            }
            Tsx => {
                self.x = self.sp;
                self.set_zero_and_negative(self.x);
            }
            // TXS leaves flags alone.
            Txs => self.sp = self.x,

            // Stack
            Pha => self.push_u8(self.a),
            Php => self.push_u8(self.status | FLAG_B | FLAG_U),
            Pla => {
                self.a = self.pop_u8();
                self.set_zero_and_negative(self.a);
            }
            Plp => {
                let s = self.pop_u8();
                self.restore_status(s);
            }

            // Flags
            Clc => self.set_flag(FLAG_C, false),
            Sec => self.set_flag(FLAG_C, true),
            Cli => self.set_flag(FLAG_I, false),
            Sei => self.set_flag(FLAG_I, true),
            Clv => self.set_flag(FLAG_V, false),
            Cld => self.set_flag(FLAG_D, false),
            Sed => self.set_flag(FLAG_D, true),

            // Control flow
            Jmp => {
                if let Operand::Address(target) = operand {
                    self.pc = target;
                }
            }
            Jsr => {
                if let Operand::Address(target) = operand {
                    // PC already points past the operand; the pushed value is one less.
                    self.push_u16(self.pc.wrapping_sub(1));
                    self.pc = target;
                }
            }
            Rts => {
                self.pc = self.pop_u16().wrapping_add(1);
            }
            Rti => {
                let s = self.pop_u8();
                self.restore_status(s);
                self.pc = self.pop_u16();
            }
            Brk => self.brk(pc),

            Nop => {}

            // Undocumented, stable
            Slo => {
                let r = self.modify(operand, Self::asl);
                self.a |= r;
                self.set_zero_and_negative(self.a);
            }
            Rla => {
                let r = self.modify(operand, Self::rol);
                self.a &= r;
                self.set_zero_and_negative(self.a);
            }
            Sre => {
                let r = self.modify(operand, Self::lsr);
                self.a ^= r;
                self.set_zero_and_negative(self.a);
            }
            Rra => {
                let r = self.modify(operand, Self::ror);
                self.adc(r);
            }
            Sax => self.store(operand, self.a & self.x),
            Lax => {
                let v = self.load(operand);
                self.a = v;
                self.x = v;
                self.set_zero_and_negative(v);
            }
            Dcp => {
                let r = self.modify(operand, Self::dec);
                self.compare(self.a, r);
            }
            Isc => {
                let r = self.modify(operand, Self::inc);
                self.sbc(r);
            }
            Anc => {
                let v = self.load(operand);
                self.a &= v;
                self.set_zero_and_negative(self.a);
                self.set_flag(FLAG_C, (self.a & 0x80) != 0);
            }
            Alr => {
                let v = self.load(operand);
                let t = self.a & v;
                self.a = self.lsr(t);
            }
            Arr => {
                let v = self.load(operand);
                self.arr(v);
            }
            Sbx => {
                let v = self.load(operand);
                let t = self.a & self.x;
                self.set_flag(FLAG_C, t >= v);
                self.x = t.wrapping_sub(v);
                self.set_zero_and_negative(self.x);
            }
            Las => {
                let v = self.load(operand);
                let v = v & self.sp;
                self.a = v;
                self.x = v;
                self.sp = v;
                self.set_zero_and_negative(v);
            }

            // Undocumented, unstable: best-effort results plus a notice
            Ane => {
                self.unstable(opcode, pc);
                let v = self.load(operand);
                self.a = (self.a | UNSTABLE_MAGIC) & self.x & v;
                self.set_zero_and_negative(self.a);
            }
            Lxa => {
                self.unstable(opcode, pc);
                let v = self.load(operand);
                let v = (self.a | UNSTABLE_MAGIC) & v;
                self.a = v;
                self.x = v;
                self.set_zero_and_negative(v);
            }
            Sha => {
                self.unstable(opcode, pc);
                self.store_high_and(operand, self.y, self.a & self.x);
            }
            Shx => {
                self.unstable(opcode, pc);
                self.store_high_and(operand, self.y, self.x);
            }
            Shy => {
                self.unstable(opcode, pc);
                self.store_high_and(operand, self.x, self.y);
            }
            Tas => {
                self.unstable(opcode, pc);
                self.sp = self.a & self.x;
                self.store_high_and(operand, self.y, self.sp);
            }

            Jam => {
                log(LogCategory::Unofficial, LogLevel::Warn, || {
                    format!("JAM opcode ${:02X} at ${:04X} treated as NOP", opcode, pc)
                });
                self.diagnostic = Some(Diagnostic::Jam { opcode, pc });
            }

            Bcc | Bcs | Bne | Beq | Bpl | Bmi | Bvc | Bvs => {}
        }
        0
    }

    /// Operand value for read-type instructions.
    #[inline]
    fn load(&mut self, operand: Operand) -> u8 {
        match operand {
            Operand::Immediate(v) => v,
            Operand::Address(addr) => self.read(addr),
            Operand::Accumulator => self.a,
            Operand::None | Operand::Relative(_) => 0,
        }
    }

    #[inline]
    fn store(&mut self, operand: Operand, value: u8) {
        if let Operand::Address(addr) = operand {
            self.write(addr, value);
        }
    }

    /// Read-modify-write on the accumulator or a memory cell. Returns the new value.
    #[inline]
    fn modify(&mut self, operand: Operand, f: fn(&mut Self, u8) -> u8) -> u8 {
        match operand {
            Operand::Accumulator => {
                let v = self.a;
                let r = f(self, v);
                self.a = r;
                r
            }
            Operand::Address(addr) => {
                let v = self.read(addr);
                let r = f(self, v);
                self.write(addr, r);
                r
            }
            _ => 0,
        }
    }

    fn asl(&mut self, v: u8) -> u8 {
        self.set_flag(FLAG_C, (v & 0x80) != 0);
        let r = v << 1;
        self.set_zero_and_negative(r);
        r
    }

    fn lsr(&mut self, v: u8) -> u8 {
        self.set_flag(FLAG_C, (v & 0x01) != 0);
        let r = v >> 1;
        self.set_zero_and_negative(r);
        r
    }

    fn rol(&mut self, v: u8) -> u8 {
        let carry_in = self.flag(FLAG_C) as u8;
        self.set_flag(FLAG_C, (v & 0x80) != 0);
        let r = (v << 1) | carry_in;
        self.set_zero_and_negative(r);
        r
    }

    fn ror(&mut self, v: u8) -> u8 {
        let carry_in = (self.flag(FLAG_C) as u8) << 7;
        self.set_flag(FLAG_C, (v & 0x01) != 0);
        let r = (v >> 1) | carry_in;
        self.set_zero_and_negative(r);
        r
    }

    fn inc(&mut self, v: u8) -> u8 {
        let r = v.wrapping_add(1);
        self.set_zero_and_negative(r);
        r
    }

    fn dec(&mut self, v: u8) -> u8 {
        let r = v.wrapping_sub(1);
        self.set_zero_and_negative(r);
        r
    }

    fn compare(&mut self, register: u8, value: u8) {
        self.set_flag(FLAG_C, register >= value);
        self.set_zero_and_negative(register.wrapping_sub(value));
    }

    /// Add with carry. In decimal mode only A and C take the BCD result;
    /// N, V and Z always come from the binary sum.
    pub(crate) fn adc(&mut self, value: u8) {
        let a = self.a;
        let carry = self.flag(FLAG_C) as u16;
        let binary = a as u16 + value as u16 + carry;
        let result = binary as u8;

        // overflow: (~(A ^ M) & (A ^ R)) & 0x80
        self.set_flag(FLAG_V, (!(a ^ value) & (a ^ result) & 0x80) != 0);
        self.set_zero_and_negative(result);

        if self.flag(FLAG_D) {
            let mut lo = (a & 0x0F) as u16 + (value & 0x0F) as u16 + carry;
            if lo >= 0x0A {
                lo = ((lo + 0x06) & 0x0F) + 0x10;
            }
            let mut sum = (a & 0xF0) as u16 + (value & 0xF0) as u16 + lo;
            if sum >= 0xA0 {
                sum += 0x60;
            }
            self.set_flag(FLAG_C, sum > 0xFF);
            self.a = sum as u8;
        } else {
            self.set_flag(FLAG_C, binary > 0xFF);
            self.a = result;
        }
    }

    /// Subtract with borrow. Carry means "no borrow" in both modes and, like
    /// N, V and Z, is taken from the binary difference.
    pub(crate) fn sbc(&mut self, value: u8) {
        let a = self.a;
        let borrow = 1 - self.flag(FLAG_C) as i16;
        let binary = a as i16 - value as i16 - borrow;
        let result = binary as u8;

        self.set_flag(FLAG_C, binary >= 0);
        self.set_flag(FLAG_V, ((a ^ value) & (a ^ result) & 0x80) != 0);
        self.set_zero_and_negative(result);

        if self.flag(FLAG_D) {
            let mut lo = (a & 0x0F) as i16 - (value & 0x0F) as i16 - borrow;
            if lo < 0 {
                lo = ((lo - 0x06) & 0x0F) - 0x10;
            }
            let mut diff = (a & 0xF0) as i16 - (value & 0xF0) as i16 + lo;
            if diff < 0 {
                diff -= 0x60;
            }
            self.a = diff as u8;
        } else {
            self.a = result;
        }
    }

    /// AND then ROR A, with the adder-side flag quirks of the NMOS part.
    fn arr(&mut self, value: u8) {
        let t = self.a & value;
        let carry_in = self.flag(FLAG_C);
        let r = (t >> 1) | ((carry_in as u8) << 7);

        if !self.flag(FLAG_D) {
            self.a = r;
            self.set_zero_and_negative(r);
            self.set_flag(FLAG_C, (r & 0x40) != 0);
            self.set_flag(FLAG_V, (((r >> 6) ^ (r >> 5)) & 0x01) != 0);
            return;
        }

        self.set_flag(FLAG_N, carry_in);
        self.set_flag(FLAG_Z, r == 0);
        self.set_flag(FLAG_V, ((r ^ t) & 0x40) != 0);
        let mut res = r;
        if (t & 0x0F) + (t & 0x01) > 0x05 {
            res = (res & 0xF0) | (res.wrapping_add(0x06) & 0x0F);
        }
        if (t & 0xF0) as u16 + (t & 0x10) as u16 > 0x50 {
            res = res.wrapping_add(0x60);
            self.set_flag(FLAG_C, true);
        } else {
            self.set_flag(FLAG_C, false);
        }
        self.a = res;
    }

    /// Taken branches cost one cycle, plus one more when the target lies on a
    /// different page than the instruction that follows the branch.
    fn branch(&mut self, condition: bool, operand: Operand) -> u32 {
        let Operand::Relative(offset) = operand else {
            return 0;
        };
        if !condition {
            return 0;
        }
        let next = self.pc;
        let target = next.wrapping_add(offset as i16 as u16);
        self.pc = target;
        if (next & 0xFF00) != (target & 0xFF00) {
            2
        } else {
            1
        }
    }

    /// BRK: push PC+1 and status with B set, then vector through $FFFE.
    fn brk(&mut self, pc: u16) {
        log(LogCategory::Interrupts, LogLevel::Debug, || {
            format!("BRK at ${:04X} A={:02X} X={:02X} Y={:02X} SP={:02X} P={:02X}",
                pc, self.a, self.x, self.y, self.sp, self.status)
        });
        self.push_u16(self.pc.wrapping_add(1));
        self.push_u8(self.status | FLAG_B | FLAG_U);
        self.status |= FLAG_I;
        self.pc = self.read_u16(IRQ_VECTOR);
    }

    /// SHA/SHX/SHY/TAS: store `value & (H + 1)` where H is the high byte of
    /// the unindexed base. When indexing crossed a page the stored value also
    /// replaces the high byte of the target address.
    fn store_high_and(&mut self, operand: Operand, index: u8, value: u8) {
        let Operand::Address(addr) = operand else {
            return;
        };
        let base_hi = (addr.wrapping_sub(index as u16) >> 8) as u8;
        let v = value & base_hi.wrapping_add(1);
        let target = if self.page_crossed {
            ((v as u16) << 8) | (addr & 0x00FF)
        } else {
            addr
        };
        self.write(target, v);
    }

    fn unstable(&mut self, opcode: u8, pc: u16) {
        log(LogCategory::Unofficial, LogLevel::Warn, || {
            format!(
                "unstable opcode ${:02X} at ${:04X}: result is an approximation",
                opcode, pc
            )
        });
        self.diagnostic = Some(Diagnostic::Unstable { opcode, pc });
    }
}
