//! Cycle-counted NMOS 6502 emulator core.
//!
//! The CPU is generic over a [`Memory6502`] bus supplied by the host;
//! [`FlatMemory`] is a plain 64K RAM bus for tests and harness runs.

pub mod cpu_6502;
pub mod logging;
pub mod memory;

pub use cpu_6502::{Cpu6502, Diagnostic, Memory6502, Registers, RunOutcome};
pub use memory::{FlatMemory, ImageError};

/// A CPU-like component that can be stepped; returns cycles consumed.
pub trait Cpu {
    /// Reset registers and restart at the address in the reset vector.
    fn reset(&mut self);
    fn step(&mut self) -> u32;
}

impl<M: Memory6502> Cpu for Cpu6502<M> {
    fn reset(&mut self) {
        self.reset_from_vector();
    }

    fn step(&mut self) -> u32 {
        Cpu6502::step(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive<C: Cpu>(cpu: &mut C, steps: usize) -> u32 {
        cpu.reset();
        (0..steps).map(|_| cpu.step()).sum()
    }

    #[test]
    fn cpu_trait_drives_6502() {
        let mut mem = FlatMemory::new();
        // LDA #$01 ; STA $10 ; NOP
        mem.load_program(0x8000, &[0xA9, 0x01, 0x85, 0x10, 0xEA]);
        let mut cpu = Cpu6502::new(mem);
        assert_eq!(drive(&mut cpu, 3), 2 + 3 + 2);
        assert_eq!(cpu.memory.read(0x0010), 0x01);
    }
}
