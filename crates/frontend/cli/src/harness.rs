//! Test-image runners used by the CLI subcommands.

use anyhow::{bail, Context, Result};
use mos6502_core::{Cpu6502, FlatMemory, Memory6502, Registers, RunOutcome};
use std::path::Path;
use std::time::{Duration, Instant};

/// Entry point of the functional test image.
pub const FUNCTIONAL_ENTRY: u16 = 0x0400;
/// PC of the success trap in the stock functional test build.
pub const FUNCTIONAL_SUCCESS_PC: u16 = 0x3469;
/// The functional test stores its current test number here.
pub const FUNCTIONAL_TEST_INDEX: u16 = 0x0200;
/// Value of the test number once every test has passed.
pub const FUNCTIONAL_LAST_TEST: u8 = 0xF0;

/// Load and entry address of the decimal test.
pub const DECIMAL_BASE: u16 = 0x0200;
/// The decimal test leaves 0 here on success.
pub const DECIMAL_ERROR: u16 = 0x000B;

/// Result of one harness run.
#[derive(Debug)]
pub struct Report {
    pub outcome: RunOutcome,
    pub registers: Registers,
    pub elapsed: Duration,
}

impl Report {
    /// Emulated clock rate achieved, in MHz.
    pub fn effective_mhz(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.registers.cycles as f64 / secs / 1_000_000.0
    }

    pub fn instructions(&self) -> u64 {
        match self.outcome {
            RunOutcome::Trapped { instructions, .. }
            | RunOutcome::Stopped { instructions, .. }
            | RunOutcome::LimitReached { instructions, .. } => instructions,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} instructions, {} cycles in {:.3}s ({:.2} MHz)",
            self.instructions(),
            self.registers.cycles,
            self.elapsed.as_secs_f64(),
            self.effective_mhz()
        )
    }
}

fn load(path: &Path, offset: u16) -> Result<FlatMemory> {
    let mut mem = FlatMemory::new();
    let n = mem
        .load_file(path, offset)
        .with_context(|| format!("loading {}", path.display()))?;
    log::info!("loaded {} bytes at ${:04X} from {}", n, offset, path.display());
    Ok(mem)
}

fn timed<F>(cpu: &mut Cpu6502<FlatMemory>, run: F) -> Report
where
    F: FnOnce(&mut Cpu6502<FlatMemory>) -> RunOutcome,
{
    let start = Instant::now();
    let outcome = run(cpu);
    Report {
        outcome,
        registers: cpu.registers(),
        elapsed: start.elapsed(),
    }
}

/// Run a 64K functional test image until it traps.
pub fn run_functional(
    path: &Path,
    success_pc: u16,
    max_instructions: u64,
) -> Result<(Report, Cpu6502<FlatMemory>)> {
    let mut cpu = Cpu6502::new(load(path, 0x0000)?);
    cpu.reset(FUNCTIONAL_ENTRY);
    let report = timed(&mut cpu, |c| c.run_until_trap(max_instructions));
    check_functional(&report, &cpu, success_pc)?;
    Ok((report, cpu))
}

pub fn check_functional(report: &Report, cpu: &Cpu6502<FlatMemory>, success_pc: u16) -> Result<()> {
    let test_index = cpu.memory.read(FUNCTIONAL_TEST_INDEX);
    match report.outcome {
        RunOutcome::Trapped { pc, .. } if pc == success_pc && test_index == FUNCTIONAL_LAST_TEST => {
            Ok(())
        }
        RunOutcome::Trapped { pc, .. } => bail!(
            "trapped at ${:04X} in test ${:02X} ({})",
            pc,
            test_index,
            report.registers
        ),
        _ => bail!(
            "no trap after {} instructions, last test ${:02X} ({})",
            report.instructions(),
            test_index,
            report.registers
        ),
    }
}

/// Run the decimal-mode test until it returns below its load address.
pub fn run_decimal(path: &Path, max_instructions: u64) -> Result<(Report, Cpu6502<FlatMemory>)> {
    let mut cpu = Cpu6502::new(load(path, DECIMAL_BASE)?);
    cpu.reset(DECIMAL_BASE);
    let report = timed(&mut cpu, |c| c.run_while(|c| c.pc >= DECIMAL_BASE, max_instructions));

    if !matches!(report.outcome, RunOutcome::Stopped { .. }) {
        bail!(
            "decimal test did not return after {} instructions ({})",
            report.instructions(),
            report.registers
        );
    }
    let error = cpu.memory.read(DECIMAL_ERROR);
    if error != 0 {
        bail!("decimal test reported error byte ${:02X}", error);
    }
    Ok((report, cpu))
}

/// Load an arbitrary image and run it until it traps or hits the limit.
pub fn run_image(
    path: &Path,
    load_address: u16,
    entry: Option<u16>,
    max_instructions: u64,
) -> Result<(Report, Cpu6502<FlatMemory>)> {
    let mut cpu = Cpu6502::new(load(path, load_address)?);
    match entry {
        Some(pc) => cpu.reset(pc),
        None => cpu.reset_from_vector(),
    }
    let report = timed(&mut cpu, |c| c.run_until_trap(max_instructions));
    Ok((report, cpu))
}
