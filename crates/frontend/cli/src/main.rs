use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mos6502_core::logging::{LogCategory, LogConfig, LogLevel};
use mos6502_core::{Cpu6502, FlatMemory};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

mod harness;

use harness::Report;

#[derive(Parser)]
#[command(about = "Run 6502 test images on the cycle-counted core")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    logging: LogArgs,

    /// Stop after this many instructions
    #[arg(long, global = true, default_value_t = 200_000_000)]
    max_instructions: u64,

    /// Write the final register state to this file as JSON
    #[arg(long, global = true)]
    state_out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a 64K functional test image (entry $0400) until it traps
    Functional {
        image: PathBuf,

        /// PC of the success trap
        #[arg(long, value_parser = parse_u16, default_value = "0x3469")]
        success_pc: u16,
    },
    /// Run the decimal-mode test (loaded and entered at $0200)
    Decimal { image: PathBuf },
    /// Load an arbitrary image and run it until it traps
    Run {
        image: PathBuf,

        #[arg(long, value_parser = parse_u16, default_value = "0x0000")]
        load_address: u16,

        /// Start address; defaults to the reset vector
        #[arg(long, value_parser = parse_u16)]
        entry: Option<u16>,
    },
}

/// Core logging controls. Category levels override `--log-level`.
#[derive(Args)]
struct LogArgs {
    #[arg(long, global = true, value_parser = parse_level, default_value = "off")]
    log_level: LogLevel,

    /// Per-instruction trace (use "trace")
    #[arg(long, global = true, value_parser = parse_level)]
    log_cpu: Option<LogLevel>,

    #[arg(long, global = true, value_parser = parse_level)]
    log_interrupts: Option<LogLevel>,

    /// JAM and unstable opcode warnings
    #[arg(long, global = true, value_parser = parse_level)]
    log_unofficial: Option<LogLevel>,

    /// Append core log output to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Maximum messages per second per category
    #[arg(long, global = true)]
    log_rate: Option<usize>,
}

impl LogArgs {
    fn apply(&self) -> Result<()> {
        let config = LogConfig::global();
        config.set_global_level(self.log_level);
        for (category, level) in [
            (LogCategory::CPU, self.log_cpu),
            (LogCategory::Interrupts, self.log_interrupts),
            (LogCategory::Unofficial, self.log_unofficial),
        ] {
            if let Some(level) = level {
                config.set_level(category, level);
            }
        }
        if let Some(rate) = self.log_rate {
            config.set_rate_limit(rate);
        }
        if let Some(path) = &self.log_file {
            config
                .set_log_file(path.clone())
                .with_context(|| format!("opening log file {}", path.display()))?;
        }
        Ok(())
    }
}

/// Accepts `0x1234`, `$1234` or decimal.
fn parse_u16(s: &str) -> Result<u16, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix('$')) {
        u16::from_str_radix(hex, 16)
    } else {
        s.parse::<u16>()
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", s, e))
}

fn parse_level(s: &str) -> Result<LogLevel, String> {
    LogLevel::from_str(s).ok_or_else(|| format!("unknown log level '{}'", s))
}

fn write_state(path: &Path, cpu: &Cpu6502<FlatMemory>) -> Result<()> {
    let mut f = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write!(f, "{}", serde_json::to_string_pretty(&cpu.registers())?)?;
    log::info!("wrote register state to {}", path.display());
    Ok(())
}

fn finish(report: &Report, cpu: &Cpu6502<FlatMemory>, state_out: Option<&PathBuf>) -> Result<()> {
    println!("{}", report.summary());
    println!("{}", report.registers);
    if let Some(path) = state_out {
        write_state(path, cpu)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    cli.logging.apply()?;

    match &cli.command {
        Command::Functional { image, success_pc } => {
            let (report, cpu) = harness::run_functional(image, *success_pc, cli.max_instructions)?;
            println!("functional test passed at ${:04X}", success_pc);
            finish(&report, &cpu, cli.state_out.as_ref())?;
        }
        Command::Decimal { image } => {
            let (report, cpu) = harness::run_decimal(image, cli.max_instructions)?;
            println!("decimal test passed");
            finish(&report, &cpu, cli.state_out.as_ref())?;
        }
        Command::Run {
            image,
            load_address,
            entry,
        } => {
            let (report, cpu) =
                harness::run_image(image, *load_address, *entry, cli.max_instructions)?;
            println!("{:?}", report.outcome);
            finish(&report, &cpu, cli.state_out.as_ref())?;
        }
    }

    Ok(())
}
