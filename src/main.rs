//! LC-3 Emulator - CLI Entry Point
//!
//! Commands:
//! - `lc3-emu run <image>` - Run an object image on the terminal
//! - `lc3-emu disasm <image>` - Disassemble an object image

use std::io::Write;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};

use lc3::{disassemble, load_image, Cpu, CpuState, ProgramImage, TerminalConsole, PC_START};

#[derive(Parser)]
#[command(name = "lc3-emu")]
#[command(version)]
#[command(about = "An instruction-set simulator for the LC-3 16-bit computer")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program until it halts. Escape or Ctrl-C aborts.
    Run {
        /// Path to the object image to execute
        image: String,
        /// Address of the first instruction (0x3000, x3000 or decimal)
        #[arg(short, long, default_value_t = PC_START, value_parser = parse_address)]
        start: u16,
        /// Stop after this many instructions
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Log every executed instruction to stderr
        #[arg(short, long)]
        trace: bool,
        /// Write the final registers and state as JSON to this file
        #[arg(long)]
        dump_state: Option<String>,
    },
    /// Disassemble an object image
    Disasm {
        /// Path to the object image
        image: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let trace = matches!(cli.command, Some(Commands::Run { trace: true, .. }));
    init_logging(trace);

    match cli.command {
        Some(Commands::Run { image, start, max_cycles, trace: _, dump_state }) => {
            run_program(&image, start, max_cycles, dump_state.as_deref())
        }
        Some(Commands::Disasm { image }) => disassemble_file(&image),
        None => {
            println!("LC-3 Emulator v{}", env!("CARGO_PKG_VERSION"));
            println!("A 16-bit LC-3 instruction-set simulator");
            println!();
            println!("Use --help for available commands");
            ExitCode::SUCCESS
        }
    }
}

/// Log to stderr with CR LF line ends, since the console runs in raw mode.
fn init_logging(trace: bool) {
    let default = if trace { "warn,lc3=trace" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format(|buf, record| {
            write!(buf, "[{} {}] {}\r\n", record.level(), record.target(), record.args())
        })
        .init();
}

/// Parse an address as `0x3000`, `x3000` or decimal.
fn parse_address(s: &str) -> Result<u16, String> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .or_else(|| s.strip_prefix('x'))
        .or_else(|| s.strip_prefix('X'));

    let parsed = match hex {
        Some(digits) => u16::from_str_radix(digits, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid address '{}': {}", s, e))
}

fn read_image(path: &str) -> Option<ProgramImage> {
    match load_image(path) {
        Ok(image) => Some(image),
        Err(e) => {
            eprintln!("❌ {}", e);
            None
        }
    }
}

fn run_program(path: &str, start: u16, max_cycles: Option<u64>, dump_state: Option<&str>) -> ExitCode {
    let Some(image) = read_image(path) else {
        return ExitCode::FAILURE;
    };

    let console = match TerminalConsole::new() {
        Ok(console) => console,
        Err(e) => {
            eprintln!("❌ Failed to open terminal: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut cpu = Cpu::with_start(console, start);
    if let Err(e) = cpu.load_image(&image) {
        drop(cpu);
        eprintln!("❌ Failed to load program: {}", e);
        return ExitCode::FAILURE;
    }

    info!("starting at {:#06x}", start);
    let result = match max_cycles {
        Some(limit) => cpu.run_limited(limit),
        None => cpu.run(),
    };

    let snapshot = cpu.snapshot();
    // Leave raw mode before reporting.
    drop(cpu);

    if let Some(out) = dump_state {
        if let Err(e) = write_snapshot(out, &snapshot) {
            eprintln!("❌ Failed to write state to {}: {}", out, e);
        }
    }

    match result {
        Ok(CpuState::Halted) => ExitCode::SUCCESS,
        Ok(CpuState::Interrupted) => {
            eprintln!();
            eprintln!("Interrupted after {} cycles (PC={:#06x})", snapshot.cycles, snapshot.registers.pc);
            ExitCode::from(130)
        }
        Ok(state) => {
            eprintln!();
            eprintln!("⚠️  Stopped in state {:?} after {} cycles. Use --max-cycles to increase.", state, snapshot.cycles);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("CPU error at PC={:#06x}: {}", snapshot.registers.pc, e);
            eprintln!("❌ CPU error at PC={:#06x}: {}", snapshot.registers.pc, e);
            ExitCode::FAILURE
        }
    }
}

fn write_snapshot(path: &str, snapshot: &lc3::cpu::Snapshot) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, snapshot)?;
    Ok(())
}

fn disassemble_file(path: &str) -> ExitCode {
    let Some(image) = read_image(path) else {
        return ExitCode::FAILURE;
    };

    print!("{}", disassemble(image.origin, &image.words));
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x3000"), Ok(0x3000));
        assert_eq!(parse_address("x3000"), Ok(0x3000));
        assert_eq!(parse_address("XFE00"), Ok(0xFE00));
        assert_eq!(parse_address("12288"), Ok(0x3000));
        assert!(parse_address("0x10000").is_err());
        assert!(parse_address("start").is_err());
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from(["lc3-emu", "run", "prog.obj", "--start", "x4000", "-m", "10"]).unwrap();
        match cli.command {
            Some(Commands::Run { image, start, max_cycles, trace, dump_state }) => {
                assert_eq!(image, "prog.obj");
                assert_eq!(start, 0x4000);
                assert_eq!(max_cycles, Some(10));
                assert!(!trace);
                assert_eq!(dump_state, None);
            }
            _ => panic!("expected run command"),
        }
    }
}
