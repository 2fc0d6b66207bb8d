use std::fs;
use std::io;
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use colored::Colorize;
use cpu_6502::assembler;
use cpu_6502::context::ToolchainContext;
use cpu_6502::cpu_6502::Cpu;
use cpu_6502::debugger;
use cpu_6502::disassembler;
use cpu_6502::error::{ToolchainError, ToolchainResult};
use cpu_6502::memory::vectors;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Assemble, disassemble, execute, or debug 6502 programs",
    group(ArgGroup::new("mode").args(["assemble", "disassemble", "execute", "debug"]).required(true))
)]
struct Cli {
    /// Assemble the input source file into a hex listing
    #[arg(short = 'a', long)]
    assemble: bool,
    /// Disassemble the input hex listing into source text
    #[arg(short = 'd', long)]
    disassemble: bool,
    /// Load the input hex listing and run it to completion
    #[arg(short = 'e', long)]
    execute: bool,
    /// Load the input hex listing and run it under the interactive debugger
    #[arg(short = 'g', long)]
    debug: bool,

    /// Input file
    #[arg(short = 'i', long)]
    input: String,
    /// Output file (assemble/disassemble only; defaults to stdout)
    #[arg(short = 'o', long)]
    output: Option<String>,
    /// Start address in hex, e.g. 1000 (defaults to the program's own origin)
    #[arg(short = 's', long)]
    start: Option<String>,
    /// Include a 4-digit hex address counter column in output/input
    #[arg(short = 'c', long)]
    counter: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> ToolchainResult<()> {
    let start_address = parse_start_address(cli.start.as_deref())?;
    let ctx = ToolchainContext::new(start_address, cli.counter);

    if cli.assemble {
        run_assemble(cli, &ctx)
    } else if cli.disassemble {
        run_disassemble(cli, &ctx)
    } else if cli.execute {
        run_execute(cli, &ctx)
    } else {
        run_debug(cli, &ctx)
    }
}

/// Validates `-s` before any file is opened, shared across all four
/// modes so each reports `InvalidAddress` identically. Absent `-s`
/// means "use the program's own origin," not an error.
fn parse_start_address(raw: Option<&str>) -> ToolchainResult<u16> {
    match raw {
        None => Ok(0),
        Some(text) => {
            let text = text.trim_start_matches('$');
            let value = i64::from_str_radix(text, 16).map_err(|_| ToolchainError::InvalidAddress { value: -1 })?;
            if !(1..=0xFFFF).contains(&value) {
                return Err(ToolchainError::InvalidAddress { value });
            }
            Ok(value as u16)
        }
    }
}

fn read_input(path: &str) -> ToolchainResult<String> {
    fs::read_to_string(path).map_err(|e| ToolchainError::Io(format!("{}: {}", path, e)))
}

fn write_output(path: Option<&str>, text: &str) -> ToolchainResult<()> {
    match path {
        Some(path) => fs::write(path, text).map_err(|e| ToolchainError::Io(format!("{}: {}", path, e))),
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}

fn run_assemble(cli: &Cli, ctx: &ToolchainContext) -> ToolchainResult<()> {
    let source = read_input(&cli.input)?;
    let program = assembler::assemble(&source, ctx)?;
    let listing = program.format_listing(ctx);
    write_output(cli.output.as_deref(), &listing)?;
    eprintln!(
        "{} {} bytes assembled from {} lines",
        "ok:".green().bold(),
        program.to_bytes().len(),
        program.lines.len()
    );
    Ok(())
}

fn run_disassemble(cli: &Cli, ctx: &ToolchainContext) -> ToolchainResult<()> {
    let listing = read_input(&cli.input)?;
    let (bytes, origin) = parse_hex_listing(&listing, ctx)?;
    let lines = disassembler::disassemble(&bytes, origin)?;

    let mut out = String::new();
    out.push_str(&format!("; disassembly of {}\n", cli.input));
    out.push_str(&format!("*=${:04X}\n", origin));
    for line in &lines {
        if ctx.include_counter {
            out.push_str(&format!("{:04X} {}\n", line.address, line.text));
        } else {
            out.push_str(&format!("{}\n", line.text));
        }
    }
    write_output(cli.output.as_deref(), &out)
}

/// Parses the assembler's hex-listing format: whitespace-separated
/// 2-digit hex byte lines, optionally prefixed with a 4-digit address
/// column when `ctx.include_counter` is set. Blank lines and `;`
/// comment lines are ignored.
fn parse_hex_listing(text: &str, ctx: &ToolchainContext) -> ToolchainResult<(Vec<u8>, u16)> {
    let mut bytes = Vec::new();
    let mut origin = None;
    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        let mut fields: Vec<&str> = line.split_whitespace().collect();
        if ctx.include_counter && !fields.is_empty() {
            let addr = u16::from_str_radix(fields[0], 16).map_err(|_| ToolchainError::SyntaxError {
                line: 0,
                message: format!("bad address column: {}", fields[0]),
            })?;
            if origin.is_none() {
                origin = Some(addr);
            }
            fields.remove(0);
        }
        for field in fields {
            let byte = u8::from_str_radix(field, 16).map_err(|_| ToolchainError::SyntaxError {
                line: 0,
                message: format!("bad hex byte: {}", field),
            })?;
            bytes.push(byte);
        }
    }
    Ok((bytes, origin.unwrap_or(ctx.start_address)))
}

fn load_program(cli: &Cli, ctx: &ToolchainContext) -> ToolchainResult<Cpu> {
    let listing = read_input(&cli.input)?;
    let (bytes, origin) = parse_hex_listing(&listing, ctx)?;
    let mut cpu = Cpu::new();
    let end = cpu.memory.load(origin, &bytes)?;
    let start = if ctx.start_address != 0 { ctx.start_address } else { origin };
    cpu.memory.write16(vectors::RESET, start);
    cpu.reset();
    cpu.end_address = end.wrapping_sub(1);
    Ok(cpu)
}

fn run_execute(cli: &Cli, ctx: &ToolchainContext) -> ToolchainResult<()> {
    let mut cpu = load_program(cli, ctx)?;
    println!("{}", banner("execute", cpu.pc));
    cpu.run(cpu.end_address)?;
    println!("{}", footer(&cpu));
    Ok(())
}

fn banner(mode: &str, start: u16) -> String {
    format!(
        ";;;;;;;;;;;;;;;;;;;;;;;;;\n; {} starting at ${:04X}\n;;;;;;;;;;;;;;;;;;;;;;;;;",
        mode, start
    )
}

fn footer(cpu: &Cpu) -> String {
    format!(
        ";;;;;;;;;;;;;;;;;;;;;;;;;\n; halted at ${:04X}, {} cycles\n;;;;;;;;;;;;;;;;;;;;;;;;;",
        cpu.pc, cpu.total_cycles
    )
}

fn run_debug(cli: &Cli, ctx: &ToolchainContext) -> ToolchainResult<()> {
    let mut cpu = load_program(cli, ctx)?;
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    debugger::run(&mut cpu, &mut input, &mut output)
}
