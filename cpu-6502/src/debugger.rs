//! The interactive single-step/free-run loop driving a [`Cpu`].
//!
//! Takes its prompt input and status output as generic `Read`/`Write`
//! streams rather than hard-coding stdin/stdout, so a caller can drive
//! it from a test with an in-memory buffer instead of a terminal.

use std::io::{BufRead, Write};

use crate::cpu_6502::Cpu;
use crate::error::ToolchainResult;

const HELP_TEXT: &str = "\
c  show CPU state
e  execute one instruction
f  switch to free-run
h  show this help
m@AAAA  read byte at address AAAA
p  show current opcode
r  reset
s  dump stack page
t  halt
z  dump zero page";

/// Runs `cpu` from its current `pc` until it passes `end_address` or
/// the user issues `t`. In single-step mode, prompts for one command
/// per instruction; `f` switches to a free-run that no longer prompts.
pub fn run<R: BufRead, W: Write>(cpu: &mut Cpu, input: &mut R, output: &mut W) -> ToolchainResult<()> {
    writeln!(output, "{}", banner(cpu.pc)).ok();

    let mut free_run = false;
    let mut halted = false;

    while !halted && cpu.pc <= cpu.end_address {
        if free_run {
            cpu.step()?;
            continue;
        }

        write!(output, "(${:04X}) > ", cpu.pc).ok();
        output.flush().ok();
        let mut line = String::new();
        if input.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "c" => {
                writeln!(output, "{}", cpu_state_line(cpu)).ok();
            }
            "e" => {
                cpu.step()?;
            }
            "f" => free_run = true,
            "h" => {
                writeln!(output, "{}", HELP_TEXT).ok();
            }
            "p" => {
                let byte = cpu.memory.read(cpu.pc);
                writeln!(output, "opcode ${:02X} at ${:04X}", byte, cpu.pc).ok();
            }
            "r" => cpu.reset(),
            "s" => {
                write!(output, "{}", cpu.memory.dump(0x0100, 0x100)).ok();
            }
            "t" => halted = true,
            "z" => {
                write!(output, "{}", cpu.memory.dump(0x0000, 0x100)).ok();
            }
            cmd if cmd.starts_with("m@") => {
                if let Ok(addr) = u16::from_str_radix(&cmd[2..], 16) {
                    writeln!(output, "${:04X}: {:02X}", addr, cpu.memory.read(addr)).ok();
                } else {
                    writeln!(output, "bad address: {}", &cmd[2..]).ok();
                }
            }
            "" => {}
            other => {
                writeln!(output, "unknown command: {} (h for help)", other).ok();
            }
        }
    }

    writeln!(output, "{}", footer(cpu)).ok();
    Ok(())
}

fn banner(start: u16) -> String {
    format!(";;;;;;;;;;;;;;;;;;;;;;;;;\n; debug starting at ${:04X}\n;;;;;;;;;;;;;;;;;;;;;;;;;", start)
}

fn footer(cpu: &Cpu) -> String {
    format!(
        ";;;;;;;;;;;;;;;;;;;;;;;;;\n; halted at ${:04X}, {} cycles\n;;;;;;;;;;;;;;;;;;;;;;;;;",
        cpu.pc, cpu.total_cycles
    )
}

/// The `c` command's line format: `PC:0xAAAA A:0xAA X:0xAA Y:0xAA
/// SP:0xAA Flags:0xAA CPU Cycles:N`.
pub fn cpu_state_line(cpu: &Cpu) -> String {
    format!(
        "PC:{:#06x} A:{:#04x} X:{:#04x} Y:{:#04x} SP:{:#04x} Flags:{:#04x} CPU Cycles:{}",
        cpu.pc, cpu.a, cpu.x, cpu.y, cpu.s, cpu.p, cpu.total_cycles
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::memory::vectors;

    fn cpu_with_program(program: &[u8]) -> Cpu {
        let mut cpu = Cpu::new();
        let end = cpu.memory.load(0x1000, program).unwrap();
        cpu.memory.write16(vectors::RESET, 0x1000);
        cpu.reset();
        cpu.end_address = end.wrapping_sub(1);
        cpu
    }

    #[test]
    fn c_command_prints_formatted_cpu_state() {
        let mut cpu = cpu_with_program(&[0xEA, 0xEA]);
        let mut input = std::io::Cursor::new(b"c\nt\n".to_vec());
        let mut output = Vec::new();
        run(&mut cpu, &mut input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("PC:0x1000"));
        assert!(text.contains("CPU Cycles:0"));
    }

    #[test]
    fn e_command_steps_exactly_one_instruction() {
        let mut cpu = cpu_with_program(&[0xA9, 0x05, 0xEA]);
        let mut input = std::io::Cursor::new(b"e\nc\nt\n".to_vec());
        let mut output = Vec::new();
        run(&mut cpu, &mut input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("PC:0x1002"));
        assert!(text.contains("A:0x05"));
    }

    #[test]
    fn f_switches_to_free_run_until_end_address() {
        let mut cpu = cpu_with_program(&[0xA9, 0x01, 0xA9, 0x02]);
        let mut input = std::io::Cursor::new(b"f\n".to_vec());
        let mut output = Vec::new();
        run(&mut cpu, &mut input, &mut output).unwrap();
        assert_eq!(cpu.a, 0x02);
    }

    #[test]
    fn m_at_address_reads_a_byte() {
        let mut cpu = cpu_with_program(&[0xEA]);
        cpu.memory.write(0x2000, 0xAB);
        let mut input = std::io::Cursor::new(b"m@2000\nt\n".to_vec());
        let mut output = Vec::new();
        run(&mut cpu, &mut input, &mut output).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("$2000: AB"));
    }

    #[test]
    fn t_halts_immediately() {
        let mut cpu = cpu_with_program(&[0xA9, 0x01, 0xA9, 0x02]);
        let mut input = std::io::Cursor::new(b"t\n".to_vec());
        let mut output = Vec::new();
        run(&mut cpu, &mut input, &mut output).unwrap();
        assert_eq!(cpu.a, 0); // nothing executed
    }
}
