//! The error kinds surfaced by every component of the toolchain.
//!
//! There is one flat enum rather than a per-component error type: the
//! assembler, disassembler, and simulator all bottom out in the same
//! handful of failure shapes, and callers (the CLI front end in
//! particular) want a single type to match on for an exit code.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolchainError {
    /// File access failure. The core never opens files itself; this
    /// variant exists so a caller can fold its own I/O errors into the
    /// same type the assembler/disassembler/simulator return.
    Io(String),

    /// A CLI start address outside 1..=65535, or a memory operation
    /// that targeted an address outside 0..=65535 before modular wrap.
    InvalidAddress { value: i64 },

    /// Unexpected or missing token in assembly source.
    SyntaxError { line: usize, message: String },

    /// A label was referenced in pass 2 with no binding.
    UndefinedLabel { line: usize, name: String },

    /// The opcode table has no encoding for the resolved
    /// (mnemonic, addressing mode) pair.
    IllegalAddressingMode {
        line: usize,
        mnemonic: String,
        mode: &'static str,
    },

    /// An expression's value fell outside the caller-supplied range.
    ValueOutOfRange { line: usize, value: i64, min: i64, max: i64 },

    /// A relative branch displacement fell outside -128..127.
    BranchOutOfRange { line: usize, displacement: i64 },

    /// The disassembler or simulator fetched a byte with no table entry.
    UnknownOpcode { context: &'static str, byte: u8 },

    /// A `Memory::load` was asked to write more than 64 KiB.
    MemoryOverflow { attempted: usize },
}

impl fmt::Display for ToolchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolchainError::Io(message) => write!(f, "I/O error: {}", message),
            ToolchainError::InvalidAddress { value } => {
                write!(f, "invalid address: {:#06x} is outside 1..=65535", value)
            }
            ToolchainError::SyntaxError { line, message } => {
                write!(f, "line {}: syntax error: {}", line, message)
            }
            ToolchainError::UndefinedLabel { line, name } => {
                write!(f, "line {}: undefined label \"{}\"", line, name)
            }
            ToolchainError::IllegalAddressingMode { line, mnemonic, mode } => write!(
                f,
                "line {}: illegal addressing mode for {}: {}",
                line, mnemonic, mode
            ),
            ToolchainError::ValueOutOfRange { line, value, min, max } => write!(
                f,
                "line {}: value {} out of range {}..={}",
                line, value, min, max
            ),
            ToolchainError::BranchOutOfRange { line, displacement } => write!(
                f,
                "line {}: branch displacement {} out of range -128..127",
                line, displacement
            ),
            ToolchainError::UnknownOpcode { context, byte } => {
                write!(f, "{}: unknown opcode {:#04x}", context, byte)
            }
            ToolchainError::MemoryOverflow { attempted } => write!(
                f,
                "memory overflow: attempted to load {} bytes into a 64KiB address space",
                attempted
            ),
        }
    }
}

impl std::error::Error for ToolchainError {}

pub type ToolchainResult<T> = Result<T, ToolchainError>;
