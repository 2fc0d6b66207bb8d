//! The two-pass assembler: source lines in, assigned bytes and a hex
//! listing out.
//!
//! Rather than threading a global "which pass am I on" counter through
//! one shared code path, pass 1 and pass 2 are two distinct drivers over
//! the same `Vec<SourceLine>` (`Design Notes: Two-pass symbol table`).
//! Pass 1 only advances the program counter and binds labels; it is
//! silent on errors by design, since a forward-referenced label is
//! indistinguishable from a typo until pass 2 has the whole symbol
//! table. The one piece of state that has to survive from pass 1 into
//! pass 2 besides the label table itself is, per line, which
//! addressing-mode width pass 1 committed to for that line's opcode
//! operand — if pass 1 treated a still-undefined label as "assume
//! absolute" (the conservative length the Design Notes call for), pass 2
//! has to keep using that width even once the label is resolved and
//! might also fit in zero page, or the two passes would disagree about
//! how many bytes the instruction occupies and every later address
//! would be wrong.

mod expr;

use std::collections::HashMap;

use crate::context::ToolchainContext;
use crate::error::{ToolchainError, ToolchainResult};
use crate::lexer::{normalize_lines, Lexer, SourceLine, Token};
use crate::opcodes::{self, AddressingMode, Mnemonic};

#[derive(Debug, Default)]
pub struct LabelTable {
    bindings: HashMap<String, i64>,
}

impl LabelTable {
    pub fn bind(&mut self, name: &str, value: i64) {
        self.bindings.insert(name.to_string(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<i64> {
        self.bindings.get(name).copied()
    }
}

/// One instruction's or data byte's worth of assembled output, tagged
/// with the address it was placed at. Data directives emit one
/// `AssembledLine` per byte, matching the "one byte per line" output
/// rule; instructions emit one `AssembledLine` carrying their full
/// opcode-plus-operand bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledLine {
    pub address: u16,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct AssembledProgram {
    pub lines: Vec<AssembledLine>,
    pub start_address: u16,
}

impl AssembledProgram {
    /// Concatenates every emitted line's bytes in emission order. Valid
    /// for the common case of a single contiguous program with no
    /// backward `.ORG`; the toolchain does not attempt to reconcile
    /// overlapping or out-of-order origins into one buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.lines.iter().flat_map(|line| line.bytes.clone()).collect()
    }

    /// Renders the listing format from §External Interfaces: one text
    /// line per `AssembledLine`, hex bytes upper-case and
    /// space-separated, optionally prefixed with a 4-digit address.
    pub fn format_listing(&self, ctx: &ToolchainContext) -> String {
        let mut out = String::new();
        for line in &self.lines {
            if ctx.include_counter {
                out.push_str(&format!("{:04X} ", line.address));
            }
            let hex: Vec<String> = line.bytes.iter().map(|b| format!("{:02X}", b)).collect();
            out.push_str(&hex.join(" "));
            out.push('\n');
        }
        out
    }
}

/// Assembles `source` into an `AssembledProgram`. Pass 1 silently binds
/// labels and records addressing-mode decisions; pass 2 re-walks the
/// same lines, now with a complete label table, and emits bytes,
/// collecting every diagnostic it hits rather than stopping at the
/// first one (per §Error Handling Design's pass-2 propagation policy).
pub fn assemble(source: &str, ctx: &ToolchainContext) -> ToolchainResult<AssembledProgram> {
    let lines = normalize_lines(source);
    let mut labels = LabelTable::default();
    let pass1 = run_pass1(&lines, ctx.start_address, &mut labels);

    let mut program = AssembledProgram {
        lines: Vec::new(),
        start_address: ctx.start_address,
    };
    let mut errors = Vec::new();
    run_pass2(&lines, ctx.start_address, &labels, &pass1.modes, &mut program, &mut errors);

    if let Some(first) = errors.into_iter().next() {
        return Err(first);
    }
    Ok(program)
}

struct Pass1Result {
    /// Parallel to `lines`: the addressing mode pass 1 committed to for
    /// each opcode line, `None` for lines with no opcode.
    modes: Vec<Option<AddressingMode>>,
}

fn run_pass1(lines: &[SourceLine], start_address: u16, labels: &mut LabelTable) -> Pass1Result {
    let mut pc = start_address;
    let mut modes = Vec::with_capacity(lines.len());
    let mut stopped = false;

    for line in lines {
        if stopped {
            modes.push(None);
            continue;
        }
        let mut lexer = Lexer::new(line);
        let mut line_mode = None;
        let outcome = process_line(&mut lexer, line, pc, labels, None);
        match outcome {
            Ok(LineOutcome::Opcode { mode, len }) => {
                line_mode = Some(mode);
                pc = pc.wrapping_add(len as u16);
            }
            Ok(LineOutcome::Data { byte_count }) => {
                pc = pc.wrapping_add(byte_count as u16);
            }
            Ok(LineOutcome::SetOrigin { address }) => {
                pc = address;
            }
            Ok(LineOutcome::LabelOnly) => {}
            Ok(LineOutcome::End) => {
                stopped = true;
            }
            Err(_) => {
                // Pass 1 suppresses diagnostics; pass 2 will hit and
                // report the identical syntax problem. There is nothing
                // sound to advance the program counter by, so this line
                // contributes no further shift.
            }
        }
        modes.push(line_mode);
    }

    Pass1Result { modes }
}

fn run_pass2(
    lines: &[SourceLine],
    start_address: u16,
    labels: &LabelTable,
    pass1_modes: &[Option<AddressingMode>],
    program: &mut AssembledProgram,
    errors: &mut Vec<ToolchainError>,
) {
    let mut pc = start_address;
    let mut stopped = false;

    for (index, line) in lines.iter().enumerate() {
        if stopped {
            break;
        }
        let mut lexer = Lexer::new(line);
        let forced_mode = pass1_modes.get(index).copied().flatten();
        match emit_pass2_line(&mut lexer, line, pc, labels, forced_mode) {
            Ok(Emission::Instruction(bytes)) => {
                let len = bytes.len() as u16;
                program.lines.push(AssembledLine { address: pc, bytes });
                pc = pc.wrapping_add(len);
            }
            Ok(Emission::Data(bytes)) => {
                let len = bytes.len() as u16;
                for (offset, byte) in bytes.into_iter().enumerate() {
                    program.lines.push(AssembledLine {
                        address: pc.wrapping_add(offset as u16),
                        bytes: vec![byte],
                    });
                }
                pc = pc.wrapping_add(len);
            }
            Ok(Emission::SetOrigin(address)) => pc = address,
            Ok(Emission::Nothing) => {}
            Ok(Emission::End) => stopped = true,
            Err(err) => errors.push(err),
        }
    }
}

enum LineOutcome {
    Opcode { mode: AddressingMode, len: u8 },
    Data { byte_count: usize },
    SetOrigin { address: u16 },
    LabelOnly,
    End,
}

enum Emission {
    Instruction(Vec<u8>),
    Data(Vec<u8>),
    SetOrigin(u16),
    Nothing,
    End,
}

/// Shared line-recognition logic (§Assembler "Per-line recognition").
/// Used by pass 1 purely for program-counter/label bookkeeping; pass 2's
/// actual byte emission happens in `emit_pass2_line`, which mirrors this
/// function's control flow exactly so the two never disagree about
/// which branch of the grammar a line takes.
fn process_line(
    lexer: &mut Lexer,
    line: &SourceLine,
    pc: u16,
    labels: &mut LabelTable,
    forced_mode: Option<AddressingMode>,
) -> ToolchainResult<LineOutcome> {
    match lexer.next_token() {
        Token::Eol => Ok(LineOutcome::LabelOnly),
        Token::Opcode(name) => {
            let mnemonic = Mnemonic::from_str(&name).expect("lexer only emits known opcodes");
            let labels_snapshot = &*labels;
            let (mode, bytes) =
                resolve_operand(lexer, mnemonic, labels_snapshot, pc, line, forced_mode, false)?;
            Ok(LineOutcome::Opcode {
                mode,
                len: 1 + bytes.len() as u8,
            })
        }
        Token::Pseudo(name) => {
            let outcome = process_pseudo(&name, lexer, labels, pc, line)?;
            Ok(outcome)
        }
        Token::Asterisk => {
            expect(lexer, Token::Equal, line)?;
            let value = expr::parse_expression(lexer, labels, pc, line)?;
            let address = expr::checked_word(value.value, 0, 0xFFFF, line)?;
            Ok(LineOutcome::SetOrigin { address })
        }
        Token::Label(name) => {
            match lexer.next_token() {
                Token::Equal => {
                    let value = expr::parse_expression(lexer, labels, pc, line)?;
                    let word = expr::checked_word(value.value, i16::MIN as i64, 0xFFFF, line)?;
                    labels.bind(&name, word as i64);
                    Ok(LineOutcome::LabelOnly)
                }
                Token::Eol => {
                    labels.bind(&name, pc as i64);
                    Ok(LineOutcome::LabelOnly)
                }
                Token::Colon => {
                    labels.bind(&name, pc as i64);
                    // A label's trailing `:` may be followed by an
                    // opcode or pseudo-op on the same line.
                    match lexer.next_token() {
                        Token::Eol => Ok(LineOutcome::LabelOnly),
                        Token::Pseudo(pseudo_name) if pseudo_name == "EQU" => {
                            let value = expr::parse_expression(lexer, labels, pc, line)?;
                            let word = expr::checked_word(value.value, i16::MIN as i64, 0xFFFF, line)?;
                            labels.bind(&name, word as i64);
                            Ok(LineOutcome::LabelOnly)
                        }
                        Token::Pseudo(pseudo_name) => process_pseudo(&pseudo_name, lexer, labels, pc, line),
                        Token::Opcode(op_name) => {
                            let mnemonic = Mnemonic::from_str(&op_name).expect("lexer only emits known opcodes");
                            let (mode, bytes) = resolve_operand(lexer, mnemonic, labels, pc, line, forced_mode, false)?;
                            Ok(LineOutcome::Opcode {
                                mode,
                                len: 1 + bytes.len() as u8,
                            })
                        }
                        other => Err(ToolchainError::SyntaxError {
                            line: line.file_line,
                            message: format!("unexpected token after \"{}:\": {:?}", name, other),
                        }),
                    }
                }
                Token::Pseudo(pseudo_name) if pseudo_name == "EQU" => {
                    let value = expr::parse_expression(lexer, labels, pc, line)?;
                    let word = expr::checked_word(value.value, i16::MIN as i64, 0xFFFF, line)?;
                    labels.bind(&name, word as i64);
                    Ok(LineOutcome::LabelOnly)
                }
                Token::Pseudo(pseudo_name) => {
                    labels.bind(&name, pc as i64);
                    process_pseudo(&pseudo_name, lexer, labels, pc, line)
                }
                Token::Opcode(op_name) => {
                    labels.bind(&name, pc as i64);
                    let mnemonic = Mnemonic::from_str(&op_name).expect("lexer only emits known opcodes");
                    let (mode, bytes) = resolve_operand(lexer, mnemonic, labels, pc, line, forced_mode, false)?;
                    Ok(LineOutcome::Opcode {
                        mode,
                        len: 1 + bytes.len() as u8,
                    })
                }
                _ => Err(ToolchainError::SyntaxError {
                    line: line.file_line,
                    message: format!("unexpected token after label \"{}\"", name),
                }),
            }
        }
        other => Err(ToolchainError::SyntaxError {
            line: line.file_line,
            message: format!("unexpected token {:?}", other),
        }),
    }
}

/// Re-walks a line exactly as `process_line` does, but returns the
/// actual bytes to emit rather than just their count. Kept as a
/// separate function (instead of having `process_line` always emit)
/// because pass 1 never has a complete label table and must not be
/// trusted to produce final bytes.
fn emit_pass2_line(
    lexer: &mut Lexer,
    line: &SourceLine,
    pc: u16,
    labels: &LabelTable,
    forced_mode: Option<AddressingMode>,
) -> ToolchainResult<Emission> {
    match lexer.next_token() {
        Token::Eol => Ok(Emission::Nothing),
        Token::Opcode(name) => {
            let mnemonic = Mnemonic::from_str(&name).expect("lexer only emits known opcodes");
            let (mode, operand_bytes) = resolve_operand(lexer, mnemonic, labels, pc, line, forced_mode, true)?;
            let opcode_byte = opcodes::encode(mnemonic, mode).ok_or(ToolchainError::IllegalAddressingMode {
                line: line.file_line,
                mnemonic: mnemonic.as_str().to_string(),
                mode: mode.name(),
            })?;
            let mut bytes = vec![opcode_byte];
            bytes.extend(operand_bytes);
            Ok(Emission::Instruction(bytes))
        }
        Token::Pseudo(name) => emit_pseudo(&name, lexer, labels, pc, line, true),
        Token::Asterisk => {
            expect(lexer, Token::Equal, line)?;
            let value = expr::parse_expression(lexer, labels, pc, line)?;
            require_resolved(&value, line, true)?;
            let address = expr::checked_word(value.value, 0, 0xFFFF, line)?;
            Ok(Emission::SetOrigin(address))
        }
        Token::Label(_name) => match lexer.next_token() {
            Token::Equal => {
                let value = expr::parse_expression(lexer, labels, pc, line)?;
                require_resolved(&value, line, true)?;
                Ok(Emission::Nothing)
            }
            Token::Eol => Ok(Emission::Nothing),
            Token::Colon => match lexer.next_token() {
                Token::Eol => Ok(Emission::Nothing),
                Token::Pseudo(pseudo_name) if pseudo_name == "EQU" => {
                    let value = expr::parse_expression(lexer, labels, pc, line)?;
                    require_resolved(&value, line, true)?;
                    Ok(Emission::Nothing)
                }
                Token::Pseudo(pseudo_name) => emit_pseudo(&pseudo_name, lexer, labels, pc, line, true),
                Token::Opcode(op_name) => {
                    let mnemonic = Mnemonic::from_str(&op_name).expect("lexer only emits known opcodes");
                    let (mode, operand_bytes) = resolve_operand(lexer, mnemonic, labels, pc, line, forced_mode, true)?;
                    let opcode_byte = opcodes::encode(mnemonic, mode).ok_or(ToolchainError::IllegalAddressingMode {
                        line: line.file_line,
                        mnemonic: mnemonic.as_str().to_string(),
                        mode: mode.name(),
                    })?;
                    let mut bytes = vec![opcode_byte];
                    bytes.extend(operand_bytes);
                    Ok(Emission::Instruction(bytes))
                }
                _ => Ok(Emission::Nothing),
            },
            Token::Pseudo(pseudo_name) if pseudo_name == "EQU" => {
                let value = expr::parse_expression(lexer, labels, pc, line)?;
                require_resolved(&value, line, true)?;
                Ok(Emission::Nothing)
            }
            Token::Pseudo(pseudo_name) => emit_pseudo(&pseudo_name, lexer, labels, pc, line, true),
            Token::Opcode(op_name) => {
                let mnemonic = Mnemonic::from_str(&op_name).expect("lexer only emits known opcodes");
                let (mode, operand_bytes) = resolve_operand(lexer, mnemonic, labels, pc, line, forced_mode, true)?;
                let opcode_byte = opcodes::encode(mnemonic, mode).ok_or(ToolchainError::IllegalAddressingMode {
                    line: line.file_line,
                    mnemonic: mnemonic.as_str().to_string(),
                    mode: mode.name(),
                })?;
                let mut bytes = vec![opcode_byte];
                bytes.extend(operand_bytes);
                Ok(Emission::Instruction(bytes))
            }
            _ => Ok(Emission::Nothing),
        },
        _ => Ok(Emission::Nothing),
    }
}

fn expect(lexer: &mut Lexer, expected: Token, line: &SourceLine) -> ToolchainResult<()> {
    let found = lexer.next_token();
    if found == expected {
        Ok(())
    } else {
        Err(ToolchainError::SyntaxError {
            line: line.file_line,
            message: format!("expected {:?}, found {:?}", expected, found),
        })
    }
}

/// Dispatches a pseudo-op purely for its byte-count/PC effect (pass 1).
fn process_pseudo(
    name: &str,
    lexer: &mut Lexer,
    labels: &mut LabelTable,
    pc: u16,
    line: &SourceLine,
) -> ToolchainResult<LineOutcome> {
    match emit_pseudo(name, lexer, labels, pc, line, false)? {
        Emission::Data(bytes) => Ok(LineOutcome::Data {
            byte_count: bytes.len(),
        }),
        Emission::SetOrigin(address) => Ok(LineOutcome::SetOrigin { address }),
        Emission::End => Ok(LineOutcome::End),
        Emission::Nothing | Emission::Instruction(_) => Ok(LineOutcome::LabelOnly),
    }
}

fn emit_pseudo(
    name: &str,
    lexer: &mut Lexer,
    labels: &LabelTable,
    pc: u16,
    line: &SourceLine,
    strict: bool,
) -> ToolchainResult<Emission> {
    match name {
        "ORG" => {
            let value = expr::parse_expression(lexer, labels, pc, line)?;
            require_resolved(&value, line, strict)?;
            let address = expr::checked_word(value.value, 0, 0xFFFF, line)?;
            Ok(Emission::SetOrigin(address))
        }
        "BYTE" | "DB" => {
            let mut bytes = Vec::new();
            collect_byte_items(lexer, labels, pc, line, &mut bytes, strict)?;
            Ok(Emission::Data(bytes))
        }
        "ASCII" | "TX" => {
            expect(lexer, Token::Quote, line)?;
            // scan_quoted_string already consumes the closing quote.
            let text = lexer.scan_quoted_string().ok_or(ToolchainError::SyntaxError {
                line: line.file_line,
                message: "unterminated string".to_string(),
            })?;
            Ok(Emission::Data(text.into_bytes()))
        }
        "WORD" | "DW" => {
            let mut bytes = Vec::new();
            loop {
                let value = expr::parse_expression(lexer, labels, pc, line)?;
                require_resolved(&value, line, strict)?;
                let word = expr::checked_word(value.value, i32::MIN as i64, 0xFFFF, line)?;
                bytes.push((word & 0xFF) as u8);
                bytes.push((word >> 8) as u8);
                match lexer.next_token() {
                    Token::Comma => continue,
                    other => {
                        lexer.unget_token(other);
                        break;
                    }
                }
            }
            Ok(Emission::Data(bytes))
        }
        "END" => Ok(Emission::End),
        "EQU" => Err(ToolchainError::SyntaxError {
            line: line.file_line,
            message: "EQU must follow a label".to_string(),
        }),
        other => Err(ToolchainError::SyntaxError {
            line: line.file_line,
            message: format!("unknown pseudo-op \".{}\"", other),
        }),
    }
}

fn collect_byte_items(
    lexer: &mut Lexer,
    labels: &LabelTable,
    pc: u16,
    line: &SourceLine,
    bytes: &mut Vec<u8>,
    strict: bool,
) -> ToolchainResult<()> {
    loop {
        match lexer.next_token() {
            Token::Quote => {
                let text = lexer.scan_quoted_string().ok_or(ToolchainError::SyntaxError {
                    line: line.file_line,
                    message: "unterminated string".to_string(),
                })?;
                bytes.extend(text.into_bytes());
            }
            other => {
                lexer.unget_token(other);
                let value = expr::parse_expression(lexer, labels, pc, line)?;
                require_resolved(&value, line, strict)?;
                bytes.push(expr::checked_byte(value.value, i16::MIN as i64, 0xFF, line)?);
            }
        }
        match lexer.next_token() {
            Token::Comma => continue,
            other => {
                lexer.unget_token(other);
                break;
            }
        }
    }
    Ok(())
}

/// Operand resolution: the heart of the assembler (§Assembler).
///
/// `forced_mode` carries pass 1's addressing-mode decision for this
/// line forward into pass 2. Branches always use `Rel` regardless (a
/// branch operand's width never depends on the target's value), so they
/// ignore it; zero-page/absolute operands honor it so a label that was
/// undefined (and therefore conservatively widened to absolute) during
/// pass 1 keeps the same width once it's resolved in pass 2, even if
/// its final value would otherwise fit in zero page.
fn resolve_operand(
    lexer: &mut Lexer,
    mnemonic: Mnemonic,
    labels: &LabelTable,
    pc: u16,
    line: &SourceLine,
    forced_mode: Option<AddressingMode>,
    strict: bool,
) -> ToolchainResult<(AddressingMode, Vec<u8>)> {
    let first = lexer.next_token();
    match first {
        Token::Eol => Ok((AddressingMode::Imp, Vec::new())),
        Token::RegisterA => Ok((AddressingMode::Acc, Vec::new())),
        Token::Hash => {
            let value = expr::parse_expression(lexer, labels, pc, line)?;
            require_resolved(&value, line, strict)?;
            let byte = expr::checked_byte(value.value, -128, 255, line)?;
            Ok((AddressingMode::Imm, vec![byte]))
        }
        Token::LParen => resolve_indirect_operand(lexer, labels, pc, line, strict),
        Token::Integer(_) | Token::Label(_) => {
            lexer.unget_token(first);
            if mnemonic.is_branch() {
                resolve_branch_operand(lexer, labels, pc, line, strict)
            } else {
                resolve_direct_operand(lexer, labels, pc, line, forced_mode, strict)
            }
        }
        other => Err(ToolchainError::SyntaxError {
            line: line.file_line,
            message: format!("value expected, found {:?}", other),
        }),
    }
}

/// Errors with `UndefinedLabel` if `value` is still a forward reference
/// in a context where every label should already be bound — i.e.
/// anywhere in pass 2, which runs only after pass 1 has recorded every
/// label the program ever binds.
fn require_resolved(value: &expr::ExprValue, line: &SourceLine, strict: bool) -> ToolchainResult<()> {
    if strict && value.forward_reference {
        return Err(ToolchainError::UndefinedLabel {
            line: line.file_line,
            name: value.missing_label.clone().unwrap_or_else(|| "?".to_string()),
        });
    }
    Ok(())
}

fn resolve_branch_operand(
    lexer: &mut Lexer,
    labels: &LabelTable,
    pc: u16,
    line: &SourceLine,
    strict: bool,
) -> ToolchainResult<(AddressingMode, Vec<u8>)> {
    let target = expr::parse_expression(lexer, labels, pc, line)?;
    require_resolved(&target, line, strict)?;
    if target.forward_reference {
        // Pass 1: target not yet known. The displacement byte is a
        // placeholder; only the 2-byte instruction length matters here.
        return Ok((AddressingMode::Rel, vec![0]));
    }
    let displacement = target.value - (pc as i64 + 2);
    if !(-128..=127).contains(&displacement) {
        return Err(ToolchainError::BranchOutOfRange {
            line: line.file_line,
            displacement,
        });
    }
    Ok((AddressingMode::Rel, vec![(displacement & 0xFF) as u8]))
}

fn resolve_direct_operand(
    lexer: &mut Lexer,
    labels: &LabelTable,
    pc: u16,
    line: &SourceLine,
    forced_mode: Option<AddressingMode>,
    strict: bool,
) -> ToolchainResult<(AddressingMode, Vec<u8>)> {
    let operand = expr::parse_expression(lexer, labels, pc, line)?;
    require_resolved(&operand, line, strict)?;
    let zero_page_eligible = !operand.forward_reference && (0..=0xFF).contains(&operand.value);

    let index = match lexer.next_token() {
        Token::Comma => match lexer.next_token() {
            Token::RegisterX => Some(Register::X),
            Token::RegisterY => Some(Register::Y),
            other => {
                return Err(ToolchainError::SyntaxError {
                    line: line.file_line,
                    message: format!("expected X or Y after comma, found {:?}", other),
                })
            }
        },
        other => {
            lexer.unget_token(other);
            None
        }
    };

    let mode = match (forced_mode, index) {
        (Some(mode), _) => mode,
        (None, None) => {
            if zero_page_eligible {
                AddressingMode::Zp
            } else {
                AddressingMode::Abs
            }
        }
        (None, Some(Register::X)) => {
            if zero_page_eligible {
                AddressingMode::Zpx
            } else {
                AddressingMode::Absx
            }
        }
        (None, Some(Register::Y)) => {
            if zero_page_eligible {
                AddressingMode::Zpy
            } else {
                AddressingMode::Absy
            }
        }
    };

    let bytes = match mode {
        AddressingMode::Zp | AddressingMode::Zpx | AddressingMode::Zpy => {
            vec![expr::checked_byte(operand.value, i16::MIN as i64, 0xFF, line)?]
        }
        AddressingMode::Abs | AddressingMode::Absx | AddressingMode::Absy => {
            let word = expr::checked_word(operand.value, i32::MIN as i64, 0xFFFF, line)?;
            vec![(word & 0xFF) as u8, (word >> 8) as u8]
        }
        _ => unreachable!("resolve_direct_operand only produces zero-page/absolute modes"),
    };
    Ok((mode, bytes))
}

enum Register {
    X,
    Y,
}

fn resolve_indirect_operand(
    lexer: &mut Lexer,
    labels: &LabelTable,
    pc: u16,
    line: &SourceLine,
    strict: bool,
) -> ToolchainResult<(AddressingMode, Vec<u8>)> {
    let operand = expr::parse_expression(lexer, labels, pc, line)?;
    require_resolved(&operand, line, strict)?;
    match lexer.next_token() {
        Token::Comma => {
            expect(lexer, Token::RegisterX, line)?;
            expect(lexer, Token::RParen, line)?;
            let byte = expr::checked_byte(operand.value, i16::MIN as i64, 0xFF, line)?;
            Ok((AddressingMode::Indx, vec![byte]))
        }
        Token::RParen => match lexer.next_token() {
            Token::Comma => {
                expect(lexer, Token::RegisterY, line)?;
                let byte = expr::checked_byte(operand.value, i16::MIN as i64, 0xFF, line)?;
                Ok((AddressingMode::Indy, vec![byte]))
            }
            other => {
                lexer.unget_token(other);
                let word = expr::checked_word(operand.value, 0, 0xFFFF, line)?;
                Ok((AddressingMode::Ind, vec![(word & 0xFF) as u8, (word >> 8) as u8]))
            }
        },
        other => Err(ToolchainError::SyntaxError {
            line: line.file_line,
            message: format!("expected ',' or ')', found {:?}", other),
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ctx(start: u16, include_counter: bool) -> ToolchainContext {
        ToolchainContext::new(start, include_counter)
    }

    #[test]
    fn scenario_a_immediate_load() {
        let program = assemble("LDA #$05", &ctx(0x1000, false)).unwrap();
        assert_eq!(program.to_bytes(), vec![0xA9, 0x05]);
    }

    #[test]
    fn scenario_b_labelled_branch() {
        let source = "*=$1000\nLOOP: LDX #$03\nDEX\nBNE LOOP\n";
        let program = assemble(source, &ctx(0x1000, false)).unwrap();
        assert_eq!(program.to_bytes(), vec![0xA2, 0x03, 0xCA, 0xD0, 0xFB]);
    }

    #[test]
    fn scenario_c_absolute_store_and_load() {
        let source = "LDA #$7F\nSTA $2000\nLDA #$00\nLDA $2000\n";
        let program = assemble(source, &ctx(0x1000, false)).unwrap();
        assert_eq!(
            program.to_bytes(),
            vec![0xA9, 0x7F, 0x8D, 0x00, 0x20, 0xA9, 0x00, 0xAD, 0x00, 0x20]
        );
    }

    #[test]
    fn scenario_d_data_directives() {
        let source = ".BYTE $01, $02, $03\n.WORD $ABCD\n";
        let program = assemble(source, &ctx(0x0200, false)).unwrap();
        assert_eq!(program.to_bytes(), vec![0x01, 0x02, 0x03, 0xCD, 0xAB]);
        assert_eq!(program.lines.len(), 5);
        assert_eq!(program.lines[0].address, 0x0200);
        assert_eq!(program.lines[4].address, 0x0204);
    }

    #[test]
    fn scenario_f_illegal_addressing_mode() {
        let err = assemble("STX #$01", &ctx(0x1000, false)).unwrap_err();
        assert!(matches!(err, ToolchainError::IllegalAddressingMode { .. }));
    }

    #[test]
    fn undefined_label_is_reported_in_pass_two() {
        let err = assemble("JMP NOWHERE", &ctx(0x1000, false)).unwrap_err();
        assert!(matches!(err, ToolchainError::UndefinedLabel { ref name, .. } if name == "NOWHERE"));
    }

    #[test]
    fn branch_out_of_range_is_reported() {
        let mut source = String::from("START: BNE FAR\n");
        for _ in 0..200 {
            source.push_str("NOP\n");
        }
        source.push_str("FAR: NOP\n");
        let err = assemble(&source, &ctx(0x1000, false)).unwrap_err();
        assert!(matches!(err, ToolchainError::BranchOutOfRange { .. }));
    }

    #[test]
    fn equals_binds_a_value_label() {
        let program = assemble("COUNT = $10\nLDX #COUNT\n", &ctx(0x1000, false)).unwrap();
        assert_eq!(program.to_bytes(), vec![0xA2, 0x10]);
    }

    #[test]
    fn dot_equ_is_equivalent_to_equals() {
        let program = assemble("COUNT .EQU $10\nLDX #COUNT\n", &ctx(0x1000, false)).unwrap();
        assert_eq!(program.to_bytes(), vec![0xA2, 0x10]);
    }

    #[test]
    fn dot_equ_after_a_colon_still_binds_the_value_not_the_pc() {
        let program = assemble("COUNT: .EQU $10\nLDX #COUNT\n", &ctx(0x1000, false)).unwrap();
        assert_eq!(program.to_bytes(), vec![0xA2, 0x10]);
    }

    #[test]
    fn include_counter_prefixes_each_line_with_its_address() {
        let program = assemble("LDA #$05\nSTA $2000\n", &ctx(0x1000, true)).unwrap();
        let listing = program.format_listing(&ctx(0x1000, true));
        let mut lines = listing.lines();
        assert_eq!(lines.next(), Some("1000 A9 05"));
        assert_eq!(lines.next(), Some("1002 8D 00 20"));
    }
}
