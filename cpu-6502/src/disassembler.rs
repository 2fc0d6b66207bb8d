//! Byte stream to assembly-source text, the mirror image of the
//! assembler's encode direction.
//!
//! There's no symbol table on this side: every operand is printed as a
//! literal hex value, including branch targets (`Design Notes:
//! Disassembler`'s choice of absolute address over a relative label,
//! since the source bytes carry no names to recover).

use crate::error::{ToolchainError, ToolchainResult};
use crate::opcodes::{self, AddressingMode};

/// One decoded instruction: the address it starts at, the raw bytes it
/// occupies, and its rendered mnemonic-plus-operand text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisassembledLine {
    pub address: u16,
    pub bytes: Vec<u8>,
    pub text: String,
}

/// Disassembles `bytes` starting at `start_address`, stopping at the
/// end of the slice. Stops with `UnknownOpcode` rather than skipping a
/// byte and resynchronizing, since a silently-skipped byte would
/// desynchronize every following instruction's address.
pub fn disassemble(bytes: &[u8], start_address: u16) -> ToolchainResult<Vec<DisassembledLine>> {
    let mut lines = Vec::new();
    let mut offset = 0usize;
    let mut address = start_address;

    while offset < bytes.len() {
        let opcode_byte = bytes[offset];
        let (mnemonic, mode) = opcodes::decode(opcode_byte).ok_or(ToolchainError::UnknownOpcode {
            context: "disassembler",
            byte: opcode_byte,
        })?;
        let operand_length = mode.operand_length() as usize;
        if offset + 1 + operand_length > bytes.len() {
            return Err(ToolchainError::UnknownOpcode {
                context: "disassembler: truncated operand",
                byte: opcode_byte,
            });
        }
        let operand = &bytes[offset + 1..offset + 1 + operand_length];
        let text = format_instruction(mnemonic.as_str(), mode, operand, address);
        let instruction_bytes = bytes[offset..offset + 1 + operand_length].to_vec();

        lines.push(DisassembledLine {
            address,
            bytes: instruction_bytes,
            text,
        });

        let consumed = 1 + operand_length;
        offset += consumed;
        address = address.wrapping_add(consumed as u16);
    }

    Ok(lines)
}

/// Renders one instruction's mnemonic and operand in the same surface
/// syntax the assembler accepts, so disassembled output re-assembles.
fn format_instruction(mnemonic: &str, mode: AddressingMode, operand: &[u8], address: u16) -> String {
    match mode {
        AddressingMode::Imp => mnemonic.to_string(),
        AddressingMode::Acc => format!("{} A", mnemonic),
        AddressingMode::Imm => format!("{} #${:02X}", mnemonic, operand[0]),
        AddressingMode::Zp => format!("{} ${:02X}", mnemonic, operand[0]),
        AddressingMode::Zpx => format!("{} ${:02X},X", mnemonic, operand[0]),
        AddressingMode::Zpy => format!("{} ${:02X},Y", mnemonic, operand[0]),
        AddressingMode::Abs => format!("{} ${:04X}", mnemonic, word(operand)),
        AddressingMode::Absx => format!("{} ${:04X},X", mnemonic, word(operand)),
        AddressingMode::Absy => format!("{} ${:04X},Y", mnemonic, word(operand)),
        AddressingMode::Ind => format!("{} (${:04X})", mnemonic, word(operand)),
        AddressingMode::Indx => format!("{} (${:02X},X)", mnemonic, operand[0]),
        AddressingMode::Indy => format!("{} (${:02X}),Y", mnemonic, operand[0]),
        AddressingMode::Rel => {
            let displacement = operand[0] as i8;
            let target = (address as i32 + 2 + displacement as i32) as u16;
            format!("{} ${:04X}", mnemonic, target)
        }
    }
}

fn word(operand: &[u8]) -> u16 {
    (operand[0] as u16) | ((operand[1] as u16) << 8)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn immediate_load_round_trips_to_source_syntax() {
        let lines = disassemble(&[0xA9, 0x05], 0x1000).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "LDA #$05");
        assert_eq!(lines[0].address, 0x1000);
    }

    #[test]
    fn absolute_store_renders_four_hex_digits() {
        let lines = disassemble(&[0x8D, 0x00, 0x20], 0x1000).unwrap();
        assert_eq!(lines[0].text, "STA $2000");
    }

    #[test]
    fn branch_target_is_resolved_to_an_absolute_address() {
        // BNE with displacement -5 at address 0x1003 lands on 0x1000.
        let lines = disassemble(&[0xD0, 0xFB], 0x1003).unwrap();
        assert_eq!(lines[0].text, "BNE $1000");
    }

    #[test]
    fn indexed_indirect_and_indirect_indexed_render_correctly() {
        let lines = disassemble(&[0xA1, 0x20, 0xB1, 0x30], 0x1000).unwrap();
        assert_eq!(lines[0].text, "LDA ($20,X)");
        assert_eq!(lines[1].text, "LDA ($30),Y");
    }

    #[test]
    fn unknown_opcode_stops_disassembly_rather_than_skipping() {
        let err = disassemble(&[0xFF], 0x1000).unwrap_err();
        assert!(matches!(err, ToolchainError::UnknownOpcode { byte: 0xFF, .. }));
    }

    #[test]
    fn sequential_instructions_advance_address_by_their_own_length() {
        let lines = disassemble(&[0xA9, 0x05, 0x8D, 0x00, 0x20, 0xEA], 0x1000).unwrap();
        assert_eq!(lines[0].address, 0x1000);
        assert_eq!(lines[1].address, 0x1002);
        assert_eq!(lines[2].address, 0x1005);
    }

    #[test]
    fn multi_instruction_listing_matches_the_assembler_accepted_syntax() {
        let bytes = [0xA9, 0x7F, 0x8D, 0x00, 0x20, 0xA9, 0x00, 0xAD, 0x00, 0x20, 0x60];
        let listing: String = disassemble(&bytes, 0x1000)
            .unwrap()
            .into_iter()
            .map(|l| format!("{}\n", l.text))
            .collect();
        insta::assert_snapshot!(listing, @r"
        LDA #$7F
        STA $2000
        LDA #$00
        LDA $2000
        RTS
        ");
    }
}
