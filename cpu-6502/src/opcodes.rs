//! The opcode table: the single source of truth the assembler encodes
//! against and the disassembler/simulator decode against.
//!
//! Every other component treats this module as static data. The table
//! itself is one flat list of `(mnemonic, mode, byte, cycles,
//! page_cross_sensitive)` tuples; `encode` and `decode` are both built
//! from that one list, so the round-trip property (decode(encode(m,
//! mode)) == (m, mode)) holds by construction rather than by keeping two
//! hand-maintained tables in sync.

use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum Mnemonic {
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC,
    CLD, CLI, CLV, CMP, CPX, CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP,
    JSR, LDA, LDX, LDY, LSR, NOP, ORA, PHA, PHP, PHX, PHY, PLA, PLP, PLX,
    PLY, ROL, ROR, RTI, RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY,
    TSX, TXA, TXS, TYA,
}

impl Mnemonic {
    pub fn as_str(self) -> &'static str {
        use Mnemonic::*;
        match self {
            ADC => "ADC", AND => "AND", ASL => "ASL", BCC => "BCC",
            BCS => "BCS", BEQ => "BEQ", BIT => "BIT", BMI => "BMI",
            BNE => "BNE", BPL => "BPL", BRK => "BRK", BVC => "BVC",
            BVS => "BVS", CLC => "CLC", CLD => "CLD", CLI => "CLI",
            CLV => "CLV", CMP => "CMP", CPX => "CPX", CPY => "CPY",
            DEC => "DEC", DEX => "DEX", DEY => "DEY", EOR => "EOR",
            INC => "INC", INX => "INX", INY => "INY", JMP => "JMP",
            JSR => "JSR", LDA => "LDA", LDX => "LDX", LDY => "LDY",
            LSR => "LSR", NOP => "NOP", ORA => "ORA", PHA => "PHA",
            PHP => "PHP", PHX => "PHX", PHY => "PHY", PLA => "PLA",
            PLP => "PLP", PLX => "PLX", PLY => "PLY", ROL => "ROL",
            ROR => "ROR", RTI => "RTI", RTS => "RTS", SBC => "SBC",
            SEC => "SEC", SED => "SED", SEI => "SEI", STA => "STA",
            STX => "STX", STY => "STY", TAX => "TAX", TAY => "TAY",
            TSX => "TSX", TXA => "TXA", TXS => "TXS", TYA => "TYA",
        }
    }

    /// Looks up a mnemonic by its (already upper-cased) source spelling.
    pub fn from_str(word: &str) -> Option<Mnemonic> {
        MNEMONIC_BY_NAME
            .get_or_init(build_mnemonic_by_name)
            .get(word)
            .copied()
    }

    /// `true` for the eight conditional-branch mnemonics; the assembler
    /// uses this to always resolve their operand as a relative
    /// displacement rather than absolute/zero-page.
    pub fn is_branch(self) -> bool {
        matches!(
            self,
            Mnemonic::BPL
                | Mnemonic::BMI
                | Mnemonic::BVC
                | Mnemonic::BVS
                | Mnemonic::BCC
                | Mnemonic::BCS
                | Mnemonic::BNE
                | Mnemonic::BEQ
        )
    }
}

impl std::fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    Imp,
    Acc,
    Imm,
    Zp,
    Zpx,
    Zpy,
    Abs,
    Absx,
    Absy,
    Ind,
    Indx,
    Indy,
    Rel,
}

impl AddressingMode {
    /// Bytes following the opcode byte: 0, 1, or 2.
    pub fn operand_length(self) -> u8 {
        use AddressingMode::*;
        match self {
            Imp | Acc => 0,
            Imm | Zp | Zpx | Zpy | Indx | Indy | Rel => 1,
            Abs | Absx | Absy | Ind => 2,
        }
    }

    pub fn name(self) -> &'static str {
        use AddressingMode::*;
        match self {
            Imp => "implied",
            Acc => "accumulator",
            Imm => "immediate",
            Zp => "zero page",
            Zpx => "zero page,X",
            Zpy => "zero page,Y",
            Abs => "absolute",
            Absx => "absolute,X",
            Absy => "absolute,Y",
            Ind => "indirect",
            Indx => "(indirect,X)",
            Indy => "(indirect),Y",
            Rel => "relative",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpcodeEntry {
    mnemonic: Mnemonic,
    mode: AddressingMode,
    byte: u8,
    cycles: u8,
    /// Whether an indexed read across a page boundary costs one extra
    /// cycle. Never set for store instructions or for branches (branch
    /// page-crossing is handled separately by the simulator, since it
    /// also depends on whether the branch was taken).
    page_cross: bool,
}

macro_rules! entry {
    ($mnemonic:ident, $mode:ident, $byte:literal, $cycles:literal) => {
        OpcodeEntry {
            mnemonic: Mnemonic::$mnemonic,
            mode: AddressingMode::$mode,
            byte: $byte,
            cycles: $cycles,
            page_cross: false,
        }
    };
    ($mnemonic:ident, $mode:ident, $byte:literal, $cycles:literal, +) => {
        OpcodeEntry {
            mnemonic: Mnemonic::$mnemonic,
            mode: AddressingMode::$mode,
            byte: $byte,
            cycles: $cycles,
            page_cross: true,
        }
    };
}

/// The documented NMOS 6502 instruction set plus the CMOS `PHX`/`PHY`/
/// `PLX`/`PLY` stack-register extensions. No undocumented/illegal
/// opcodes are present.
#[rustfmt::skip]
static TABLE: &[OpcodeEntry] = &[
    entry!(ADC, Imm, 0x69, 2), entry!(ADC, Zp, 0x65, 3), entry!(ADC, Zpx, 0x75, 4),
    entry!(ADC, Abs, 0x6D, 4), entry!(ADC, Absx, 0x7D, 4, +), entry!(ADC, Absy, 0x79, 4, +),
    entry!(ADC, Indx, 0x61, 6), entry!(ADC, Indy, 0x71, 5, +),

    entry!(AND, Imm, 0x29, 2), entry!(AND, Zp, 0x25, 3), entry!(AND, Zpx, 0x35, 4),
    entry!(AND, Abs, 0x2D, 4), entry!(AND, Absx, 0x3D, 4, +), entry!(AND, Absy, 0x39, 4, +),
    entry!(AND, Indx, 0x21, 6), entry!(AND, Indy, 0x31, 5, +),

    entry!(ASL, Acc, 0x0A, 2), entry!(ASL, Zp, 0x06, 5), entry!(ASL, Zpx, 0x16, 6),
    entry!(ASL, Abs, 0x0E, 6), entry!(ASL, Absx, 0x1E, 7),

    entry!(BCC, Rel, 0x90, 2), entry!(BCS, Rel, 0xB0, 2), entry!(BEQ, Rel, 0xF0, 2),
    entry!(BIT, Zp, 0x24, 3), entry!(BIT, Abs, 0x2C, 4),
    entry!(BMI, Rel, 0x30, 2), entry!(BNE, Rel, 0xD0, 2), entry!(BPL, Rel, 0x10, 2),
    entry!(BRK, Imp, 0x00, 7),
    entry!(BVC, Rel, 0x50, 2), entry!(BVS, Rel, 0x70, 2),

    entry!(CLC, Imp, 0x18, 2), entry!(CLD, Imp, 0xD8, 2),
    entry!(CLI, Imp, 0x58, 2), entry!(CLV, Imp, 0xB8, 2),

    entry!(CMP, Imm, 0xC9, 2), entry!(CMP, Zp, 0xC5, 3), entry!(CMP, Zpx, 0xD5, 4),
    entry!(CMP, Abs, 0xCD, 4), entry!(CMP, Absx, 0xDD, 4, +), entry!(CMP, Absy, 0xD9, 4, +),
    entry!(CMP, Indx, 0xC1, 6), entry!(CMP, Indy, 0xD1, 5, +),
    entry!(CPX, Imm, 0xE0, 2), entry!(CPX, Zp, 0xE4, 3), entry!(CPX, Abs, 0xEC, 4),
    entry!(CPY, Imm, 0xC0, 2), entry!(CPY, Zp, 0xC4, 3), entry!(CPY, Abs, 0xCC, 4),

    entry!(DEC, Zp, 0xC6, 5), entry!(DEC, Zpx, 0xD6, 6), entry!(DEC, Abs, 0xCE, 6),
    entry!(DEC, Absx, 0xDE, 7),
    entry!(DEX, Imp, 0xCA, 2), entry!(DEY, Imp, 0x88, 2),

    entry!(EOR, Imm, 0x49, 2), entry!(EOR, Zp, 0x45, 3), entry!(EOR, Zpx, 0x55, 4),
    entry!(EOR, Abs, 0x4D, 4), entry!(EOR, Absx, 0x5D, 4, +), entry!(EOR, Absy, 0x59, 4, +),
    entry!(EOR, Indx, 0x41, 6), entry!(EOR, Indy, 0x51, 5, +),

    entry!(INC, Zp, 0xE6, 5), entry!(INC, Zpx, 0xF6, 6), entry!(INC, Abs, 0xEE, 6),
    entry!(INC, Absx, 0xFE, 7),
    entry!(INX, Imp, 0xE8, 2), entry!(INY, Imp, 0xC8, 2),

    entry!(JMP, Abs, 0x4C, 3), entry!(JMP, Ind, 0x6C, 5),
    entry!(JSR, Abs, 0x20, 6),

    entry!(LDA, Imm, 0xA9, 2), entry!(LDA, Zp, 0xA5, 3), entry!(LDA, Zpx, 0xB5, 4),
    entry!(LDA, Abs, 0xAD, 4), entry!(LDA, Absx, 0xBD, 4, +), entry!(LDA, Absy, 0xB9, 4, +),
    entry!(LDA, Indx, 0xA1, 6), entry!(LDA, Indy, 0xB1, 5, +),
    entry!(LDX, Imm, 0xA2, 2), entry!(LDX, Zp, 0xA6, 3), entry!(LDX, Zpy, 0xB6, 4),
    entry!(LDX, Abs, 0xAE, 4), entry!(LDX, Absy, 0xBE, 4, +),
    entry!(LDY, Imm, 0xA0, 2), entry!(LDY, Zp, 0xA4, 3), entry!(LDY, Zpx, 0xB4, 4),
    entry!(LDY, Abs, 0xAC, 4), entry!(LDY, Absx, 0xBC, 4, +),

    entry!(LSR, Acc, 0x4A, 2), entry!(LSR, Zp, 0x46, 5), entry!(LSR, Zpx, 0x56, 6),
    entry!(LSR, Abs, 0x4E, 6), entry!(LSR, Absx, 0x5E, 7),

    entry!(NOP, Imp, 0xEA, 2),

    entry!(ORA, Imm, 0x09, 2), entry!(ORA, Zp, 0x05, 3), entry!(ORA, Zpx, 0x15, 4),
    entry!(ORA, Abs, 0x0D, 4), entry!(ORA, Absx, 0x1D, 4, +), entry!(ORA, Absy, 0x19, 4, +),
    entry!(ORA, Indx, 0x01, 6), entry!(ORA, Indy, 0x11, 5, +),

    entry!(PHA, Imp, 0x48, 3), entry!(PHP, Imp, 0x08, 3),
    entry!(PHX, Imp, 0xDA, 3), entry!(PHY, Imp, 0x5A, 3),
    entry!(PLA, Imp, 0x68, 4), entry!(PLP, Imp, 0x28, 4),
    entry!(PLX, Imp, 0xFA, 4), entry!(PLY, Imp, 0x7A, 4),

    entry!(ROL, Acc, 0x2A, 2), entry!(ROL, Zp, 0x26, 5), entry!(ROL, Zpx, 0x36, 6),
    entry!(ROL, Abs, 0x2E, 6), entry!(ROL, Absx, 0x3E, 7),
    entry!(ROR, Acc, 0x6A, 2), entry!(ROR, Zp, 0x66, 5), entry!(ROR, Zpx, 0x76, 6),
    entry!(ROR, Abs, 0x6E, 6), entry!(ROR, Absx, 0x7E, 7),

    entry!(RTI, Imp, 0x40, 6), entry!(RTS, Imp, 0x60, 6),

    entry!(SBC, Imm, 0xE9, 2), entry!(SBC, Zp, 0xE5, 3), entry!(SBC, Zpx, 0xF5, 4),
    entry!(SBC, Abs, 0xED, 4), entry!(SBC, Absx, 0xFD, 4, +), entry!(SBC, Absy, 0xF9, 4, +),
    entry!(SBC, Indx, 0xE1, 6), entry!(SBC, Indy, 0xF1, 5, +),

    entry!(SEC, Imp, 0x38, 2), entry!(SED, Imp, 0xF8, 2), entry!(SEI, Imp, 0x78, 2),

    entry!(STA, Zp, 0x85, 3), entry!(STA, Zpx, 0x95, 4), entry!(STA, Abs, 0x8D, 4),
    entry!(STA, Absx, 0x9D, 5), entry!(STA, Absy, 0x99, 5),
    entry!(STA, Indx, 0x81, 6), entry!(STA, Indy, 0x91, 6),
    entry!(STX, Zp, 0x86, 3), entry!(STX, Zpy, 0x96, 4), entry!(STX, Abs, 0x8E, 4),
    entry!(STY, Zp, 0x84, 3), entry!(STY, Zpx, 0x94, 4), entry!(STY, Abs, 0x8C, 4),

    entry!(TAX, Imp, 0xAA, 2), entry!(TAY, Imp, 0xA8, 2), entry!(TSX, Imp, 0xBA, 2),
    entry!(TXA, Imp, 0x8A, 2), entry!(TXS, Imp, 0x9A, 2), entry!(TYA, Imp, 0x98, 2),
];

static DECODE: OnceLock<[Option<(Mnemonic, AddressingMode, u8, bool)>; 256]> = OnceLock::new();
static MNEMONIC_BY_NAME: OnceLock<std::collections::HashMap<&'static str, Mnemonic>> =
    OnceLock::new();

fn build_decode_table() -> [Option<(Mnemonic, AddressingMode, u8, bool)>; 256] {
    let mut table = [None; 256];
    for entry in TABLE {
        table[entry.byte as usize] = Some((entry.mnemonic, entry.mode, entry.cycles, entry.page_cross));
    }
    table
}

fn build_mnemonic_by_name() -> std::collections::HashMap<&'static str, Mnemonic> {
    let mut map = std::collections::HashMap::new();
    for entry in TABLE {
        map.insert(entry.mnemonic.as_str(), entry.mnemonic);
    }
    map
}

/// Returns the opcode byte for `(mnemonic, mode)`, or `None` if the
/// 6502 ISA does not define that combination ("illegal addressing
/// mode").
pub fn encode(mnemonic: Mnemonic, mode: AddressingMode) -> Option<u8> {
    TABLE
        .iter()
        .find(|e| e.mnemonic == mnemonic && e.mode == mode)
        .map(|e| e.byte)
}

/// Reverse of `encode`: looks up `(mnemonic, mode)` for an opcode byte.
pub fn decode(byte: u8) -> Option<(Mnemonic, AddressingMode)> {
    DECODE
        .get_or_init(build_decode_table)
        .get(byte as usize)
        .and_then(|entry| entry.map(|(m, mode, _, _)| (m, mode)))
}

/// The nominal cycle count for an opcode byte, before any page-crossing
/// adjustment.
pub fn cycles(byte: u8) -> Option<u8> {
    DECODE
        .get_or_init(build_decode_table)
        .get(byte as usize)
        .and_then(|entry| entry.map(|(_, _, cycles, _)| cycles))
}

/// Whether this opcode byte costs one extra cycle when its indexed
/// addressing crosses a page boundary. Always `false` for store
/// instructions, implied/accumulator/immediate modes, and branches
/// (branches have their own page-crossing rule in the simulator).
pub fn is_page_cross_sensitive(byte: u8) -> bool {
    DECODE
        .get_or_init(build_decode_table)
        .get(byte as usize)
        .and_then(|entry| entry.map(|(_, _, _, page_cross)| page_cross))
        .unwrap_or(false)
}

pub fn operand_length(mode: AddressingMode) -> u8 {
    mode.operand_length()
}

pub fn is_branch(mnemonic: Mnemonic) -> bool {
    mnemonic.is_branch()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_table_entry_round_trips() {
        for entry in TABLE {
            let byte = encode(entry.mnemonic, entry.mode).unwrap();
            assert_eq!(byte, entry.byte);
            let (mnemonic, mode) = decode(byte).unwrap();
            assert_eq!(mnemonic, entry.mnemonic);
            assert_eq!(mode, entry.mode);
        }
    }

    #[test]
    fn every_decode_table_byte_encodes_back_to_itself() {
        for byte in 0u16..=255 {
            let byte = byte as u8;
            if let Some((mnemonic, mode)) = decode(byte) {
                assert_eq!(encode(mnemonic, mode), Some(byte));
            }
        }
    }

    #[test]
    fn illegal_addressing_mode_is_none() {
        // STX has no immediate encoding (Scenario F).
        assert_eq!(encode(Mnemonic::STX, AddressingMode::Imm), None);
    }

    #[test]
    fn is_branch_matches_the_eight_conditional_branches() {
        assert!(Mnemonic::BNE.is_branch());
        assert!(Mnemonic::BEQ.is_branch());
        assert!(!Mnemonic::JMP.is_branch());
        assert!(!Mnemonic::LDA.is_branch());
    }

    #[test]
    fn lda_absx_is_page_cross_sensitive_but_sta_absx_is_not() {
        assert!(is_page_cross_sensitive(0xBD)); // LDA ABSX
        assert!(!is_page_cross_sensitive(0x9D)); // STA ABSX
    }

    #[test]
    fn from_str_is_case_sensitive_to_the_already_uppercased_input() {
        assert_eq!(Mnemonic::from_str("LDA"), Some(Mnemonic::LDA));
        assert_eq!(Mnemonic::from_str("lda"), None);
        assert_eq!(Mnemonic::from_str("FROB"), None);
    }

    #[test]
    fn operand_lengths_cover_every_mode() {
        assert_eq!(AddressingMode::Imp.operand_length(), 0);
        assert_eq!(AddressingMode::Acc.operand_length(), 0);
        assert_eq!(AddressingMode::Imm.operand_length(), 1);
        assert_eq!(AddressingMode::Zp.operand_length(), 1);
        assert_eq!(AddressingMode::Abs.operand_length(), 2);
        assert_eq!(AddressingMode::Ind.operand_length(), 2);
        assert_eq!(AddressingMode::Rel.operand_length(), 1);
    }

    #[test]
    fn cmos_stack_register_extensions_are_present() {
        assert_eq!(encode(Mnemonic::PHX, AddressingMode::Imp), Some(0xDA));
        assert_eq!(encode(Mnemonic::PHY, AddressingMode::Imp), Some(0x5A));
        assert_eq!(encode(Mnemonic::PLX, AddressingMode::Imp), Some(0xFA));
        assert_eq!(encode(Mnemonic::PLY, AddressingMode::Imp), Some(0x7A));
    }
}
