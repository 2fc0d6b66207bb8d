//! End-to-end scenarios exercising the assembler, disassembler, and
//! simulator together, plus the cross-cutting invariants that no single
//! unit test covers alone.

use crate::assembler;
use crate::context::ToolchainContext;
use crate::cpu_6502::Cpu;
use crate::disassembler;
use crate::memory::{vectors, Memory};
use crate::opcodes::{self, AddressingMode, Mnemonic};

fn ctx(start: u16) -> ToolchainContext {
    ToolchainContext::new(start, false)
}

fn cpu_running(origin: u16, bytes: &[u8]) -> Cpu {
    let mut cpu = Cpu::new();
    let end = cpu.memory.load(origin, bytes).unwrap();
    cpu.memory.write16(vectors::RESET, origin);
    cpu.reset();
    cpu.end_address = end.wrapping_sub(1);
    cpu
}

#[test]
fn opcode_table_round_trips_for_every_entry() {
    for byte in 0u16..=255 {
        let byte = byte as u8;
        if let Some((mnemonic, mode)) = opcodes::decode(byte) {
            assert_eq!(opcodes::encode(mnemonic, mode), Some(byte));
        }
    }
}

#[test]
fn instruction_length_agrees_between_assembler_and_disassembler() {
    let program = assembler::assemble("LDA #$05\nSTA $2000\n", &ctx(0x1000)).unwrap();
    let bytes = program.to_bytes();
    let disassembled = disassembler::disassemble(&bytes, 0x1000).unwrap();
    assert_eq!(disassembled[0].bytes.len(), 2); // LDA #imm
    assert_eq!(disassembled[1].bytes.len(), 3); // STA abs
}

#[test]
fn assemble_disassemble_round_trip_with_no_labels() {
    let source = "LDA #$05\nSTA $2000\nLDX $10\nRTS\n";
    let program = assembler::assemble(source, &ctx(0x1000)).unwrap();
    let bytes = program.to_bytes();

    let disassembled = disassembler::disassemble(&bytes, 0x1000).unwrap();
    let reassembled_source: String = disassembled.iter().map(|l| format!("{}\n", l.text)).collect();
    let reassembled = assembler::assemble(&reassembled_source, &ctx(0x1000)).unwrap();
    assert_eq!(reassembled.to_bytes(), bytes);
}

#[test]
fn branch_displacement_satisfies_target_equation() {
    let source = "*=$1000\nLOOP: LDX #$03\nDEX\nBNE LOOP\n";
    let program = assembler::assemble(source, &ctx(0x1000)).unwrap();
    let bytes = program.to_bytes();
    let branch_pc = 0x1003u16; // address of the BNE opcode byte
    let displacement = bytes[4] as i8;
    let target = (branch_pc as i32 + 2 + displacement as i32) as u16;
    assert_eq!(target, 0x1000);
}

#[test]
fn loads_set_zero_and_negative_from_the_loaded_value() {
    let mut cpu = cpu_running(0x1000, &[0xA9, 0x00]);
    cpu.step().unwrap();
    assert_eq!(cpu.a, 0);

    let mut cpu = cpu_running(0x1000, &[0xA9, 0x80]);
    cpu.step().unwrap();
    assert_eq!(cpu.a, 0x80);
}

#[test]
fn stack_pushes_and_pops_are_last_in_first_out() {
    // LDA #$11, PHA, LDA #$22, PHA, PLA, TAX, PLA: 7 instructions total.
    let mut cpu = cpu_running(0x1000, &[0xA9, 0x11, 0x48, 0xA9, 0x22, 0x48, 0x68, 0xAA, 0x68]);
    for _ in 0..7 {
        cpu.step().unwrap();
    }
    // pushes: 0x11, then 0x22; pops: first -> 0x22 (into X via TAX), second -> 0x11 (into A).
    assert_eq!(cpu.x, 0x22);
    assert_eq!(cpu.a, 0x11);
}

#[test]
fn memory_addresses_wrap_modulo_0x10000() {
    // u16 addressing is already modulo 0x10000 by construction; read16
    // crossing the top of the space is the one place the wrap is visible.
    let mut mem = Memory::new();
    mem.write(0xFFFF, 0x11);
    mem.write(0x0000, 0x22);
    assert_eq!(mem.read16(0xFFFF), 0x2211);
}

#[test]
fn scenario_a_immediate_load() {
    let program = assembler::assemble("LDA #$05\n", &ctx(0x1000)).unwrap();
    assert_eq!(program.to_bytes(), vec![0xA9, 0x05]);

    let mut cpu = cpu_running(0x1000, &program.to_bytes());
    let cycles = cpu.step().unwrap();
    assert_eq!(cpu.a, 0x05);
    assert_eq!(cpu.p & 0b0000_0010, 0); // Z clear
    assert_eq!(cpu.p & 0b1000_0000, 0); // N clear
    assert_eq!(cycles, 2);
    assert_eq!(cpu.pc, 0x1002);
}

#[test]
fn scenario_b_labelled_branch_emission_matches_the_literal_source() {
    // LOOP labels the LDX line itself here, exactly as in the core
    // specification's example; this is an infinite loop at runtime
    // (every taken branch re-runs LDX #$03), so only the byte emission
    // is asserted — see the next test for a looping source that halts.
    let source = "*=$1000\nLOOP: LDX #$03\nDEX\nBNE LOOP\n";
    let program = assembler::assemble(source, &ctx(0x1000)).unwrap();
    assert_eq!(program.to_bytes(), vec![0xA2, 0x03, 0xCA, 0xD0, 0xFB]);
}

#[test]
fn a_loop_labelling_its_decrement_runs_to_a_zeroed_x() {
    let source = "*=$1000\nLDX #$03\nLOOP: DEX\nBNE LOOP\n";
    let program = assembler::assemble(source, &ctx(0x1000)).unwrap();

    let mut cpu = cpu_running(0x1000, &program.to_bytes());
    // LDX #$03, then (DEX, BNE) x3: the third BNE is not taken once X hits 0.
    for _ in 0..1 + 2 * 3 {
        cpu.step().unwrap();
    }
    assert_eq!(cpu.x, 0);
    assert_ne!(cpu.p & 0b0000_0010, 0); // Z set
}

#[test]
fn scenario_c_absolute_store_and_load() {
    let source = "LDA #$7F\nSTA $2000\nLDA #$00\nLDA $2000\n";
    let program = assembler::assemble(source, &ctx(0x1000)).unwrap();
    assert_eq!(
        program.to_bytes(),
        vec![0xA9, 0x7F, 0x8D, 0x00, 0x20, 0xA9, 0x00, 0xAD, 0x00, 0x20]
    );

    let mut cpu = cpu_running(0x1000, &program.to_bytes());
    for _ in 0..4 {
        cpu.step().unwrap();
    }
    assert_eq!(cpu.a, 0x7F);
    assert_eq!(cpu.memory.read(0x2000), 0x7F);
}

#[test]
fn scenario_d_data_directive_layout() {
    let source = ".BYTE $01, $02, $03\n.WORD $ABCD\n";
    let program = assembler::assemble(source, &ctx(0x0200)).unwrap();
    assert_eq!(program.to_bytes(), vec![0x01, 0x02, 0x03, 0xCD, 0xAB]);
    assert_eq!(program.lines.len(), 5);
    assert_eq!(program.lines[0].address, 0x0200);
    assert_eq!(program.lines[4].address, 0x0204);
}

#[test]
fn scenario_e_disassembly_of_jsr_and_rts() {
    let lines = disassembler::disassemble(&[0x20, 0x00, 0x10, 0x60], 0x0000).unwrap();
    assert_eq!(lines[0].text, "JSR $1000");
    assert_eq!(lines[1].text, "RTS");
}

#[test]
fn scenario_f_stx_immediate_is_an_illegal_addressing_mode() {
    let err = assembler::assemble("STX #$01\n", &ctx(0x1000)).unwrap_err();
    match err {
        crate::error::ToolchainError::IllegalAddressingMode { mnemonic, .. } => {
            assert_eq!(mnemonic, "STX");
        }
        other => panic!("expected IllegalAddressingMode, got {:?}", other),
    }
}

#[test]
fn adc_and_sbc_agree_with_the_canonical_overflow_formula() {
    // 80 + (-16) should not overflow (mixed-sign operands never overflow).
    let mut cpu = cpu_running(0x1000, &[0x69, 0xF0]); // ADC #$F0 (-16)
    cpu.a = 0x50; // +80
    cpu.step().unwrap();
    assert_eq!(cpu.p & 0b0100_0000, 0); // V clear

    // 127 + 1 does overflow (both positive, result negative).
    let mut cpu = cpu_running(0x1000, &[0x69, 0x01]);
    cpu.a = 0x7F;
    cpu.step().unwrap();
    assert_ne!(cpu.p & 0b0100_0000, 0); // V set
}

#[test]
fn is_page_cross_sensitive_matches_the_mnemonic_table_for_indexed_loads() {
    assert!(opcodes::is_page_cross_sensitive(opcodes::encode(Mnemonic::LDA, AddressingMode::Absx).unwrap()));
    assert!(!opcodes::is_page_cross_sensitive(opcodes::encode(Mnemonic::STA, AddressingMode::Absx).unwrap()));
}
