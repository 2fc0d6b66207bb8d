//! The composition root shared by the assembler, disassembler, and
//! simulator.
//!
//! The source this toolchain is modeled on has an Assembler/Disassembler/
//! Simulator hierarchy: a base class owns the open file handles, the
//! parsed source lines, the opcode table, and the program counter, and
//! each concrete tool inherits from it. Rust has no classical
//! inheritance, and forcing one in would mean the simulator carries
//! assembler-only fields (a symbol table) it never uses. Instead the
//! three components are independent values that each take a
//! `ToolchainContext` by reference: the handful of fields every one of
//! them reads (the starting program counter, whether output/input
//! includes an address counter column) live here once, and each
//! component owns the state that is actually its own (the assembler's
//! label table, the simulator's registers).
//!
//! The opcode table itself needs no handle: `crate::opcodes` is a set of
//! free functions over a module-static table, so "holding" it is just
//! calling into the module.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolchainContext {
    /// The program counter value a component starts at: the assembler's
    /// origin absent an explicit `.ORG`/`*=`, the disassembler's first
    /// address, or the simulator's initial PC.
    pub start_address: u16,

    /// Whether hex listings carry a leading 4-digit address column, on
    /// both the assembler's output and the disassembler's input.
    pub include_counter: bool,
}

impl ToolchainContext {
    pub fn new(start_address: u16, include_counter: bool) -> ToolchainContext {
        ToolchainContext {
            start_address,
            include_counter,
        }
    }
}

impl Default for ToolchainContext {
    fn default() -> ToolchainContext {
        ToolchainContext {
            start_address: 0,
            include_counter: false,
        }
    }
}
