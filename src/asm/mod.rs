//! Assembler and disassembler for VOID-3 programs.
//!
//! This module provides:
//! - A single-pass assembler (text → trits in machine memory)
//! - A disassembler (memory → readable text)
//! - A Trit-C compiler (statements → assembly text)

pub mod assembler;
pub mod disasm;
pub mod tritc;

pub use assembler::{assemble, assemble_into, parse_line, AssemblyReport, SourceInstruction};
pub use disasm::{disassemble, disassemble_at, disassemble_instruction};
pub use tritc::{compile, CompileError, CompileOutput};
