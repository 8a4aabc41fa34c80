//! Disassembler for VOID-3 programs.
//!
//! Converts instructions in memory back to assembler syntax. Output always
//! reassembles to the same instruction, except for unassigned opcodes,
//! which render as `???`.

use crate::cpu::decode::{fetch, Instruction, Opcode, OperandKind};
use crate::cpu::memory::{Memory, INSTRUCTION_WIDTH};
use crate::ternary::codec::format_trits;

/// Disassemble a single decoded instruction to text.
pub fn disassemble_instruction(instr: &Instruction) -> String {
    let op = instr.opcode;
    if op == Opcode::Nop {
        return format!("??? {}", instr.code);
    }
    let name = op.mnemonic();
    if op.operand_kind() != OperandKind::None {
        format!("{} {} {}", name, instr.a1.index(), instr.a2)
    } else if op.uses_operand1() {
        format!("{} {}", name, instr.a1.index())
    } else {
        name.to_string()
    }
}

/// Disassemble the instruction stored at `addr`.
pub fn disassemble_at(mem: &Memory, addr: i64) -> String {
    disassemble_instruction(&fetch(mem, addr))
}

/// Disassemble `count` consecutive instructions starting at `base`.
pub fn disassemble(mem: &Memory, base: i64, count: usize) -> String {
    let mut output = String::new();
    output.push_str("// VOID-3 Disassembly\n");
    output.push_str("// -----------------\n\n");

    for i in 0..count {
        let addr = base + (i * INSTRUCTION_WIDTH) as i64;
        let raw = mem.read_field(addr, INSTRUCTION_WIDTH);
        let line = disassemble_at(mem, addr);
        output.push_str(&format!(
            "{:07}: {:<20} // {}\n",
            addr,
            line,
            format_trits(raw, INSTRUCTION_WIDTH)
        ));
    }

    output
}
