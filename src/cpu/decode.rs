//! Instruction decoder for VOID-3.
//!
//! Every instruction is a 15-trit record, least significant field first:
//!
//! ```text
//! | opcode: 4 trits | operand-1: 5 trits | operand-2: 6 trits |
//! ```
//!
//! Operand-1 always names a register (wrapped modulo 27). What operand-2
//! means is a property of the opcode alone, see [`Opcode::operand_kind`].

use crate::cpu::memory::{Memory, INSTRUCTION_WIDTH};
use crate::cpu::registers::RegIndex;
use crate::ternary::Word;
use serde::{Serialize, Deserialize};

/// Width of the opcode field.
pub const OPCODE_TRITS: usize = 4;
/// Width of operand-1.
pub const OPERAND1_TRITS: usize = 5;
/// Width of operand-2.
pub const OPERAND2_TRITS: usize = 6;

/// Decoded operation.
///
/// Every value of the 4-trit opcode field (-40..=40) maps to exactly one
/// variant; codes without an operation map to [`Opcode::Nop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// Stop the CPU.
    Halt,
    /// `reg[a1] += reg[a2]`
    Add,
    /// `reg[a1] -= reg[a2]`
    Sub,
    /// `reg[a1] *= reg[a2]`
    Mul,
    /// `reg[a1] /= reg[a2]`, zero on division by zero
    Div,
    /// `reg[a1] = -reg[a1]`
    Neg,
    /// `reg[a1] = a2`
    Set,
    /// `reg[a1] = reg[a2]`
    Cpy,
    /// `PC = a2`
    Jmp,
    /// Branch to a2 if `reg[a1] < 0`
    Brn,
    /// Branch to a2 if `reg[a1] > 0`
    Brp,
    /// `reg[a1] = sign(reg[a1] - reg[a2])`
    Tri,
    /// Push the return address and jump to a2.
    Call,
    /// Pop the return address into PC.
    Ret,
    /// Fill a rectangle described by T0-T6.
    Rect,
    /// Read mouse X, Y or click state selected by a2.
    PollMouse,
    /// Read whether key a2 is held.
    PollKey,
    /// Emit `reg[a1]` on the output channel.
    Out,
    /// Unassigned opcode.
    Nop,
}

/// How operand-2 is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandKind {
    /// Operand-2 is ignored.
    None,
    /// Operand-2 is a literal value.
    Immediate,
    /// Operand-2 names a register (wrapped modulo 27).
    Register,
    /// Operand-2 is an absolute memory address.
    Address,
    /// Operand-2 selects one of several input fields.
    Selector,
}

impl Opcode {
    /// All assigned operations with their canonical codes and mnemonics.
    pub const TABLE: [(Opcode, Word, &'static str); 18] = [
        (Opcode::Halt, 0, "HALT"),
        (Opcode::Add, 1, "ADD"),
        (Opcode::Sub, 2, "SUB"),
        (Opcode::Mul, 3, "MUL"),
        (Opcode::Div, 4, "DIV"),
        (Opcode::Neg, 6, "NEG"),
        (Opcode::Set, 11, "SET"),
        (Opcode::Cpy, 12, "CPY"),
        (Opcode::Jmp, 20, "JMP"),
        (Opcode::Brn, 21, "BRN"),
        (Opcode::Brp, 22, "BRP"),
        (Opcode::Tri, 23, "TRI"),
        (Opcode::Call, 24, "CALL"),
        (Opcode::Ret, 25, "RET"),
        (Opcode::Rect, 30, "RECT"),
        (Opcode::PollMouse, 31, "POLL_MOUSE"),
        (Opcode::PollKey, 32, "POLL_KEY"),
        (Opcode::Out, 40, "OUT"),
    ];

    /// Map a raw opcode field onto an operation.
    pub fn from_code(code: Word) -> Self {
        match code {
            0 | 45 => Opcode::Halt,
            1 => Opcode::Add,
            2 => Opcode::Sub,
            3 => Opcode::Mul,
            4 => Opcode::Div,
            6 => Opcode::Neg,
            11 => Opcode::Set,
            12 => Opcode::Cpy,
            20 => Opcode::Jmp,
            21 => Opcode::Brn,
            22 => Opcode::Brp,
            23 => Opcode::Tri,
            24 => Opcode::Call,
            25 => Opcode::Ret,
            30 => Opcode::Rect,
            31 => Opcode::PollMouse,
            32 => Opcode::PollKey,
            40 => Opcode::Out,
            _ => Opcode::Nop,
        }
    }

    /// Canonical code written by the assembler. `Nop` has none.
    pub fn code(self) -> Option<Word> {
        Self::TABLE
            .iter()
            .find(|(op, _, _)| *op == self)
            .map(|(_, code, _)| *code)
    }

    /// Canonical mnemonic.
    pub fn mnemonic(self) -> &'static str {
        Self::TABLE
            .iter()
            .find(|(op, _, _)| *op == self)
            .map(|(_, _, name)| *name)
            .unwrap_or("NOP")
    }

    /// Look up a mnemonic, ignoring case. Accepts the legacy aliases
    /// `HLT`, `SLP`, `WAK` and `CAL`.
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        let canonical = match upper.as_str() {
            "HLT" | "SLP" => "HALT",
            "WAK" => "SET",
            "CAL" => "CALL",
            other => other,
        };
        Self::TABLE
            .iter()
            .find(|(_, _, name)| *name == canonical)
            .map(|(op, _, _)| *op)
    }

    /// Static meaning of operand-2 for this operation.
    pub const fn operand_kind(self) -> OperandKind {
        match self {
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Cpy | Opcode::Tri => {
                OperandKind::Register
            }
            Opcode::Set | Opcode::PollKey => OperandKind::Immediate,
            Opcode::Jmp | Opcode::Brn | Opcode::Brp | Opcode::Call => OperandKind::Address,
            Opcode::PollMouse => OperandKind::Selector,
            Opcode::Halt | Opcode::Neg | Opcode::Ret | Opcode::Rect | Opcode::Out | Opcode::Nop => {
                OperandKind::None
            }
        }
    }

    /// Whether operand-1 is meaningful for this operation.
    pub const fn uses_operand1(self) -> bool {
        !matches!(
            self,
            Opcode::Halt | Opcode::Jmp | Opcode::Call | Opcode::Ret | Opcode::Rect | Opcode::Nop
        )
    }
}

/// A decoded 15-trit instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Raw opcode field, kept so unassigned codes can be reported.
    pub code: Word,
    /// Operation selected by `code`.
    pub opcode: Opcode,
    /// Operand-1, already wrapped onto a register.
    pub a1: RegIndex,
    /// Operand-2 as decoded; interpretation depends on `opcode`.
    pub a2: Word,
}

impl Instruction {
    /// Build an instruction from raw field values.
    pub fn new(code: Word, a1: Word, a2: Word) -> Self {
        Self {
            code,
            opcode: Opcode::from_code(code),
            a1: RegIndex::wrap(a1),
            a2,
        }
    }

    /// Operand-2 as a register index.
    #[inline]
    pub fn a2_reg(&self) -> RegIndex {
        RegIndex::wrap(self.a2)
    }
}

/// Fetch and decode the instruction at `addr`.
pub fn fetch(mem: &Memory, addr: i64) -> Instruction {
    let code = mem.read_field(addr, OPCODE_TRITS);
    let a1 = mem.read_field(addr + OPCODE_TRITS as i64, OPERAND1_TRITS);
    let a2 = mem.read_field(addr + (OPCODE_TRITS + OPERAND1_TRITS) as i64, OPERAND2_TRITS);
    Instruction::new(code, a1, a2)
}

/// Write the raw fields of one instruction at `addr`.
///
/// Field values outside their widths are truncated, never rejected.
pub fn encode(mem: &mut Memory, addr: i64, code: Word, a1: Word, a2: Word) {
    mem.write_field(addr, OPCODE_TRITS, code);
    mem.write_field(addr + OPCODE_TRITS as i64, OPERAND1_TRITS, a1);
    mem.write_field(addr + (OPCODE_TRITS + OPERAND1_TRITS) as i64, OPERAND2_TRITS, a2);
}

const _: () = assert!(OPCODE_TRITS + OPERAND1_TRITS + OPERAND2_TRITS == INSTRUCTION_WIDTH);
