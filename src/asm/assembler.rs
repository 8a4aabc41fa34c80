//! Assembler for VOID-3 programs.
//!
//! Syntax, one instruction per line:
//! ```text
//! // Comment (`;` works too)
//! SET 0 5        // T0 = 5
//! set 1 3        // mnemonics are case-insensitive
//! ADD 0 1        // T0 += T1
//! loop:          // unknown words take no space
//! RECT           // missing operands are 0
//! HALT
//! ```
//!
//! The assembler writes straight into machine memory and never rejects its
//! input: unknown mnemonics are skipped, non-numeric operands read as 0 and
//! out-of-range operands lose their high trits.

use crate::cpu::decode::{self, Opcode};
use crate::cpu::memory::{Memory, INSTRUCTION_WIDTH};
use crate::ternary::codec::{clamp, Word, WORD_MODULUS};
use serde::{Serialize, Deserialize};

/// Markers that start a comment.
const COMMENT_MARKERS: [&str; 2] = ["//", ";"];

/// One parsed source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInstruction {
    pub opcode: Opcode,
    pub a1: Word,
    pub a2: Word,
}

/// Summary of one assembly run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyReport {
    /// Address of the first instruction.
    pub base: i64,
    /// Instructions written.
    pub instructions: usize,
    /// Non-empty lines that did not name an instruction.
    pub skipped: usize,
    /// Write cursor after the last instruction.
    pub end: i64,
}

/// Parse one line of source.
///
/// Returns `None` for blank lines, comments and lines whose first word is
/// not a known mnemonic.
pub fn parse_line(line: &str) -> Option<SourceInstruction> {
    let mut tokens = strip_comment(line).split_whitespace();
    let opcode = Opcode::from_mnemonic(tokens.next()?)?;
    let a1 = parse_operand(tokens.next());
    let a2 = parse_operand(tokens.next());
    Some(SourceInstruction { opcode, a1, a2 })
}

/// Parse a whole program without writing it anywhere.
pub fn assemble(source: &str) -> Vec<SourceInstruction> {
    source.lines().filter_map(parse_line).collect()
}

/// Assemble `source` into `mem`, starting at `base`.
pub fn assemble_into(mem: &mut Memory, source: &str, base: i64) -> AssemblyReport {
    let mut asm = Assembler::new(mem, base);
    for line in source.lines() {
        asm.process_line(line);
    }
    let report = asm.finish();
    log::debug!(
        "assembled {} instructions at {}..{} ({} lines skipped)",
        report.instructions,
        report.base,
        report.end,
        report.skipped
    );
    report
}

/// The assembler state.
struct Assembler<'m> {
    mem: &'m mut Memory,
    base: i64,
    /// Current write address.
    cursor: i64,
    instructions: usize,
    skipped: usize,
}

impl<'m> Assembler<'m> {
    fn new(mem: &'m mut Memory, base: i64) -> Self {
        Self {
            mem,
            base,
            cursor: base,
            instructions: 0,
            skipped: 0,
        }
    }

    fn process_line(&mut self, line: &str) {
        if strip_comment(line).trim().is_empty() {
            return;
        }
        match parse_line(line) {
            Some(instr) => self.emit(instr),
            None => self.skipped += 1,
        }
    }

    fn emit(&mut self, instr: SourceInstruction) {
        // Every recognized mnemonic has a canonical code.
        let code = instr.opcode.code().unwrap_or_default();
        decode::encode(self.mem, self.cursor, code, instr.a1, instr.a2);
        self.cursor += INSTRUCTION_WIDTH as i64;
        self.instructions += 1;
    }

    fn finish(self) -> AssemblyReport {
        AssemblyReport {
            base: self.base,
            instructions: self.instructions,
            skipped: self.skipped,
            end: self.cursor,
        }
    }
}

fn strip_comment(line: &str) -> &str {
    let cut = COMMENT_MARKERS
        .iter()
        .filter_map(|marker| line.find(marker))
        .min()
        .unwrap_or(line.len());
    &line[..cut]
}

/// Parse a signed decimal operand of any length.
///
/// Digits are folded modulo 3^50 as they are read, so literals wider than
/// `i128` keep the low trits every field width sees. Anything that is not
/// a decimal number reads as 0.
fn parse_operand(token: Option<&str>) -> Word {
    let Some(token) = token else {
        return 0;
    };
    let (negative, digits) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    let magnitude = digits
        .bytes()
        .fold(0, |acc: Word, b| (acc * 10 + Word::from(b - b'0')) % WORD_MODULUS);
    clamp(if negative { -magnitude } else { magnitude })
}
