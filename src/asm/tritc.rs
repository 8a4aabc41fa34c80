//! Trit-C: a one-statement-per-line language compiled to VOID-3 assembly.
//!
//! ```text
//! n = 3               // SET: true, false, null or a number
//! step = 1
//! loop:
//! n = n - step        // CPY + SUB (also +, *, /)
//! if (n != 0) goto loop
//! color(13, 0, -13)   // T0-T2
//! pos(10, 20)         // T3-T4
//! size(5, 5)          // T5-T6
//! RECT
//! out(n)
//! halt
//! ```
//!
//! Variables live in registers, handed out from T7 in order of first use.
//! T25 (stack pointer) and T26 (scratch) are never allocated. Lines that
//! are not statements are skipped, as the assembler skips unknown lines.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpu::decode::{Opcode, OPERAND2_TRITS};
use crate::cpu::memory::{BOOT_ADDRESS, INSTRUCTION_WIDTH};
use crate::ternary::codec::field_max;
use crate::ternary::Word;

/// First register given to a variable.
pub const FIRST_VARIABLE: Word = 7;

/// Last register given to a variable.
pub const LAST_VARIABLE: Word = 24;

/// Scratch register for comparisons and aliased arithmetic.
const SCRATCH: Word = 26;

/// Errors that stop compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("line {line}: no register left for variable `{name}`")]
    OutOfRegisters { line: usize, name: String },

    #[error("line {line}: unknown label `{label}`")]
    UnknownLabel { line: usize, label: String },

    #[error("line {line}: label `{label}` defined twice")]
    DuplicateLabel { line: usize, label: String },

    #[error("line {line}: jump target {address} is beyond the reach of a 6-trit operand")]
    TargetOutOfReach { line: usize, address: Word },
}

/// Result of a successful compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOutput {
    /// Assembly text, one instruction per line.
    pub assembly: String,
    /// Variables and their registers, in allocation order.
    pub variables: Vec<(String, Word)>,
    /// Instructions emitted.
    pub instructions: usize,
    /// Non-empty lines that were not statements.
    pub skipped: usize,
}

/// Compile Trit-C source to assembly for a program loaded at the boot
/// address.
pub fn compile(source: &str) -> Result<CompileOutput, CompileError> {
    let mut compiler = Compiler::default();
    for (index, raw) in source.lines().enumerate() {
        let text = strip_line(raw);
        if !text.is_empty() {
            compiler.statement(index + 1, text)?;
        }
    }
    let output = compiler.finish()?;
    log::debug!(
        "compiled {} instructions, {} variables ({} lines skipped)",
        output.instructions,
        output.variables.len(),
        output.skipped
    );
    Ok(output)
}

#[derive(Debug, Clone)]
enum Target {
    Value(Word),
    Label(String),
    /// Instruction `n` slots after this one.
    Ahead(usize),
}

#[derive(Debug)]
struct Emit {
    opcode: Opcode,
    a1: Word,
    a2: Target,
    line: usize,
    note: Option<String>,
}

enum Operand {
    Literal(Word),
    Variable(String),
}

#[derive(Default)]
struct Compiler {
    emits: Vec<Emit>,
    labels: HashMap<String, usize>,
    variables: Vec<String>,
    skipped: usize,
}

impl Compiler {
    fn statement(&mut self, line: usize, text: &str) -> Result<(), CompileError> {
        let start = self.emits.len();
        if self.lower(line, text)? {
            if let Some(first) = self.emits.get_mut(start) {
                first.note = Some(text.to_string());
            }
        } else {
            log::debug!("line {}: skipped {:?}", line, text);
            self.skipped += 1;
        }
        Ok(())
    }

    /// Lower one statement. `Ok(false)` means the line is not a statement.
    fn lower(&mut self, line: usize, text: &str) -> Result<bool, CompileError> {
        if let Some(label) = text.strip_suffix(':') {
            let label = label.trim();
            if !is_identifier(label) {
                return Ok(false);
            }
            if self.labels.insert(label.to_string(), self.emits.len()).is_some() {
                return Err(CompileError::DuplicateLabel {
                    line,
                    label: label.to_string(),
                });
            }
            return Ok(true);
        }

        match text.to_ascii_lowercase().as_str() {
            "halt" | "halt()" => {
                self.emit(line, Opcode::Halt, 0, Target::Value(0));
                return Ok(true);
            }
            "rect" | "rect()" => {
                self.emit(line, Opcode::Rect, 0, Target::Value(0));
                return Ok(true);
            }
            _ => {}
        }

        if let Some(rest) = strip_keyword(text, "if") {
            return self.lower_if(line, rest);
        }
        if let Some(label) = strip_keyword(text, "goto") {
            let label = label.trim();
            if !is_identifier(label) {
                return Ok(false);
            }
            self.emit(line, Opcode::Jmp, 0, Target::Label(label.to_string()));
            return Ok(true);
        }
        if text.starts_with('*') {
            log::warn!("line {}: VOID-3 has no store instruction, skipping {:?}", line, text);
            return Ok(false);
        }
        if let Some((name, args)) = parse_call(text) {
            return self.lower_call(line, name, &args);
        }
        if let Some((lhs, rhs)) = text.split_once('=') {
            return self.lower_assign(line, lhs.trim(), rhs.trim());
        }
        Ok(false)
    }

    /// `if (x == v) goto L` and `if (x != v) goto L`.
    ///
    /// T26 gets `sign(v - x)`, which is zero exactly when the two are equal.
    fn lower_if(&mut self, line: usize, rest: &str) -> Result<bool, CompileError> {
        let Some(inner) = rest.trim().strip_prefix('(') else {
            return Ok(false);
        };
        let Some((cond, tail)) = inner.split_once(')') else {
            return Ok(false);
        };
        let Some(label) = strip_keyword(tail.trim(), "goto").map(str::trim) else {
            return Ok(false);
        };
        let (lhs, rhs, equal) = if let Some((l, r)) = cond.split_once("==") {
            (l.trim(), r.trim(), true)
        } else if let Some((l, r)) = cond.split_once("!=") {
            (l.trim(), r.trim(), false)
        } else {
            return Ok(false);
        };
        if !is_identifier(lhs) || !is_identifier(label) {
            return Ok(false);
        }
        let Some(rhs) = parse_operand(rhs) else {
            return Ok(false);
        };

        let rx = self.register(line, lhs)?;
        self.load(line, SCRATCH, rhs)?;
        self.emit(line, Opcode::Tri, SCRATCH, Target::Value(rx));

        let target = Target::Label(label.to_string());
        if equal {
            self.emit(line, Opcode::Brn, SCRATCH, Target::Ahead(3));
            self.emit(line, Opcode::Brp, SCRATCH, Target::Ahead(2));
            self.emit(line, Opcode::Jmp, 0, target);
        } else {
            self.emit(line, Opcode::Brn, SCRATCH, target.clone());
            self.emit(line, Opcode::Brp, SCRATCH, target);
        }
        Ok(true)
    }

    fn lower_call(&mut self, line: usize, name: &str, args: &[&str]) -> Result<bool, CompileError> {
        let registers: &[Word] = match (name, args.len()) {
            ("color", 3) => &[0, 1, 2],
            ("pos", 2) => &[3, 4],
            ("size", 2) => &[5, 6],
            ("out", 1) => &[SCRATCH],
            _ => return Ok(false),
        };
        let Some(operands) = args.iter().map(|a| parse_operand(a)).collect::<Option<Vec<_>>>() else {
            return Ok(false);
        };

        if name == "out" {
            let reg = match operands.into_iter().next() {
                Some(Operand::Variable(var)) => self.register(line, &var)?,
                Some(literal) => {
                    self.load(line, SCRATCH, literal)?;
                    SCRATCH
                }
                None => return Ok(false),
            };
            self.emit(line, Opcode::Out, reg, Target::Value(0));
            return Ok(true);
        }

        for (&reg, operand) in registers.iter().zip(operands) {
            self.load(line, reg, operand)?;
        }
        Ok(true)
    }

    fn lower_assign(&mut self, line: usize, lhs: &str, rhs: &str) -> Result<bool, CompileError> {
        if !is_identifier(lhs) {
            return Ok(false);
        }
        if let Some(operand) = parse_operand(rhs) {
            let rd = self.register(line, lhs)?;
            self.load(line, rd, operand)?;
            return Ok(true);
        }
        let Some((b, opcode, c)) = split_binary(rhs) else {
            return Ok(false);
        };

        let rd = self.register(line, lhs)?;
        let rb = self.register(line, b)?;
        let rc = self.register(line, c)?;
        if rd == rc && rd != rb {
            // Copying b into d first would clobber c.
            self.emit(line, Opcode::Cpy, SCRATCH, Target::Value(rb));
            self.emit(line, opcode, SCRATCH, Target::Value(rc));
            self.emit(line, Opcode::Cpy, rd, Target::Value(SCRATCH));
        } else {
            if rd != rb {
                self.emit(line, Opcode::Cpy, rd, Target::Value(rb));
            }
            self.emit(line, opcode, rd, Target::Value(rc));
        }
        Ok(true)
    }

    /// Put an operand into `reg`.
    fn load(&mut self, line: usize, reg: Word, operand: Operand) -> Result<(), CompileError> {
        match operand {
            Operand::Literal(value) => self.emit(line, Opcode::Set, reg, Target::Value(value)),
            Operand::Variable(name) => {
                let src = self.register(line, &name)?;
                if src != reg {
                    self.emit(line, Opcode::Cpy, reg, Target::Value(src));
                }
            }
        }
        Ok(())
    }

    fn register(&mut self, line: usize, name: &str) -> Result<Word, CompileError> {
        if let Some(index) = self.variables.iter().position(|v| v == name) {
            return Ok(FIRST_VARIABLE + index as Word);
        }
        let reg = FIRST_VARIABLE + self.variables.len() as Word;
        if reg > LAST_VARIABLE {
            return Err(CompileError::OutOfRegisters {
                line,
                name: name.to_string(),
            });
        }
        self.variables.push(name.to_string());
        Ok(reg)
    }

    fn emit(&mut self, line: usize, opcode: Opcode, a1: Word, a2: Target) {
        self.emits.push(Emit {
            opcode,
            a1,
            a2,
            line,
            note: None,
        });
    }

    fn finish(self) -> Result<CompileOutput, CompileError> {
        let mut assembly = String::from("// Trit-C compiler output\n");
        for (index, emit) in self.emits.iter().enumerate() {
            let a2 = match &emit.a2 {
                Target::Value(value) => *value,
                Target::Label(label) => {
                    let slot = self.labels.get(label).ok_or_else(|| CompileError::UnknownLabel {
                        line: emit.line,
                        label: label.clone(),
                    })?;
                    slot_address(emit.line, *slot)?
                }
                Target::Ahead(n) => slot_address(emit.line, index + n)?,
            };
            let text = format!("{} {} {}", emit.opcode.mnemonic(), emit.a1, a2);
            match &emit.note {
                Some(note) => assembly.push_str(&format!("{:<20} // {}\n", text, note)),
                None => assembly.push_str(&format!("{}\n", text)),
            }
        }

        let variables = self
            .variables
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name, FIRST_VARIABLE + i as Word))
            .collect();
        Ok(CompileOutput {
            assembly,
            variables,
            instructions: self.emits.len(),
            skipped: self.skipped,
        })
    }
}

/// Address of instruction slot `slot`, if a jump operand can hold it.
fn slot_address(line: usize, slot: usize) -> Result<Word, CompileError> {
    let address = (BOOT_ADDRESS + slot * INSTRUCTION_WIDTH) as Word;
    if address > field_max(OPERAND2_TRITS) {
        return Err(CompileError::TargetOutOfReach { line, address });
    }
    Ok(address)
}

fn strip_line(raw: &str) -> &str {
    let code = raw.split("//").next().unwrap_or_default();
    code.trim().trim_end_matches(';').trim_end()
}

/// `text` without a leading keyword, if the keyword is a whole word.
fn strip_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(keyword)?;
    if rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
        None
    } else {
        Some(rest)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_well
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !matches!(name, "true" | "false" | "null" | "if" | "goto" | "halt")
}

fn parse_operand(text: &str) -> Option<Operand> {
    match text {
        "true" => Some(Operand::Literal(1)),
        "false" => Some(Operand::Literal(-1)),
        "null" => Some(Operand::Literal(0)),
        _ if is_identifier(text) => Some(Operand::Variable(text.to_string())),
        _ => text.parse::<Word>().ok().map(Operand::Literal),
    }
}

/// `name(a, b, ...)`
fn parse_call(text: &str) -> Option<(&str, Vec<&str>)> {
    let (name, rest) = text.split_once('(')?;
    let args = rest.trim_end().strip_suffix(')')?;
    let name = name.trim();
    if !is_identifier(name) {
        return None;
    }
    let args = if args.trim().is_empty() {
        Vec::new()
    } else {
        args.split(',').map(str::trim).collect()
    };
    Some((name, args))
}

/// `b op c` with two variables.
fn split_binary(rhs: &str) -> Option<(&str, Opcode, &str)> {
    rhs.char_indices().skip(1).find_map(|(i, ch)| {
        let opcode = match ch {
            '+' => Opcode::Add,
            '-' => Opcode::Sub,
            '*' => Opcode::Mul,
            '/' => Opcode::Div,
            _ => return None,
        };
        let (b, c) = (rhs[..i].trim(), rhs[i + 1..].trim());
        (is_identifier(b) && is_identifier(c)).then_some((b, opcode, c))
    })
}
