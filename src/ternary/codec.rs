//! Fixed-length balanced ternary fields.
//!
//! Every number the machine stores lives in memory as a run of trits,
//! least significant first. [`decode`] and [`encode`] move values between
//! such runs and `i128`, and [`clamp`] folds arithmetic results back into the
//! 50-trit register range.
//!
//! Addresses are signed so that a wild program counter or stack pointer can
//! be handed straight to the codec: cells outside the slice read as zero and
//! writes to them are dropped.

use crate::ternary::Trit;

/// A register-resident integer. Always within `±WORD_MAX` after [`clamp`].
pub type Word = i128;

/// Number of trits in a register word.
pub const WORD_TRITS: usize = 50;

/// 3^50, the modulus of register arithmetic.
pub const WORD_MODULUS: Word = pow3(WORD_TRITS as u32);

/// Largest register value, (3^50 - 1) / 2.
pub const WORD_MAX: Word = WORD_MODULUS / 2;

/// Widest field the codec accepts; 3^80 still fits in an `i128`.
pub const MAX_FIELD_TRITS: usize = 80;

/// 3^exp as an `i128`.
pub const fn pow3(exp: u32) -> i128 {
    let mut result: i128 = 1;
    let mut i = 0;
    while i < exp {
        result *= 3;
        i += 1;
    }
    result
}

/// Largest magnitude representable in `length` balanced trits.
pub const fn field_max(length: usize) -> Word {
    pow3(length as u32) / 2
}

/// Read `length` trits starting at `addr` as a balanced ternary integer.
///
/// Cells past either end of `cells` count as zero.
pub fn decode(cells: &[Trit], addr: i64, length: usize) -> Word {
    debug_assert!(length <= MAX_FIELD_TRITS, "field of {} trits is too wide", length);
    let mut value: Word = 0;
    // Horner's rule from the most significant trit down.
    for i in (0..length).rev() {
        value = value * 3 + read_cell(cells, addr, i) as Word;
    }
    value
}

/// Write `value` into `length` trits starting at `addr`.
///
/// Values outside `±field_max(length)` lose their high digits; cells that
/// fall outside `cells` are skipped.
pub fn encode(cells: &mut [Trit], addr: i64, length: usize, value: Word) {
    let mut remaining = value;
    for i in 0..length {
        let digit = Trit::from_residue(remaining);
        if let Some(index) = cell_index(cells.len(), addr, i) {
            cells[index] = digit;
        }
        // Floor division plus a carry for the -1 digit; never forms value ± 1.
        remaining = remaining.div_euclid(3) + Word::from(digit == Trit::N);
    }
}

/// The `length`-trit expansion of `value`, least significant first.
pub fn digits(value: Word, length: usize) -> Vec<Trit> {
    let mut out = vec![Trit::O; length];
    encode(&mut out, 0, length, value);
    out
}

/// Fold `value` into the register range by wrapping modulo 3^50.
pub fn clamp(value: Word) -> Word {
    let reduced = value % WORD_MODULUS;
    if reduced > WORD_MAX {
        reduced - WORD_MODULUS
    } else if reduced < -WORD_MAX {
        reduced + WORD_MODULUS
    } else {
        reduced
    }
}

/// Render a field most significant trit first, e.g. `+0-` for 8.
pub fn format_trits(value: Word, length: usize) -> String {
    digits(value, length).iter().rev().map(|t| t.to_string()).collect()
}

#[inline]
fn cell_index(len: usize, addr: i64, offset: usize) -> Option<usize> {
    let index = addr.checked_add(offset as i64)?;
    usize::try_from(index).ok().filter(|&i| i < len)
}

#[inline]
fn read_cell(cells: &[Trit], addr: i64, offset: usize) -> i8 {
    cell_index(cells.len(), addr, offset)
        .map(|i| cells[i].to_i8())
        .unwrap_or(0)
}
