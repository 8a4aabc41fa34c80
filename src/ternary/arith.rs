//! Register arithmetic with 50-trit wraparound.
//!
//! Every result is folded back into the register range with [`clamp`], so
//! these functions define the machine's overflow behavior. Operands are
//! expected to already be in range, which keeps sums and differences well
//! inside `i128`; products need the split in [`mul`].

use crate::ternary::codec::{clamp, pow3, Word};
use crate::ternary::Trit;

/// 3^25, half the word width.
const HALF_WIDTH: Word = pow3(25);

/// Wrapping addition.
#[inline]
pub fn add(a: Word, b: Word) -> Word {
    clamp(a + b)
}

/// Wrapping subtraction.
#[inline]
pub fn sub(a: Word, b: Word) -> Word {
    clamp(a - b)
}

/// Negation. The register range is symmetric so this never wraps.
#[inline]
pub fn negate(a: Word) -> Word {
    clamp(-a)
}

/// Wrapping multiplication, exact modulo 3^50.
///
/// A full 50×50-trit product needs about 160 bits, so `b` is split at 3^25
/// and the high half is reduced before it is shifted back up.
pub fn mul(a: Word, b: Word) -> Word {
    let a = clamp(a);
    let b = clamp(b);
    let b_high = b / HALF_WIDTH;
    let b_low = b % HALF_WIDTH;

    let high = clamp(a * b_high);
    clamp(clamp(high * HALF_WIDTH) + clamp(a * b_low))
}

/// Truncating division. Division by zero yields zero instead of trapping.
#[inline]
pub fn div(a: Word, b: Word) -> Word {
    if b == 0 {
        0
    } else {
        clamp(a / b)
    }
}

/// Three-way comparison as a word in {-1, 0, 1}.
#[inline]
pub fn compare(a: Word, b: Word) -> Word {
    Trit::sign_of(a - b).to_i8() as Word
}
