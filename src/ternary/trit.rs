//! Single balanced ternary digit (trit).
//!
//! A trit holds one of three values: -1, 0, or +1. It is the atomic cell of
//! VOID-3 memory, so the enum is `repr(i8)` with the digit value as its
//! discriminant and occupies one byte.

use std::fmt;
use serde::{Serialize, Deserialize};

/// A single balanced ternary digit.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(i8)]
pub enum Trit {
    /// Negative (-1)
    N = -1,
    /// Zero (0)
    #[default]
    O = 0,
    /// Positive (+1)
    P = 1,
}

impl Trit {
    /// All possible trit values in order: N, O, P
    pub const ALL: [Trit; 3] = [Trit::N, Trit::O, Trit::P];

    /// Create a trit from an integer value, or `None` if it is not a digit.
    #[inline]
    pub const fn from_i8(value: i8) -> Option<Self> {
        match value {
            -1 => Some(Trit::N),
            0 => Some(Trit::O),
            1 => Some(Trit::P),
            _ => None,
        }
    }

    /// Map an arbitrary integer onto the digit congruent to it modulo 3.
    ///
    /// This is the balanced digit extraction used by the encoder,
    /// `((value + 1) mod 3) - 1`, computed from `value mod 3` directly so
    /// it holds for every `i128` including the extremes.
    #[inline]
    pub const fn from_residue(value: i128) -> Self {
        match value.rem_euclid(3) {
            0 => Trit::O,
            1 => Trit::P,
            _ => Trit::N,
        }
    }

    /// Convert to integer value.
    #[inline]
    pub const fn to_i8(self) -> i8 {
        self as i8
    }

    /// Negate the trit (flip N ↔ P, O stays O).
    #[inline]
    pub const fn neg(self) -> Self {
        match self {
            Trit::N => Trit::P,
            Trit::O => Trit::O,
            Trit::P => Trit::N,
        }
    }

    /// Sign of an integer as a trit.
    #[inline]
    pub const fn sign_of(value: i128) -> Self {
        if value < 0 {
            Trit::N
        } else if value > 0 {
            Trit::P
        } else {
            Trit::O
        }
    }

    /// Returns true if this trit is zero.
    #[inline]
    pub const fn is_zero(self) -> bool {
        matches!(self, Trit::O)
    }
}

impl fmt::Debug for Trit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trit::N => write!(f, "N"),
            Trit::O => write!(f, "O"),
            Trit::P => write!(f, "P"),
        }
    }
}

impl fmt::Display for Trit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trit::N => write!(f, "-"),
            Trit::O => write!(f, "0"),
            Trit::P => write!(f, "+"),
        }
    }
}

impl std::ops::Neg for Trit {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Trit::neg(self)
    }
}

impl TryFrom<i8> for Trit {
    type Error = i8;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Trit::from_i8(value).ok_or(value)
    }
}

impl From<Trit> for i8 {
    fn from(trit: Trit) -> Self {
        trit.to_i8()
    }
}
