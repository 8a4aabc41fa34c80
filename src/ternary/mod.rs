//! Balanced ternary number system primitives.
//!
//! This module provides the numeral layer shared by the whole machine:
//! - [`Trit`] - A single balanced ternary digit (-1, 0, +1)
//! - [`codec`] - Fixed-length trit fields to and from integers
//! - [`arith`] - 50-trit wraparound register arithmetic

mod trit;
pub mod codec;
pub mod arith;

pub use trit::Trit;
pub use codec::{clamp, decode, encode, Word, WORD_MAX, WORD_TRITS};
