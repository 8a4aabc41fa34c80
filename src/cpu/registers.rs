//! VOID-3 register file.
//!
//! 27 general purpose registers T0-T26, each a 50-trit word. Two slots are
//! reserved by convention:
//! - T25: stack pointer (offset below [`STACK_BASE`](crate::cpu::memory::STACK_BASE))
//! - T26: status / compare result
//!
//! T0-T6 double as the RECT argument block (R, G, B, X, Y, W, H).

use crate::ternary::{clamp, Word};
use serde::{Serialize, Deserialize};

/// Number of registers.
pub const REGISTER_COUNT: usize = 27;

/// Stack pointer register index.
pub const STACK_POINTER: usize = 25;

/// Status register index.
pub const STATUS: usize = 26;

/// A register index that is always in range.
///
/// Any decoded operand, however large or negative, wraps onto a slot with a
/// Euclidean remainder, so register selection can never fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegIndex(u8);

impl RegIndex {
    /// Wrap an arbitrary operand value onto a register slot.
    #[inline]
    pub fn wrap(value: Word) -> Self {
        Self(value.rem_euclid(REGISTER_COUNT as Word) as u8)
    }

    /// Slot number in 0..27.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for RegIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// The VOID-3 register file.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    slots: [Word; REGISTER_COUNT],
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self {
            slots: [0; REGISTER_COUNT],
        }
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        self.slots = [0; REGISTER_COUNT];
    }

    /// Read a register.
    #[inline]
    pub fn get(&self, reg: RegIndex) -> Word {
        self.slots[reg.index()]
    }

    /// Write a register, folding the value into the 50-trit range.
    #[inline]
    pub fn set(&mut self, reg: RegIndex, value: Word) {
        self.slots[reg.index()] = clamp(value);
    }

    /// Read a register by raw slot number, wrapping like an operand would.
    #[inline]
    pub fn read(&self, slot: usize) -> Word {
        self.slots[slot % REGISTER_COUNT]
    }

    /// Write a register by raw slot number, wrapping like an operand would.
    #[inline]
    pub fn write(&mut self, slot: usize, value: Word) {
        self.slots[slot % REGISTER_COUNT] = clamp(value);
    }

    /// Current stack pointer offset.
    #[inline]
    pub fn stack_pointer(&self) -> Word {
        self.slots[STACK_POINTER]
    }

    /// All slots in order.
    pub fn as_slice(&self) -> &[Word; REGISTER_COUNT] {
        &self.slots
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only show non-zero registers
        let mut map = f.debug_map();
        for (i, value) in self.slots.iter().enumerate().filter(|(_, v)| **v != 0) {
            map.entry(&format_args!("T{}", i), value);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ternary::WORD_MAX;

    #[test]
    fn test_index_wraparound() {
        assert_eq!(RegIndex::wrap(0).index(), 0);
        assert_eq!(RegIndex::wrap(26).index(), 26);
        assert_eq!(RegIndex::wrap(27).index(), 0);
        assert_eq!(RegIndex::wrap(121).index(), 13);
        assert_eq!(RegIndex::wrap(-1).index(), 26);
        assert_eq!(RegIndex::wrap(-121).index(), 14);
        assert_eq!(RegIndex::wrap(WORD_MAX).index(), (WORD_MAX % 27) as usize);
    }

    #[test]
    fn test_set_clamps() {
        let mut regs = Registers::new();
        regs.set(RegIndex::wrap(3), WORD_MAX + 1);
        assert_eq!(regs.read(3), -WORD_MAX);
    }

    #[test]
    fn test_reset() {
        let mut regs = Registers::new();
        regs.write(STACK_POINTER, -45);
        regs.write(STATUS, 1);
        assert_eq!(regs.stack_pointer(), -45);
        regs.reset();
        assert!(regs.as_slice().iter().all(|v| *v == 0));
    }

    #[test]
    fn test_debug_shows_non_zero_only() {
        let mut regs = Registers::new();
        regs.write(4, 9);
        assert_eq!(format!("{:?}", regs), "{T4: 9}");
    }
}
