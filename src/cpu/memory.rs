//! VOID-3 memory subsystem.
//!
//! Memory is one flat run of 3^13 trits. Programs are loaded at address 0,
//! where the 6-trit jump operand can reach them, the framebuffer follows the
//! program region, and the call stack grows down from the top.
//!
//! ```text
//! 0             531441         1062882                 1594323
//! | program region | framebuffer | free ... stack ↓ |
//! ```

use crate::ternary::{codec, Trit, Word};

/// Total number of trit cells.
pub const MEMORY_SIZE: usize = 1_594_323;

/// Where programs are assembled and where the CPU starts.
pub const BOOT_ADDRESS: usize = 0;

/// Length of the region reserved for program images.
pub const PROGRAM_REGION_LEN: usize = 531_441;

/// Trits per instruction.
pub const INSTRUCTION_WIDTH: usize = 15;

/// Address of the first stack frame; frames are pushed at descending addresses.
pub const STACK_BASE: usize = MEMORY_SIZE - INSTRUCTION_WIDTH;

/// Flat trit-addressed memory.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<Trit>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![Trit::O; MEMORY_SIZE],
        }
    }

    /// Read a single trit. Addresses outside memory read as zero.
    #[inline]
    pub fn read(&self, addr: i64) -> Trit {
        usize::try_from(addr)
            .ok()
            .and_then(|i| self.cells.get(i).copied())
            .unwrap_or(Trit::O)
    }

    /// Write a single trit. Writes outside memory are dropped.
    #[inline]
    pub fn write(&mut self, addr: i64, trit: Trit) {
        if let Some(cell) = usize::try_from(addr).ok().and_then(|i| self.cells.get_mut(i)) {
            *cell = trit;
        }
    }

    /// Decode a `length`-trit field at `addr`.
    #[inline]
    pub fn read_field(&self, addr: i64, length: usize) -> Word {
        codec::decode(&self.cells, addr, length)
    }

    /// Encode `value` into a `length`-trit field at `addr`.
    #[inline]
    pub fn write_field(&mut self, addr: i64, length: usize, value: Word) {
        codec::encode(&mut self.cells, addr, length, value)
    }

    /// Zero the cells in `range`, clipped to memory.
    pub fn clear_range(&mut self, range: std::ops::Range<usize>) {
        let end = range.end.min(MEMORY_SIZE);
        let start = range.start.min(end);
        self.cells[start..end].fill(Trit::O);
    }

    /// Raw view of a span of cells, clipped to memory.
    pub fn slice(&self, start: usize, len: usize) -> &[Trit] {
        let start = start.min(MEMORY_SIZE);
        let end = start.saturating_add(len).min(MEMORY_SIZE);
        &self.cells[start..end]
    }

    /// Number of non-zero cells (for diagnostics).
    pub fn non_zero_count(&self) -> usize {
        self.cells.iter().filter(|t| !t.is_zero()).count()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("non_zero_cells", &self.non_zero_count())
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}
