//! CPU emulation for the VOID-3 machine.
//!
//! This module implements the complete machine:
//! - 3^13 trits of flat memory with a memory-mapped framebuffer
//! - 27 fifty-trit registers T0-T26
//! - fixed 15-trit instructions with two operands

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod machine;
pub mod io;

pub use memory::{Memory, BOOT_ADDRESS, INSTRUCTION_WIDTH, MEMORY_SIZE};
pub use registers::{RegIndex, Registers, REGISTER_COUNT};
pub use decode::{Instruction, Opcode, OperandKind};
pub use machine::{CpuState, Machine};
pub use io::{InputPorts, Rect, Rgb};
