//! # VOID-3 Emulator
//!
//! A balanced ternary fantasy console: 3^13 trits of flat memory, 27
//! fifty-trit registers, fixed 15-trit instructions and a memory-mapped
//! 243x243 framebuffer.
//!
//! The crate is split the way the machine is:
//! - [`ternary`]: trits, word codec and clamped arithmetic
//! - [`cpu`]: memory, registers, decoder, execution engine and I/O ports
//! - [`asm`]: line-oriented assembler, disassembler and Trit-C compiler
//! - [`loader`]: program launch, app registry and frame-paced sessions
//! - [`config`]: runtime settings for the host driver

pub mod ternary;
pub mod cpu;
pub mod asm;
pub mod loader;
pub mod config;

// Re-export commonly used types
pub use ternary::{Trit, Word};
pub use cpu::{CpuState, InputPorts, Instruction, Machine, Memory, Opcode, Registers};
pub use asm::{assemble, assemble_into, compile, disassemble};
pub use loader::{launch, AppBundle, AppRegistry, LoadError, Session};
pub use config::{ConfigError, EmulatorConfig};
