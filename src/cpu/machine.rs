//! The machine aggregate.
//!
//! A [`Machine`] owns everything a running program can observe: memory, the
//! register file, the program counter, the run state and the I/O ports. The
//! assembler, the loader and the host bridge all borrow it explicitly; there
//! is no global machine.

use std::collections::VecDeque;

use crate::cpu::decode::Instruction;
use crate::cpu::io::InputPorts;
use crate::cpu::memory::{Memory, BOOT_ADDRESS};
use crate::cpu::registers::Registers;
use crate::ternary::Word;
use serde::{Serialize, Deserialize};

/// How many OUT values are retained before the oldest are dropped.
pub const OUTPUT_CAPACITY: usize = 4096;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is executing instructions.
    Running,
    /// CPU executed HALT, or was stopped by the loader.
    Halted,
}

/// A complete VOID-3 machine.
#[derive(Clone, PartialEq, Eq)]
pub struct Machine {
    /// Main memory, including the framebuffer.
    pub mem: Memory,
    /// Register file T0-T26.
    pub regs: Registers,
    /// Address of the next instruction.
    pub pc: i64,
    /// Current execution state.
    pub state: CpuState,
    /// Pointer and keyboard state written by the host.
    pub input: InputPorts,
    /// Instruction count since the last reset.
    pub cycles: u64,
    pub(crate) output: VecDeque<Word>,
    pub(crate) last_instr: Option<Instruction>,
}

impl Machine {
    /// Create a machine with zeroed memory and registers, running at the
    /// boot address.
    pub fn new() -> Self {
        Self {
            mem: Memory::new(),
            regs: Registers::new(),
            pc: BOOT_ADDRESS as i64,
            state: CpuState::Running,
            input: InputPorts::new(),
            cycles: 0,
            output: VecDeque::new(),
            last_instr: None,
        }
    }

    /// Zero the registers and point the CPU back at the boot address.
    ///
    /// Memory is left alone; the run state is not changed.
    pub fn reset_cpu(&mut self) {
        self.regs.reset();
        self.pc = BOOT_ADDRESS as i64;
        self.cycles = 0;
        self.output.clear();
        self.last_instr = None;
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// Stop the CPU.
    pub fn halt(&mut self) {
        self.state = CpuState::Halted;
    }

    /// Let the CPU continue from the current program counter.
    pub fn resume(&mut self) {
        self.state = CpuState::Running;
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Values emitted by OUT, oldest first.
    pub fn output(&self) -> impl Iterator<Item = Word> + '_ {
        self.output.iter().copied()
    }

    /// Take and clear the OUT values.
    pub fn drain_output(&mut self) -> Vec<Word> {
        self.output.drain(..).collect()
    }

    pub(crate) fn emit(&mut self, value: Word) {
        if self.output.len() == OUTPUT_CAPACITY {
            self.output.pop_front();
        }
        self.output.push_back(value);
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("state", &self.state)
            .field("pc", &self.pc)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}
