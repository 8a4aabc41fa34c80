//! CPU execution engine for VOID-3.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//! Nothing a program does can fault: division by zero yields zero, register
//! operands wrap, unassigned opcodes do nothing and off-screen pixels are
//! skipped. `step` therefore has no error path.

use crate::cpu::decode::{self, Instruction, Opcode};
use crate::cpu::io::{self, Rgb};
use crate::cpu::machine::Machine;
use crate::cpu::memory::{INSTRUCTION_WIDTH, STACK_BASE};
use crate::cpu::registers::STACK_POINTER;
use crate::ternary::{arith, Word};

const WIDTH: i64 = INSTRUCTION_WIDTH as i64;

/// Where execution continues after an instruction.
enum Flow {
    /// Fall through to the next instruction.
    Next,
    /// The instruction assigned the program counter.
    Jump(i64),
}

impl Machine {
    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or `None` if the CPU is
    /// halted, in which case nothing changes.
    pub fn step(&mut self) -> Option<Instruction> {
        if self.is_halted() {
            return None;
        }

        let pc = self.pc;
        let instr = decode::fetch(&self.mem, pc);
        log::trace!(
            "{:>7}: {:<10} {} {}",
            pc,
            instr.opcode.mnemonic(),
            instr.a1,
            instr.a2
        );

        self.pc = match self.execute(instr) {
            Flow::Next => pc + WIDTH,
            Flow::Jump(target) => target,
        };

        self.cycles += 1;
        self.last_instr = Some(instr);
        Some(instr)
    }

    /// Run at most `budget` instructions, stopping early on halt.
    ///
    /// Returns the number of instructions executed.
    pub fn run_burst(&mut self, budget: u64) -> u64 {
        let mut executed = 0;
        while executed < budget && self.step().is_some() {
            executed += 1;
        }
        executed
    }

    /// Execute a decoded instruction.
    fn execute(&mut self, instr: Instruction) -> Flow {
        let a1 = instr.a1;
        let lhs = self.regs.get(a1);
        let rhs = self.regs.get(instr.a2_reg());

        match instr.opcode {
            Opcode::Halt => {
                self.halt();
            }

            // ==================== Arithmetic ====================

            Opcode::Add => self.regs.set(a1, arith::add(lhs, rhs)),
            Opcode::Sub => self.regs.set(a1, arith::sub(lhs, rhs)),
            Opcode::Mul => self.regs.set(a1, arith::mul(lhs, rhs)),
            Opcode::Div => self.regs.set(a1, arith::div(lhs, rhs)),
            Opcode::Neg => self.regs.set(a1, arith::negate(lhs)),
            Opcode::Tri => self.regs.set(a1, arith::compare(lhs, rhs)),

            // ==================== Data Transfer ====================

            Opcode::Set => self.regs.set(a1, instr.a2),
            Opcode::Cpy => self.regs.set(a1, rhs),

            // ==================== Control Flow ====================

            Opcode::Jmp => return Flow::Jump(to_addr(instr.a2)),

            Opcode::Brn => {
                if lhs < 0 {
                    return Flow::Jump(to_addr(instr.a2));
                }
            }

            Opcode::Brp => {
                if lhs > 0 {
                    return Flow::Jump(to_addr(instr.a2));
                }
            }

            Opcode::Call => {
                let sp = self.regs.stack_pointer();
                let frame = to_addr(STACK_BASE as Word + sp);
                self.mem.write_field(frame, INSTRUCTION_WIDTH, (self.pc + WIDTH) as Word);
                self.regs.write(STACK_POINTER, sp - WIDTH as Word);
                return Flow::Jump(to_addr(instr.a2));
            }

            Opcode::Ret => {
                let sp = self.regs.stack_pointer() + WIDTH as Word;
                self.regs.write(STACK_POINTER, sp);
                let frame = to_addr(STACK_BASE as Word + sp);
                return Flow::Jump(to_addr(self.mem.read_field(frame, INSTRUCTION_WIDTH)));
            }

            // ==================== Hardware ====================

            Opcode::Rect => self.draw_rect(),

            Opcode::PollMouse => {
                let value = self.input.mouse_field(instr.a2);
                self.regs.set(a1, value);
            }

            Opcode::PollKey => {
                let value = self.input.key_field(instr.a2);
                self.regs.set(a1, value);
            }

            Opcode::Out => {
                log::info!("VOID_OUT [{}]: {}", a1, lhs);
                self.emit(lhs);
            }

            Opcode::Nop => {}
        }

        Flow::Next
    }

    /// RECT: T0-T2 color, T3-T4 origin, T5-T6 size.
    fn draw_rect(&mut self) {
        let r = &self.regs;
        let color = Rgb {
            r: r.read(0),
            g: r.read(1),
            b: r.read(2),
        };
        let (x, y, w, h) = (r.read(3), r.read(4), r.read(5), r.read(6));
        io::fill_rect(&mut self.mem, color, x, y, w, h);
    }
}

/// Narrow a word to a memory address. Anything beyond `i64` is far outside
/// memory either way.
#[inline]
fn to_addr(value: Word) -> i64 {
    value.clamp(i64::MIN as Word, i64::MAX as Word) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::encode;
    use crate::cpu::io::pixel;
    use crate::cpu::machine::CpuState;
    use crate::cpu::memory::BOOT_ADDRESS;
    use crate::cpu::registers::STATUS;
    use crate::ternary::WORD_MAX;

    fn op(opcode: Opcode) -> Word {
        opcode.code().unwrap()
    }

    /// Encode `(opcode, a1, a2)` triples at consecutive slots from the boot address.
    fn make_machine(program: &[(Opcode, Word, Word)]) -> Machine {
        let mut machine = Machine::new();
        for (i, (opcode, a1, a2)) in program.iter().enumerate() {
            let addr = BOOT_ADDRESS as i64 + i as i64 * WIDTH;
            encode(&mut machine.mem, addr, op(*opcode), *a1, *a2);
        }
        machine
    }

    #[test]
    fn test_cpu_halt() {
        let mut machine = make_machine(&[(Opcode::Halt, 0, 0)]);
        assert_eq!(machine.run_burst(100), 1);
        assert!(machine.is_halted());
        assert_eq!(machine.pc, WIDTH);
    }

    #[test]
    fn test_halted_step_is_noop() {
        let mut machine = make_machine(&[(Opcode::Set, 0, 5), (Opcode::Halt, 0, 0)]);
        machine.halt();
        let before = machine.clone();
        assert_eq!(machine.step(), None);
        assert_eq!(machine, before);
    }

    #[test]
    fn test_add_program() {
        let mut machine = make_machine(&[
            (Opcode::Set, 0, 5),
            (Opcode::Set, 1, 3),
            (Opcode::Add, 0, 1),
            (Opcode::Halt, 0, 0),
        ]);
        assert_eq!(machine.run_burst(100), 4);
        assert_eq!(machine.regs.read(0), 8);
    }

    #[test]
    fn test_arithmetic_ops() {
        let mut machine = make_machine(&[
            (Opcode::Set, 0, 20),
            (Opcode::Set, 1, 6),
            (Opcode::Cpy, 2, 0),
            (Opcode::Sub, 2, 1), // 14
            (Opcode::Cpy, 3, 0),
            (Opcode::Mul, 3, 1), // 120
            (Opcode::Cpy, 4, 0),
            (Opcode::Div, 4, 1), // 3
            (Opcode::Cpy, 5, 1),
            (Opcode::Neg, 5, 0), // -6
            (Opcode::Halt, 0, 0),
        ]);
        machine.run_burst(100);
        assert_eq!(machine.regs.read(2), 14);
        assert_eq!(machine.regs.read(3), 120);
        assert_eq!(machine.regs.read(4), 3);
        assert_eq!(machine.regs.read(5), -6);
    }

    #[test]
    fn test_division_by_zero_yields_zero() {
        let mut machine = make_machine(&[
            (Opcode::Set, 0, 9),
            (Opcode::Set, 1, 0),
            (Opcode::Div, 0, 1),
            (Opcode::Halt, 0, 0),
        ]);
        assert_eq!(machine.run_burst(100), 4);
        assert_eq!(machine.regs.read(0), 0);
        assert_eq!(machine.state, CpuState::Halted);
    }

    #[test]
    fn test_multiply_wraps() {
        let mut machine = Machine::new();
        machine.regs.write(0, WORD_MAX);
        machine.regs.write(1, 2);
        encode(&mut machine.mem, 0, op(Opcode::Mul), 0, 1);
        machine.step();
        assert_eq!(machine.regs.read(0), -1);
    }

    #[test]
    fn test_register_operands_wrap() {
        // a1 = 27 + 4 wraps to T4, a2 = -1 wraps to T26.
        let mut machine = make_machine(&[(Opcode::Set, 31, 7), (Opcode::Cpy, 26, 4)]);
        machine.run_burst(2);
        assert_eq!(machine.regs.read(4), 7);
        assert_eq!(machine.regs.read(26), 7);
        let mut machine = make_machine(&[(Opcode::Set, 26, 3), (Opcode::Cpy, 0, -1)]);
        machine.run_burst(2);
        assert_eq!(machine.regs.read(0), 3);
    }

    #[test]
    fn test_jump_is_absolute() {
        let mut machine = Machine::new();
        encode(&mut machine.mem, 0, op(Opcode::Halt), 0, 0);
        encode(&mut machine.mem, 15, op(Opcode::Jmp), 0, 0);
        machine.pc = 15;
        machine.step();
        assert_eq!(machine.pc, 0);
        assert!(machine.is_running());
        machine.step();
        assert!(machine.is_halted());
    }

    #[test]
    fn test_conditional_branches() {
        // T0 = -1: BRN taken, BRP not taken.
        let mut machine = make_machine(&[
            (Opcode::Set, 0, -1),
            (Opcode::Brp, 0, 60),
            (Opcode::Brn, 0, 75),
            (Opcode::Halt, 0, 0),
            (Opcode::Set, 1, 1), // 60: wrong target
            (Opcode::Set, 2, 1), // 75: right target
            (Opcode::Halt, 0, 0),
        ]);
        machine.run_burst(100);
        assert_eq!(machine.regs.read(1), 0);
        assert_eq!(machine.regs.read(2), 1);
    }

    #[test]
    fn test_countdown_loop() {
        // T0 counts 5 down to 0, T2 accumulates how often the body ran.
        let mut machine = make_machine(&[
            (Opcode::Set, 0, 5),
            (Opcode::Set, 1, 1),
            (Opcode::Add, 2, 1), // 30: loop body
            (Opcode::Sub, 0, 1),
            (Opcode::Brp, 0, 30),
            (Opcode::Halt, 0, 0),
        ]);
        machine.run_burst(1_000);
        assert!(machine.is_halted());
        assert_eq!(machine.regs.read(2), 5);
        assert_eq!(machine.regs.read(0), 0);
    }

    #[test]
    fn test_tri_compare() {
        let mut machine = make_machine(&[
            (Opcode::Set, 0, 3),
            (Opcode::Set, 1, 9),
            (Opcode::Cpy, STATUS as Word, 0),
            (Opcode::Tri, STATUS as Word, 1),
            (Opcode::Tri, 1, 0),
            (Opcode::Tri, 0, 0),
            (Opcode::Halt, 0, 0),
        ]);
        machine.run_burst(100);
        assert_eq!(machine.regs.read(STATUS), -1);
        assert_eq!(machine.regs.read(1), 1);
        assert_eq!(machine.regs.read(0), 0);
    }

    #[test]
    fn test_call_and_return() {
        let mut machine = make_machine(&[
            (Opcode::Call, 0, 45), // 0
            (Opcode::Set, 1, 2),   // 15: runs after return
            (Opcode::Halt, 0, 0),  // 30
            (Opcode::Set, 0, 7),   // 45: subroutine
            (Opcode::Ret, 0, 0),   // 60
        ]);
        machine.step();
        assert_eq!(machine.pc, 45);
        assert_eq!(machine.regs.stack_pointer(), -WIDTH as Word);
        assert_eq!(machine.mem.read_field(STACK_BASE as i64, INSTRUCTION_WIDTH), 15);

        machine.run_burst(100);
        assert!(machine.is_halted());
        assert_eq!(machine.regs.read(0), 7);
        assert_eq!(machine.regs.read(1), 2);
        assert_eq!(machine.regs.stack_pointer(), 0);
    }

    #[test]
    fn test_nested_calls_use_descending_frames() {
        let mut machine = make_machine(&[
            (Opcode::Call, 0, 30), // 0
            (Opcode::Halt, 0, 0),  // 15
            (Opcode::Call, 0, 60), // 30
            (Opcode::Ret, 0, 0),   // 45
            (Opcode::Add, 0, 1),   // 60
            (Opcode::Ret, 0, 0),   // 75
        ]);
        machine.regs.write(1, 1);
        machine.run_burst(3);
        assert_eq!(machine.regs.stack_pointer(), -2 * WIDTH as Word);
        assert_eq!(machine.mem.read_field(STACK_BASE as i64 - WIDTH, INSTRUCTION_WIDTH), 45);
        machine.run_burst(100);
        assert!(machine.is_halted());
        assert_eq!(machine.pc, 30);
        assert_eq!(machine.regs.read(0), 1);
    }

    #[test]
    fn test_rect_draws_pixel() {
        let mut machine = make_machine(&[
            (Opcode::Set, 0, -13),
            (Opcode::Set, 1, -13),
            (Opcode::Set, 2, -13),
            (Opcode::Set, 3, 0),
            (Opcode::Set, 4, 0),
            (Opcode::Set, 5, 1),
            (Opcode::Set, 6, 1),
            (Opcode::Rect, 0, 0),
            (Opcode::Halt, 0, 0),
        ]);
        machine.run_burst(100);
        let px = pixel(&machine.mem, 0, 0);
        assert_eq!((px.r, px.g, px.b), (-13, -13, -13));
        assert_eq!(pixel(&machine.mem, 1, 0), Rgb::default());
    }

    #[test]
    fn test_rect_off_screen_is_skipped() {
        let mut machine = Machine::new();
        for (slot, value) in [13, 13, 13, 240, 240, 50, 50].into_iter().enumerate() {
            machine.regs.write(slot, value);
        }
        encode(&mut machine.mem, 0, op(Opcode::Rect), 0, 0);
        machine.step();
        assert_eq!(pixel(&machine.mem, 242, 242), Rgb { r: 13, g: 13, b: 13 });
        assert_eq!(machine.pc, WIDTH);
    }

    #[test]
    fn test_poll_input() {
        let mut machine = make_machine(&[
            (Opcode::PollMouse, 0, 0),
            (Opcode::PollMouse, 1, 1),
            (Opcode::PollMouse, 2, 2),
            (Opcode::PollKey, 3, 32),
            (Opcode::PollKey, 4, 33),
            (Opcode::Halt, 0, 0),
        ]);
        machine.input.set_mouse(100, 42);
        machine.input.set_click(true);
        machine.input.set_key(32, true);
        machine.run_burst(100);
        assert_eq!(machine.regs.read(0), 100);
        assert_eq!(machine.regs.read(1), 42);
        assert_eq!(machine.regs.read(2), 1);
        assert_eq!(machine.regs.read(3), 13);
        assert_eq!(machine.regs.read(4), 0);
    }

    #[test]
    fn test_out_emits_register() {
        let mut machine = make_machine(&[
            (Opcode::Set, 3, -99),
            (Opcode::Out, 3, 0),
            (Opcode::Halt, 0, 0),
        ]);
        machine.run_burst(100);
        assert_eq!(machine.drain_output(), vec![-99]);
    }

    #[test]
    fn test_unknown_opcode_is_noop() {
        let mut machine = Machine::new();
        encode(&mut machine.mem, 0, 5, 3, 99);
        encode(&mut machine.mem, 15, -17, 3, 99);
        let regs = machine.regs.clone();
        machine.run_burst(2);
        assert_eq!(machine.pc, 30);
        assert_eq!(machine.regs, regs);
        assert!(machine.is_running());
        assert_eq!(machine.last_instruction().map(|i| i.code), Some(-17));
    }

    #[test]
    fn test_run_burst_respects_budget() {
        // JMP 0 spins forever.
        let mut machine = make_machine(&[(Opcode::Jmp, 0, 0)]);
        assert_eq!(machine.run_burst(250), 250);
        assert_eq!(machine.cycles, 250);
        assert!(machine.is_running());
    }

    #[test]
    fn test_deterministic_traces() {
        let program = [
            (Opcode::PollMouse, 0, 0),
            (Opcode::Set, 1, 7),
            (Opcode::Mul, 0, 1),
            (Opcode::Set, 3, 0),
            (Opcode::Cpy, 4, 0),
            (Opcode::Set, 5, 3),
            (Opcode::Set, 6, 3),
            (Opcode::Rect, 0, 0),
            (Opcode::Jmp, 0, 0),
        ];
        let mut a = make_machine(&program);
        let mut b = make_machine(&program);
        for frame in 0..5 {
            a.input.set_mouse(frame, frame * 2);
            b.input.set_mouse(frame, frame * 2);
            let trace_a: Vec<_> = (0..40).filter_map(|_| a.step()).collect();
            let trace_b: Vec<_> = (0..40).filter_map(|_| b.step()).collect();
            assert_eq!(trace_a, trace_b);
        }
        assert_eq!(a, b);
    }
}
