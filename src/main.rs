//! VOID-3 Emulator - CLI Entry Point
//!
//! Commands:
//! - `void3-emu run <program>` - Launch a program and run it until it halts
//! - `void3-emu disasm <program>` - Assemble a program and list it back
//! - `void3-emu desktop <program>... --click X,Y` - Launch an app by icon
//! - `void3-emu compile <source> [-o output]` - Compile Trit-C to assembly

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;

use void3::asm::disasm::{disassemble, disassemble_instruction};
use void3::asm::tritc::compile;
use void3::config::EmulatorConfig;
use void3::cpu::{CpuState, Machine, INSTRUCTION_WIDTH};
use void3::loader::{launch, AppBundle, Session};

#[derive(Parser)]
#[command(name = "void3-emu")]
#[command(version = "0.1.0")]
#[command(about = "A balanced ternary fantasy console with a memory-mapped framebuffer")]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch a program and run it until it halts
    Run {
        /// Path to the assembly source
        program: PathBuf,
        /// Maximum number of frames to run
        #[arg(short, long)]
        frames: Option<u64>,
        /// Instructions per frame
        #[arg(short, long)]
        budget: Option<u64>,
        /// Print every executed instruction
        #[arg(short, long)]
        trace: bool,
        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Assemble a program and print its disassembly
    Disasm {
        /// Path to the assembly source
        program: PathBuf,
    },
    /// Register programs as desktop apps and launch one with a click
    Desktop {
        /// App program images, one icon each
        #[arg(required = true)]
        programs: Vec<PathBuf>,
        /// Pointer click position
        #[arg(long, value_parser = parse_point)]
        click: (i64, i64),
        /// Maximum number of frames to run after the click
        #[arg(short, long)]
        frames: Option<u64>,
        /// Print the final report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compile Trit-C source to assembly
    Compile {
        /// Path to the Trit-C source
        source: PathBuf,
        /// Output assembly file (defaults to the source with a .void extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Final machine state after a run.
#[derive(Serialize)]
struct RunReport {
    program: PathBuf,
    frames: u64,
    cycles: u64,
    state: CpuState,
    pc: i64,
    /// Non-zero registers as `(index, value)`. Values are strings because
    /// 50-trit words do not fit a JSON number.
    registers: Vec<(usize, String)>,
    output: Vec<String>,
}

impl RunReport {
    fn new(program: &Path, frames: u64, machine: &Machine) -> Self {
        Self {
            program: program.to_path_buf(),
            frames,
            cycles: machine.cycles,
            state: machine.state,
            pc: machine.pc,
            registers: machine
                .regs
                .as_slice()
                .iter()
                .enumerate()
                .filter(|&(_, &v)| v != 0)
                .map(|(i, v)| (i, v.to_string()))
                .collect(),
            output: machine.output().map(|v| v.to_string()).collect(),
        }
    }

    fn print(&self, json: bool) {
        if json {
            match serde_json::to_string_pretty(self) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("❌ Failed to serialize report: {}", e);
                    std::process::exit(1);
                }
            }
            return;
        }

        println!();
        println!("━━━ Result ━━━");
        println!("Frames: {}", self.frames);
        println!("Cycles: {}", self.cycles);
        println!("State:  {:?}", self.state);
        println!("PC:     {}", self.pc);
        if self.registers.is_empty() {
            println!("Registers: all zero");
        } else {
            println!("Registers:");
            for (i, v) in &self.registers {
                println!("  T{:<2} = {}", i, v);
            }
        }
        if !self.output.is_empty() {
            println!("Output: {}", self.output.join(" "));
        }
        if self.state == CpuState::Running {
            println!();
            println!("⚠️  Still running after {} frames. Use --frames to increase.", self.frames);
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match EmulatorConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Run { program, frames, budget, trace, json }) => {
            if let Some(budget) = budget {
                config.frame_budget = budget;
            }
            if let Some(frames) = frames {
                config.max_frames = frames;
            }
            run_program(&program, &config, trace, json);
        }
        Some(Commands::Disasm { program }) => {
            disassemble_file(&program);
        }
        Some(Commands::Desktop { programs, click, frames, json }) => {
            if let Some(frames) = frames {
                config.max_frames = frames;
            }
            run_desktop(programs, click, &config, json);
        }
        Some(Commands::Compile { source, output }) => {
            compile_file(&source, output);
        }
        None => {
            println!("VOID-3 Emulator v0.1.0");
            println!("A balanced ternary fantasy console");
            println!();
            println!("Use --help for available commands");
            println!();
            demo_ternary_primitives();
        }
    }
}

fn parse_point(s: &str) -> Result<(i64, i64), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got {:?}", s))?;
    let x = x.trim().parse().map_err(|e| format!("bad X: {}", e))?;
    let y = y.trim().parse().map_err(|e| format!("bad Y: {}", e))?;
    Ok((x, y))
}

fn run_program(path: &Path, config: &EmulatorConfig, trace: bool, json: bool) {
    if !json {
        println!("🔧 Running: {}", path.display());
    }

    let mut machine = Machine::new();
    match launch(&mut machine, path) {
        Ok(report) => {
            if !json {
                println!("📝 Assembled {} instructions", report.assembly.instructions);
            }
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }

    if trace {
        println!();
        println!("━━━ Execution ━━━");
    }

    let mut frames = 0;
    while machine.is_running() && frames < config.max_frames {
        if trace {
            run_traced_burst(&mut machine, config.frame_budget);
        } else {
            machine.run_burst(config.frame_budget);
        }
        frames += 1;
    }

    RunReport::new(path, frames, &machine).print(json);
}

/// Run one burst, printing each instruction as it executes.
fn run_traced_burst(machine: &mut Machine, budget: u64) {
    for _ in 0..budget {
        let pc = machine.pc;
        match machine.step() {
            Some(instr) => println!("{:07}: {}", pc, disassemble_instruction(&instr)),
            None => break,
        }
    }
}

fn disassemble_file(path: &Path) {
    println!("📖 Disassembling: {}", path.display());
    println!();

    let mut machine = Machine::new();
    let report = match launch(&mut machine, path) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };

    let output = disassemble(&machine.mem, report.assembly.base, report.assembly.instructions);
    println!("{}", output);
    if report.assembly.skipped > 0 {
        println!("⚠️  {} lines were not instructions and were skipped", report.assembly.skipped);
    }
}

fn compile_file(source_path: &Path, output: Option<PathBuf>) {
    let out_path = output.unwrap_or_else(|| source_path.with_extension("void"));

    println!("📝 Compiling: {} → {}", source_path.display(), out_path.display());

    let source = match std::fs::read_to_string(source_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Failed to read file: {}", e);
            std::process::exit(1);
        }
    };

    let compiled = match compile(&source) {
        Ok(compiled) => compiled,
        Err(e) => {
            eprintln!("❌ Compile error: {}", e);
            std::process::exit(1);
        }
    };

    println!("✓ Compiled {} instructions", compiled.instructions);
    for (name, reg) in &compiled.variables {
        println!("  {:<16} T{}", name, reg);
    }
    if compiled.skipped > 0 {
        println!("⚠️  {} lines were not statements and were skipped", compiled.skipped);
    }

    if let Err(e) = std::fs::write(&out_path, &compiled.assembly) {
        eprintln!("❌ Failed to write assembly: {}", e);
        std::process::exit(1);
    }

    println!("✓ Saved to {}", out_path.display());
}

fn run_desktop(programs: Vec<PathBuf>, click: (i64, i64), config: &EmulatorConfig, json: bool) {
    let bundles: Vec<_> = programs.into_iter().map(AppBundle::from_path).collect();
    let mut session = Session::with_apps(config, bundles);

    if !json {
        println!("🖥️  Desktop with {} apps", session.apps().len());
        for app in session.apps().iter() {
            println!(
                "  {:<16} at ({:>3}, {:>3}) {}x{}",
                app.name, app.rect.x, app.rect.y, app.rect.w, app.rect.h
            );
        }
    }

    let (x, y) = click;
    session.input_mut().set_mouse(x as i128, y as i128);
    session.input_mut().set_click(true);

    let program = match session.click(x, y) {
        Some(name) => {
            if !json {
                println!("🖱️  Click at ({}, {}) opens {}", x, y, name);
            }
            session
                .apps()
                .find(&name)
                .map(|app| app.program_path.clone())
                .unwrap_or_default()
        }
        None => {
            eprintln!("❌ No app icon at ({}, {})", x, y);
            std::process::exit(1);
        }
    };

    // The launch lands at the start of the first frame.
    let first = session.run_frame();
    if let Some(Err(e)) = first.launched {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
    session.input_mut().set_click(false);
    let frames = if first.halted {
        1
    } else {
        1 + session.run_until_halt(config.max_frames.saturating_sub(1))
    };

    RunReport::new(&program, frames, session.machine()).print(json);
}

fn demo_ternary_primitives() {
    use void3::ternary::{arith, codec, Trit};

    println!("━━━ Balanced Ternary Demo ━━━");
    println!();

    println!("Trits (single balanced ternary digits):");
    for t in Trit::ALL {
        println!("  {:?} = {} = {:>2}", t, t, t.to_i8());
    }
    println!();

    println!("Fields (least significant trit first in memory, shown MSB first):");
    for value in [42, -17, 364] {
        println!("  {:>4} in 6 trits: {}", value, codec::format_trits(value, 6));
    }
    println!();

    println!("50-trit register arithmetic:");
    let x = 12_345;
    let y = -6_789;
    println!("  {} + {} = {}", x, y, arith::add(x, y));
    println!("  {} - {} = {}", x, y, arith::sub(x, y));
    println!("  {} × {} = {}", x, y, arith::mul(x, y));
    println!("  {} ÷ {} = {}", x, y, arith::div(x, y));
    println!("  {} + 1 wraps to {}", codec::WORD_MAX, arith::add(codec::WORD_MAX, 1));
    println!();

    println!("Machine: {} trits per instruction at boot address {}", INSTRUCTION_WIDTH, void3::cpu::BOOT_ADDRESS);
    println!();
    println!("✓ Core ternary primitives working!");
}
