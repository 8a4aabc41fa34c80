//! Program launch: swap a new image into a running machine.
//!
//! A launch halts the CPU, wipes the program region and the framebuffer,
//! assembles the new image at the boot address, zeroes the registers and
//! restarts execution. If the image cannot be read nothing is touched and
//! the machine keeps its previous run state.

use std::io::ErrorKind;
use std::ops::Range;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asm::assembler::{assemble_into, AssemblyReport};
use crate::cpu::io::{FRAMEBUFFER_BASE, FRAMEBUFFER_LEN};
use crate::cpu::machine::Machine;
use crate::cpu::memory::BOOT_ADDRESS;

/// Memory wiped before a new image is installed: program region and
/// framebuffer.
pub const LAUNCH_CLEAR_RANGE: Range<usize> = 0..FRAMEBUFFER_BASE + FRAMEBUFFER_LEN;

/// Errors raised while launching a program image.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("program image not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("cannot read program image {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a successful launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchReport {
    pub path: PathBuf,
    pub assembly: AssemblyReport,
}

/// Read the image at `path` and install it into `machine`.
pub fn launch(machine: &mut Machine, path: impl AsRef<Path>) -> Result<LaunchReport, LoadError> {
    let path = path.as_ref();
    let was_halted = machine.is_halted();
    machine.halt();

    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            if !was_halted {
                machine.resume();
            }
            let err = if err.kind() == ErrorKind::NotFound {
                LoadError::ImageNotFound(path.to_path_buf())
            } else {
                LoadError::Io {
                    path: path.to_path_buf(),
                    source: err,
                }
            };
            log::warn!("launch aborted: {}", err);
            return Err(err);
        }
    };

    let assembly = install(machine, &source);
    log::info!(
        "launched {} ({} instructions)",
        path.display(),
        assembly.instructions
    );
    Ok(LaunchReport {
        path: path.to_path_buf(),
        assembly,
    })
}

/// Install program text into `machine` and start it at the boot address.
pub fn install(machine: &mut Machine, source: &str) -> AssemblyReport {
    machine.halt();
    machine.mem.clear_range(LAUNCH_CLEAR_RANGE);
    let report = assemble_into(&mut machine.mem, source, BOOT_ADDRESS as i64);
    machine.reset_cpu();
    machine.resume();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::decode::{fetch, Opcode};
    use crate::cpu::io::{fill_rect, pixel, Rgb};
    use crate::cpu::memory::MEMORY_SIZE;
    use std::io::Write;

    fn write_program(source: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", source).unwrap();
        file
    }

    #[test]
    fn test_launch_installs_and_runs() {
        let file = write_program("SET 0 5\nSET 1 3\nADD 0 1\nHALT");
        let mut m = Machine::new();
        let report = launch(&mut m, file.path()).unwrap();
        assert_eq!(report.assembly.instructions, 4);
        assert!(m.is_running());
        assert_eq!(m.pc, 0);

        m.run_burst(100);
        assert!(m.is_halted());
        assert_eq!(m.regs.read(0), 8);
    }

    #[test]
    fn test_launch_resets_previous_program() {
        let mut m = Machine::new();
        install(&mut m, "SET 2 13\nSET 5 5\nSET 6 5\nRECT\nSET 9 99\nJMP 0 75");
        m.run_burst(50);
        assert_eq!(m.regs.read(9), 99);
        assert_eq!(pixel(&m.mem, 0, 0).b, 13);
        m.mem.write_field(MEMORY_SIZE as i64 - 15, 15, 42);

        let file = write_program("HALT");
        launch(&mut m, file.path()).unwrap();

        assert!(m.regs.as_slice().iter().all(|&r| r == 0));
        assert_eq!(pixel(&m.mem, 0, 0), Rgb::default());
        assert_eq!(fetch(&m.mem, 0).opcode, Opcode::Halt);
        // Old program text past the new image is gone.
        assert_eq!(m.mem.read_field(15, 15), 0);
        // The stack area outside the cleared window survives.
        assert_eq!(m.mem.read_field(MEMORY_SIZE as i64 - 15, 15), 42);
    }

    #[test]
    fn test_missing_image_keeps_machine_running() {
        let mut m = Machine::new();
        install(&mut m, "SET 0 1\nADD 0 0\nJMP 0 15");
        m.run_burst(20);
        let before = m.clone();

        let dir = tempfile::tempdir().unwrap();
        let err = launch(&mut m, dir.path().join("missing.void")).unwrap_err();

        assert!(matches!(err, LoadError::ImageNotFound(_)));
        assert!(m.is_running());
        assert_eq!(m, before);
    }

    #[test]
    fn test_missing_image_keeps_halted_machine_halted() {
        let mut m = Machine::new();
        m.halt();
        let dir = tempfile::tempdir().unwrap();
        assert!(launch(&mut m, dir.path().join("nope")).is_err());
        assert!(m.is_halted());
    }

    #[test]
    fn test_unreadable_image_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = Machine::new();
        // A directory exists but cannot be read as text.
        let err = launch(&mut m, dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert!(m.is_running());
    }

    #[test]
    fn test_install_clears_framebuffer() {
        let mut m = Machine::new();
        fill_rect(&mut m.mem, Rgb { r: 13, g: 0, b: -13 }, 100, 100, 10, 10);
        install(&mut m, "HALT");
        assert_eq!(pixel(&m.mem, 105, 105), Rgb::default());
    }
}
