//! A desktop session: one machine, a set of apps, and frame pacing.
//!
//! Launch requests never cut into a burst. They are queued and applied at
//! the start of the next frame, before any instruction of that frame runs.

use std::path::PathBuf;

use crate::config::EmulatorConfig;
use crate::cpu::io::InputPorts;
use crate::cpu::machine::Machine;
use crate::loader::apps::{AppBundle, AppRegistry};
use crate::loader::launch::{launch, LaunchReport, LoadError};

/// What happened during one frame.
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Launch applied at the frame boundary, if one was queued.
    pub launched: Option<Result<LaunchReport, LoadError>>,
    /// Instructions executed in the burst.
    pub executed: u64,
    /// Whether the CPU was halted when the burst ended.
    pub halted: bool,
}

/// Drives a machine frame by frame on behalf of a host.
#[derive(Debug)]
pub struct Session {
    machine: Machine,
    apps: AppRegistry,
    frame_budget: u64,
    pending: Option<PathBuf>,
    frames: u64,
}

impl Session {
    /// A session with no apps, a zeroed machine and the configured budget.
    pub fn new(config: &EmulatorConfig) -> Self {
        Self::with_apps(config, Vec::new())
    }

    /// A session whose desktop offers `bundles`.
    pub fn with_apps(config: &EmulatorConfig, bundles: Vec<AppBundle>) -> Self {
        Self {
            machine: Machine::new(),
            apps: AppRegistry::from_bundles(bundles, config.icon_layout()),
            frame_budget: config.frame_budget,
            pending: None,
            frames: 0,
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn apps(&self) -> &AppRegistry {
        &self.apps
    }

    /// Input ports the host refreshes between frames.
    pub fn input_mut(&mut self) -> &mut InputPorts {
        &mut self.machine.input
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Queue a launch for the next frame boundary. A later request replaces
    /// an earlier one.
    pub fn request_launch(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if let Some(previous) = self.pending.replace(path) {
            log::debug!("launch of {} superseded", previous.display());
        }
    }

    pub fn pending_launch(&self) -> Option<&PathBuf> {
        self.pending.as_ref()
    }

    /// Handle a pointer click at `(x, y)`. Returns the name of the app whose
    /// launch was queued, if the click hit an icon.
    pub fn click(&mut self, x: i64, y: i64) -> Option<String> {
        let app = self.apps.hit_test(x, y)?;
        let (name, path) = (app.name.clone(), app.program_path.clone());
        log::info!("icon {:?} clicked at ({}, {})", name, x, y);
        self.request_launch(path);
        Some(name)
    }

    /// Apply any queued launch, then run one burst.
    pub fn run_frame(&mut self) -> FrameReport {
        let launched = self.pending.take().map(|path| launch(&mut self.machine, path));
        let executed = self.machine.run_burst(self.frame_budget);
        self.frames += 1;
        FrameReport {
            launched,
            executed,
            halted: self.machine.is_halted(),
        }
    }

    /// Run frames until the machine halts with nothing queued, or until
    /// `max_frames` have run. Returns the number of frames executed.
    pub fn run_until_halt(&mut self, max_frames: u64) -> u64 {
        let mut count = 0;
        while count < max_frames {
            let report = self.run_frame();
            count += 1;
            if report.halted && self.pending.is_none() {
                break;
            }
        }
        count
    }
}
