//! Runtime configuration for the emulator driver.
//!
//! The machine itself has no runtime knobs: memory size, boot address,
//! instruction width and register count are build constants. What can be
//! tuned is how the host drives it. Settings are loaded in priority order:
//! 1. Environment variables (`VOID3_FRAME_BUDGET`, `VOID3_MAX_FRAMES`)
//! 2. A JSON file passed with `--config`
//! 3. Built-in defaults
//!
//! # Config File Format
//!
//! ```json
//! {
//!   "frame_budget": 10000,
//!   "max_frames": 600,
//!   "icon_size": 27,
//!   "icon_gap": 9,
//!   "icon_origin": [9, 9]
//! }
//! ```
//!
//! Unknown fields are rejected, missing fields get defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::loader::apps::IconLayout;

/// Instructions executed per frame unless configured otherwise.
pub const DEFAULT_FRAME_BUDGET: u64 = 10_000;

/// Frames `run` executes before giving up on a program that never halts.
pub const DEFAULT_MAX_FRAMES: u64 = 600;

/// Emulator driver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EmulatorConfig {
    /// Instructions per burst between render/input refresh points.
    pub frame_budget: u64,

    /// Upper bound on frames for batch runs.
    pub max_frames: u64,

    /// Edge length of an app icon's hit rectangle, in pixels.
    pub icon_size: i64,

    /// Space between neighbouring icons, in pixels.
    pub icon_gap: i64,

    /// Top-left corner of the first icon.
    pub icon_origin: (i64, i64),
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            frame_budget: DEFAULT_FRAME_BUDGET,
            max_frames: DEFAULT_MAX_FRAMES,
            icon_size: 27,
            icon_gap: 9,
            icon_origin: (9, 9),
        }
    }
}

impl EmulatorConfig {
    /// Load configuration from an optional file, then apply environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        log::debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }

    /// Load configuration from a specific JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::Parse { path: None, source })
    }

    /// Apply environment variable overrides. Unparseable values are ignored
    /// with a warning.
    pub fn apply_env_overrides(&mut self) {
        if let Some(budget) = env_u64("VOID3_FRAME_BUDGET") {
            self.frame_budget = budget;
        }
        if let Some(frames) = env_u64("VOID3_MAX_FRAMES") {
            self.max_frames = frames;
        }
    }

    /// Icon grid used to assign app hit rectangles.
    pub fn icon_layout(&self) -> IconLayout {
        IconLayout {
            icon_size: self.icon_size.max(1),
            gap: self.icon_gap.max(0),
            origin: self.icon_origin,
            ..IconLayout::default()
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("ignoring {}={:?}: not a non-negative integer", name, raw);
            None
        }
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config{}: {source}", path.as_ref().map(|p| format!(" {}", p.display())).unwrap_or_default())]
    Parse {
        path: Option<PathBuf>,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EmulatorConfig::default();
        assert_eq!(config.frame_budget, 10_000);
        assert_eq!(config.icon_layout().icon_size, 27);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EmulatorConfig::from_json(r#"{ "frame_budget": 500 }"#).unwrap();
        assert_eq!(config.frame_budget, 500);
        assert_eq!(config.max_frames, DEFAULT_MAX_FRAMES);
        assert_eq!(config.icon_origin, (9, 9));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = EmulatorConfig::from_json(r#"{ "frame_budgett": 500 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { path: None, .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "icon_size": 40, "icon_origin": [0, 100] }}"#).unwrap();
        let config = EmulatorConfig::load_from_file(file.path()).unwrap();
        let layout = config.icon_layout();
        assert_eq!(layout.icon_size, 40);
        assert_eq!(layout.origin, (0, 100));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = EmulatorConfig::load_from_file(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("nope.json"));
    }

    #[test]
    fn test_bad_file_names_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = EmulatorConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { path: Some(_), .. }));
    }
}
