//! Launchable applications and their desktop icons.
//!
//! Each registered app gets a square hit rectangle on an icon grid. Grid
//! slots fill left to right, top to bottom, so rectangles never overlap.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cpu::io::{Rect, FRAMEBUFFER_WIDTH};
use crate::cpu::machine::Machine;
use crate::loader::launch::{launch, LaunchReport, LoadError};

/// An app as it ships: a display name and its program image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppBundle {
    pub name: String,
    pub program_path: PathBuf,
}

impl AppBundle {
    pub fn new(name: impl Into<String>, program_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            program_path: program_path.into(),
        }
    }

    /// Bundle named after the program file's stem.
    pub fn from_path(program_path: impl Into<PathBuf>) -> Self {
        let program_path = program_path.into();
        let name = program_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| program_path.display().to_string());
        Self { name, program_path }
    }
}

/// A registered app with its icon hit rectangle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppDescriptor {
    pub name: String,
    pub program_path: PathBuf,
    pub rect: Rect,
}

/// Geometry of the icon grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconLayout {
    pub icon_size: i64,
    pub gap: i64,
    pub origin: (i64, i64),
    /// Width available for a row of icons.
    pub row_width: i64,
}

impl Default for IconLayout {
    fn default() -> Self {
        Self {
            icon_size: 27,
            gap: 9,
            origin: (9, 9),
            row_width: FRAMEBUFFER_WIDTH as i64,
        }
    }
}

impl IconLayout {
    /// Icons per row. Always at least one.
    pub fn columns(&self) -> i64 {
        let pitch = self.pitch();
        let usable = self
            .row_width
            .saturating_sub(self.origin.0)
            .saturating_add(self.gap);
        if pitch <= 0 {
            return 1;
        }
        (usable / pitch).max(1)
    }

    /// Hit rectangle for grid slot `slot`. Coordinates saturate rather than
    /// wrap for extreme geometry.
    pub fn slot_rect(&self, slot: usize) -> Rect {
        let columns = self.columns();
        let pitch = self.pitch();
        let slot = i64::try_from(slot).unwrap_or(i64::MAX);
        Rect::new(
            self.origin.0.saturating_add((slot % columns).saturating_mul(pitch)),
            self.origin.1.saturating_add((slot / columns).saturating_mul(pitch)),
            self.icon_size,
            self.icon_size,
        )
    }

    fn pitch(&self) -> i64 {
        self.icon_size.saturating_add(self.gap)
    }
}

/// The set of apps the desktop can launch.
#[derive(Debug, Clone, Default)]
pub struct AppRegistry {
    layout: IconLayout,
    apps: Vec<AppDescriptor>,
}

impl AppRegistry {
    pub fn new(layout: IconLayout) -> Self {
        Self {
            layout,
            apps: Vec::new(),
        }
    }

    /// Register every bundle in order.
    pub fn from_bundles(bundles: impl IntoIterator<Item = AppBundle>, layout: IconLayout) -> Self {
        let mut registry = Self::new(layout);
        for bundle in bundles {
            registry.register(bundle);
        }
        registry
    }

    /// Register an app in the next free icon slot.
    pub fn register(&mut self, bundle: AppBundle) -> &AppDescriptor {
        let rect = self.layout.slot_rect(self.apps.len());
        log::debug!(
            "registered app {:?} at ({}, {}) {}x{}",
            bundle.name,
            rect.x,
            rect.y,
            rect.w,
            rect.h
        );
        self.apps.push(AppDescriptor {
            name: bundle.name,
            program_path: bundle.program_path,
            rect,
        });
        &self.apps[self.apps.len() - 1]
    }

    /// First app whose icon contains `(x, y)`.
    pub fn hit_test(&self, x: i64, y: i64) -> Option<&AppDescriptor> {
        self.apps.iter().find(|app| app.rect.contains(x, y))
    }

    /// Look an app up by name.
    pub fn find(&self, name: &str) -> Option<&AppDescriptor> {
        self.apps.iter().find(|app| app.name == name)
    }

    /// Launch whichever app sits under `(x, y)`.
    ///
    /// `Ok(None)` means the click hit no icon.
    pub fn launch_at(
        &self,
        machine: &mut Machine,
        x: i64,
        y: i64,
    ) -> Result<Option<LaunchReport>, LoadError> {
        match self.hit_test(x, y) {
            Some(app) => launch(machine, &app.program_path).map(Some),
            None => Ok(None),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AppDescriptor> {
        self.apps.iter()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn bundles(n: usize) -> Vec<AppBundle> {
        (0..n)
            .map(|i| AppBundle::new(format!("app{}", i), format!("app{}.void", i)))
            .collect()
    }

    #[test]
    fn test_first_slot_at_origin() {
        let registry = AppRegistry::from_bundles(bundles(1), IconLayout::default());
        let app = registry.iter().next().unwrap();
        assert_eq!(app.rect, Rect::new(9, 9, 27, 27));
    }

    #[test]
    fn test_grid_wraps_rows() {
        let layout = IconLayout::default();
        // (243 - 9 + 9) / 36 = 6 icons per row.
        assert_eq!(layout.columns(), 6);
        let registry = AppRegistry::from_bundles(bundles(8), layout);
        let rects: Vec<_> = registry.iter().map(|a| a.rect).collect();
        assert_eq!(rects[5], Rect::new(9 + 5 * 36, 9, 27, 27));
        assert_eq!(rects[6], Rect::new(9, 45, 27, 27));
        assert!(rects[5].x + rects[5].w <= 243);
    }

    #[test]
    fn test_icons_never_overlap() {
        let registry = AppRegistry::from_bundles(bundles(20), IconLayout::default());
        let rects: Vec<_> = registry.iter().map(|a| a.rect).collect();
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_hit_test() {
        let registry = AppRegistry::from_bundles(bundles(3), IconLayout::default());
        assert_eq!(registry.hit_test(10, 10).unwrap().name, "app0");
        assert_eq!(registry.hit_test(45, 35).unwrap().name, "app1");
        assert!(registry.hit_test(37, 10).is_none());
        assert!(registry.hit_test(0, 0).is_none());
        assert!(registry.hit_test(200, 200).is_none());
    }

    #[test]
    fn test_find_by_name() {
        let registry = AppRegistry::from_bundles(bundles(3), IconLayout::default());
        let app = registry.find("app2").unwrap();
        assert_eq!(app.program_path, PathBuf::from("app2.void"));
        assert_eq!(registry.hit_test(app.rect.x, app.rect.y), Some(app));
        assert!(registry.find("app3").is_none());
    }

    #[test]
    fn test_zero_gap_layout() {
        let layout = IconLayout {
            icon_size: 81,
            gap: 0,
            origin: (0, 0),
            row_width: 243,
        };
        assert_eq!(layout.columns(), 3);
        assert_eq!(layout.slot_rect(4), Rect::new(81, 81, 81, 81));
    }

    #[test]
    fn test_extreme_layout_saturates() {
        let layout = IconLayout {
            icon_size: i64::MAX - 3,
            gap: 9,
            origin: (9, 9),
            row_width: 243,
        };
        assert_eq!(layout.columns(), 1);
        assert_eq!(layout.slot_rect(0), Rect::new(9, 9, i64::MAX - 3, i64::MAX - 3));
        assert_eq!(layout.slot_rect(3).y, i64::MAX);

        let config = crate::config::EmulatorConfig::from_json(
            r#"{ "icon_size": 9223372036854775807, "icon_gap": 9223372036854775807 }"#,
        )
        .unwrap();
        let registry = AppRegistry::from_bundles(bundles(3), config.icon_layout());
        assert_eq!(registry.len(), 3);
        assert!(registry.hit_test(10, 10).is_some());
    }

    #[test]
    fn test_bundle_name_from_path() {
        let bundle = AppBundle::from_path("apps/paint.void");
        assert_eq!(bundle.name, "paint");
    }

    #[test]
    fn test_launch_at() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "SET 0 7\nHALT").unwrap();
        let registry = AppRegistry::from_bundles(
            vec![AppBundle::new("seven", file.path())],
            IconLayout::default(),
        );

        let mut m = Machine::new();
        assert!(registry.launch_at(&mut m, 0, 0).unwrap().is_none());
        let report = registry.launch_at(&mut m, 20, 20).unwrap().unwrap();
        assert_eq!(report.assembly.instructions, 2);
        m.run_burst(10);
        assert_eq!(m.regs.read(0), 7);
    }

    #[test]
    fn test_launch_at_missing_image() {
        let registry = AppRegistry::from_bundles(
            vec![AppBundle::new("ghost", "/nonexistent/ghost.void")],
            IconLayout::default(),
        );
        let mut m = Machine::new();
        let err = registry.launch_at(&mut m, 9, 9).unwrap_err();
        assert!(matches!(err, LoadError::ImageNotFound(_)));
        assert!(m.is_running());
    }
}
