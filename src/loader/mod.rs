//! Program loading for the VOID-3 desktop.
//!
//! - `launch`: swap a program image into a machine
//! - `apps`: launchable apps and their icon hit rectangles
//! - `session`: frame-paced driver that applies launches between bursts

pub mod launch;
pub mod apps;
pub mod session;

pub use launch::{install, launch, LaunchReport, LoadError};
pub use apps::{AppBundle, AppDescriptor, AppRegistry, IconLayout};
pub use session::{FrameReport, Session};
