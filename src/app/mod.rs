//! Run modes: interactive windowed, headless event-driven, and performance
//! measurement, plus the command-line configuration they share.

pub mod config;
pub mod headless;
pub mod performance;
pub mod runtime;
pub mod windowed;

use crate::errors::Result;
pub use config::ViewerConfig;
pub use runtime::SceneRuntime;

/// Dispatches to the run mode the configuration selects.
pub fn run(config: &ViewerConfig) -> Result<()> {
    if let Some(frames) = config.performance {
        performance::run(config, frames)
    } else if config.headless {
        headless::run(config)
    } else {
        windowed::run(config)
    }
}
