//! Scene viewer entry point.
//!
//! ```text
//! helios-viewer --scene <path> [--camera <name>] [--drawing-size <W> <H>]
//!               [--physical-device <name>] [--culling <none|frustum>]
//!               [--events <path>] [--headless] [--performance-test <N>]
//! ```

use std::process::ExitCode;

use helios::app::{self, ViewerConfig};

fn main() -> ExitCode {
    env_logger::init();

    let config = match ViewerConfig::parse(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match app::run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
