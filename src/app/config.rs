//! Command-line configuration for the viewer.

use std::path::PathBuf;

use crate::errors::{HeliosError, Result};
use crate::mesh::CullingMode;

/// Default drawing size when `--drawing-size` is absent.
pub const DEFAULT_SIZE: (u32, u32) = (1280, 720);

/// Parsed viewer command line.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub scene: PathBuf,
    pub camera: Option<String>,
    pub width: u32,
    pub height: u32,
    pub device: Option<String>,
    pub culling: CullingMode,
    pub events: Option<PathBuf>,
    pub headless: bool,
    /// Frame count for performance measurement mode.
    pub performance: Option<u32>,
}

impl ViewerConfig {
    /// Parses the argument list (without the program name).
    ///
    /// An `--events` file implies headless rendering.
    pub fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut args = args.into_iter();
        let mut scene = None;
        let mut camera = None;
        let mut size = DEFAULT_SIZE;
        let mut device = None;
        let mut culling = CullingMode::None;
        let mut events = None;
        let mut headless = false;
        let mut performance = None;

        let missing = |flag: &str| HeliosError::Format(format!("{flag} needs a value"));

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--scene" => scene = Some(PathBuf::from(args.next().ok_or(missing("--scene"))?)),
                "--camera" => camera = Some(args.next().ok_or(missing("--camera"))?),
                "--drawing-size" => {
                    let w = args.next().ok_or(missing("--drawing-size"))?;
                    let h = args.next().ok_or(missing("--drawing-size"))?;
                    size = (
                        w.parse()
                            .map_err(|_| HeliosError::Format(format!("bad width '{w}'")))?,
                        h.parse()
                            .map_err(|_| HeliosError::Format(format!("bad height '{h}'")))?,
                    );
                }
                "--physical-device" => device = Some(args.next().ok_or(missing("--physical-device"))?),
                "--culling" => {
                    culling = CullingMode::from_str(&args.next().ok_or(missing("--culling"))?)?;
                }
                "--events" => {
                    events = Some(PathBuf::from(args.next().ok_or(missing("--events"))?));
                    headless = true;
                }
                "--headless" => headless = true,
                "--performance-test" => {
                    let n = args.next().ok_or(missing("--performance-test"))?;
                    performance = Some(
                        n.parse()
                            .map_err(|_| HeliosError::Format(format!("bad frame count '{n}'")))?,
                    );
                }
                other => {
                    return Err(HeliosError::Format(format!("unknown argument '{other}'")));
                }
            }
        }

        Ok(Self {
            scene: scene.ok_or_else(|| HeliosError::Format("--scene is required".into()))?,
            camera,
            width: size.0,
            height: size.1,
            device,
            culling,
            events,
            headless,
            performance,
        })
    }
}
