//! Environment pre-integrator entry point.
//!
//! ```text
//! helios-prefilter --src <path> --mode <Lambertian|GGX>
//!                  [--sample <N>] [--output <size>]
//! ```
//!
//! Writes `<src>_lam.png` in Lambertian mode; `<src>_ggx_<tier>.png` for
//! each of the ten roughness tiers plus `<src>_ggx_brdf.png` in GGX mode.

use std::path::PathBuf;
use std::process::ExitCode;

use helios::envmap::{Baker, Mode};
use helios::errors::{HeliosError, Result};

struct Args {
    src: PathBuf,
    mode: Mode,
    samples: u32,
    output_size: u32,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut args = args.into_iter();
    let mut src = None;
    let mut mode = None;
    let mut samples = 1024;
    let mut output_size = 32;

    let missing = |flag: &str| HeliosError::Format(format!("{flag} needs a value"));

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--src" => src = Some(PathBuf::from(args.next().ok_or(missing("--src"))?)),
            "--mode" => mode = Some(Mode::from_str(&args.next().ok_or(missing("--mode"))?)?),
            "--sample" => {
                let n = args.next().ok_or(missing("--sample"))?;
                samples = n
                    .parse()
                    .map_err(|_| HeliosError::Format(format!("bad sample count '{n}'")))?;
            }
            "--output" => {
                let n = args.next().ok_or(missing("--output"))?;
                output_size = n
                    .parse()
                    .map_err(|_| HeliosError::Format(format!("bad output size '{n}'")))?;
            }
            other => return Err(HeliosError::Format(format!("unknown argument '{other}'"))),
        }
    }

    Ok(Args {
        src: src.ok_or_else(|| HeliosError::Format("--src is required".into()))?,
        mode: mode.ok_or_else(|| HeliosError::Format("--mode is required".into()))?,
        samples,
        output_size,
    })
}

fn run(args: &Args) -> Result<()> {
    let baker = Baker::load(&args.src)?;
    match args.mode {
        Mode::Lambertian => baker.run_lambertian(args.samples, args.output_size),
        Mode::Ggx => baker.run_ggx(args.samples, args.output_size),
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
