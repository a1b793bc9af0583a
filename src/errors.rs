//! Error types.
//!
//! The main error type [`HeliosError`] covers every failure mode the crate
//! surfaces: scene/event parsing, asset shape problems, GPU initialization,
//! and I/O. All public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, HeliosError>`. The binaries are the only boundary
//! that converts an error into a process exit code.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for the helios engine.
#[derive(Error, Debug)]
pub enum HeliosError {
    // ========================================================================
    // I/O
    // ========================================================================
    /// File could not be opened or read. Carries the offending path.
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ========================================================================
    // Scene / event parsing
    // ========================================================================
    /// Malformed scene document (bracket mismatch, bad literal, missing key).
    #[error("scene parse error: {0}")]
    Parse(String),

    /// Malformed headless event script.
    #[error("event script error: {0}")]
    Event(String),

    /// Unknown topology/format string, or a required attribute is absent.
    #[error("format error: {0}")]
    Format(String),

    /// A cross-reference in the document points at the wrong kind of element
    /// or outside the element array.
    #[error("asset shape error: {0}")]
    AssetShape(String),

    // ========================================================================
    // GPU
    // ========================================================================
    /// No suitable adapter, missing capability, or surface creation failure.
    #[error("backend init error: {0}")]
    BackendInit(String),

    /// Failed to create the GPU device.
    #[error("failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// Event loop error (winit).
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    // ========================================================================
    // Images
    // ========================================================================
    /// PNG decode/encode error.
    #[error("image error: {0}")]
    Image(String),

    /// Cube map strip has the wrong shape (height must be 6 x width).
    #[error("cube map error: {0}")]
    CubeMap(String),
}

impl HeliosError {
    /// Wraps an `std::io::Error` together with the path that produced it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HeliosError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<image::ImageError> for HeliosError {
    fn from(err: image::ImageError) -> Self {
        HeliosError::Image(err.to_string())
    }
}

/// Alias for `Result<T, HeliosError>`.
pub type Result<T> = std::result::Result<T, HeliosError>;
