//! Error taxonomy for the scrubbing engine.
//!
//! Only configuration errors are fatal, and only at construction time.
//! Load failures travel as `ResourceFailed` events carrying a `LoadError`.
//! Tick failures travel as `TickFault` events carrying a `ScrubError`, so the
//! tick loop keeps running.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid scene configuration. The engine refuses to start.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("total_frames must be greater than zero")]
    NoFrames,

    #[error("min_zoom ({min}) is greater than max_zoom ({max})")]
    ZoomBounds { min: f64, max: f64 },

    #[error("{name} must be finite and within (0, 1), got {value}")]
    Smoothing { name: &'static str, value: f64 },

    #[error("{name} must be finite and positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} must be finite, got {value}")]
    NotFinite { name: &'static str, value: f64 },

    #[error("section '{name}' points at frame {frame}, outside 0..{total_frames}")]
    SectionOutOfRange {
        name: String,
        frame: usize,
        total_frames: usize,
    },

    #[error("failed to read scene file {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("invalid scene file {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("unknown scene preset '{0}'")]
    UnknownPreset(String),
}

/// Failure to turn a frame path into a displayable resource.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("unsupported format: .{0}")]
    UnsupportedFormat(String),
}

/// Failure reported by the external rendering surface.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("surface error: {0}")]
pub struct SurfaceError(pub String);

/// Top-level engine error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScrubError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("tick panicked: {0}")]
    TickPanic(String),
}
