//! Diagnostics events published on the engine's `EventBus`

use std::path::PathBuf;

use super::controller::PlaybackState;
use super::error::{LoadError, ScrubError};
use super::frame::FrameIndex;

/// A frame failed to load. Emitted once per index; the slot stays `Failed`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceFailed {
    pub index: FrameIndex,
    pub path: PathBuf,
    pub reason: LoadError,
}

/// A tick panicked or the surface reported an error. The loop keeps running.
#[derive(Debug, Clone, PartialEq)]
pub struct TickFault {
    pub tick: u64,
    /// `Surface` for a failed draw, `TickPanic` for anything that unwound
    pub error: ScrubError,
}

/// `go_to` was given a name the section map does not know.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownSection {
    pub name: String,
}

/// Playback state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackChanged {
    pub from: PlaybackState,
    pub to: PlaybackState,
}
