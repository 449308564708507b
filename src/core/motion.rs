//! Per-tick smoothing of frame position and camera distance
//!
//! # Model
//!
//! Discrete exponential smoothing (a one-pole low-pass filter):
//!
//! ```text
//! current += (target - current) * alpha
//! ```
//!
//! With `alpha` in (0, 1) the distance shrinks by `(1 - alpha)` each tick:
//! monotone, no overshoot, never exactly reaching the target. Display
//! rounds to whole frames so the tail is invisible.
//!
//! While AutoPlaying the frame ignores its target and advances by
//! `play_speed` per tick. Zoom is always smoothed.

use serde::{Deserialize, Serialize};

use super::controller::{PlaybackState, ScrubTarget};
use super::frame::{display_frame, FrameIndex};

/// Smoothing coefficients and play velocity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionParams {
    /// Fraction of remaining frame distance covered per tick
    pub alpha_frame: f64,
    /// Fraction of remaining zoom distance covered per tick
    pub alpha_zoom: f64,
    /// Frames advanced per tick while AutoPlaying
    pub play_speed: f64,
}

impl Default for MotionParams {
    fn default() -> Self {
        Self {
            alpha_frame: 0.08,
            alpha_zoom: 0.1,
            play_speed: 1.2,
        }
    }
}

/// Interpolated state, read by everything, written only by the integrator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrubCurrent {
    /// Real-valued, unbounded frame position
    pub frame: f64,
    pub zoom: f64,
}

impl ScrubCurrent {
    /// Frame index to display for this position
    pub fn display_frame(&self, total_frames: usize) -> FrameIndex {
        display_frame(self.frame, total_frames)
    }
}

/// One integration step. Pure: same inputs, same output.
pub fn integrate(
    current: ScrubCurrent,
    target: ScrubTarget,
    playback: PlaybackState,
    params: &MotionParams,
) -> ScrubCurrent {
    let frame = match playback {
        PlaybackState::AutoPlaying => current.frame + params.play_speed,
        PlaybackState::Idle | PlaybackState::Scrubbing => {
            current.frame + (target.frame - current.frame) * params.alpha_frame
        }
    };
    let zoom = current.zoom + (target.zoom - current.zoom) * params.alpha_zoom;
    ScrubCurrent { frame, zoom }
}

/// Owns `ScrubCurrent` and applies `integrate` once per tick.
#[derive(Debug, Clone)]
pub struct MotionIntegrator {
    current: ScrubCurrent,
    params: MotionParams,
}

impl MotionIntegrator {
    /// Start at rest on `initial` (no jump on the first tick)
    pub fn new(initial: ScrubCurrent, params: MotionParams) -> Self {
        Self {
            current: initial,
            params,
        }
    }

    pub fn current(&self) -> ScrubCurrent {
        self.current
    }

    pub fn params(&self) -> &MotionParams {
        &self.params
    }

    /// Advance one tick toward `target`
    pub fn advance(&mut self, target: ScrubTarget, playback: PlaybackState) -> ScrubCurrent {
        self.current = integrate(self.current, target, playback, &self.params);
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(alpha_frame: f64) -> MotionParams {
        MotionParams {
            alpha_frame,
            alpha_zoom: 0.1,
            play_speed: 1.2,
        }
    }

    #[test]
    fn test_fixed_point_is_stable() {
        let p = params(0.08);
        let rest = ScrubCurrent { frame: 412.0, zoom: 2.5 };
        let target = ScrubTarget { frame: 412.0, zoom: 2.5 };
        let mut current = rest;
        for _ in 0..10_000 {
            current = integrate(current, target, PlaybackState::Idle, &p);
            assert_eq!(current, rest);
        }
    }

    #[test]
    fn test_approach_zero_monotonic_without_overshoot() {
        // 838 frames, start() from frame 500, alpha 0.08
        let p = params(0.08);
        let target = ScrubTarget { frame: 0.0, zoom: 2.0 };
        let mut integrator = MotionIntegrator::new(ScrubCurrent { frame: 500.0, zoom: 2.0 }, p);

        let mut prev = integrator.current().frame;
        for _ in 0..300 {
            let next = integrator.advance(target, PlaybackState::Idle).frame;
            assert!(next < prev || next == 0.0, "not decreasing: {} -> {}", prev, next);
            assert!(next >= 0.0, "overshoot: {}", next);
            prev = next;
        }
        assert_eq!(integrator.current().display_frame(838), 0);
    }

    #[test]
    fn test_approach_from_below_no_overshoot() {
        let p = params(0.5);
        let target = ScrubTarget { frame: 10.0, zoom: 1.0 };
        let mut current = ScrubCurrent { frame: -30.0, zoom: 4.0 };
        for _ in 0..100 {
            let next = integrate(current, target, PlaybackState::Scrubbing, &p);
            assert!(next.frame >= current.frame);
            assert!(next.frame <= 10.0);
            assert!(next.zoom <= current.zoom && next.zoom >= 1.0);
            current = next;
        }
    }

    #[test]
    fn test_autoplay_ignores_target() {
        let p = params(0.08);
        let target = ScrubTarget { frame: 0.0, zoom: 2.0 };
        let mut current = ScrubCurrent { frame: 836.0, zoom: 2.0 };
        for _ in 0..5 {
            current = integrate(current, target, PlaybackState::AutoPlaying, &p);
        }
        assert!((current.frame - 842.0).abs() < 1e-9);
        // Past the end the display wraps to the start
        assert_eq!(current.display_frame(838), 4);
    }

    #[test]
    fn test_zoom_smoothed_in_every_state() {
        let p = params(0.08);
        let target = ScrubTarget { frame: 0.0, zoom: 4.0 };
        let start = ScrubCurrent { frame: 0.0, zoom: 2.0 };
        for state in [PlaybackState::Idle, PlaybackState::Scrubbing, PlaybackState::AutoPlaying] {
            let next = integrate(start, target, state, &p);
            assert!((next.zoom - 2.2).abs() < 1e-12, "{:?}", state);
        }
    }

    #[test]
    fn test_display_frame_negative_position() {
        let current = ScrubCurrent { frame: -3.4, zoom: 1.0 };
        assert_eq!(current.display_frame(838), 835);
    }
}
