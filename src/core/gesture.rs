//! Raw pointer and wheel input -> scrub actions
//!
//! The translator only tracks the drag anchor. Everything that touches the
//! target or playback state happens in `ScrubController::apply`.

use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Pointer input as delivered by the host window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PointerEvent {
    Down { x: f64 },
    Move { x: f64 },
    Up,
    Leave,
    Wheel { delta_y: f64 },
}

/// Delta against the scrub target, produced from one pointer event
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureAction {
    BeginScrub,
    /// Frames to add to the target frame
    ScrubBy(f64),
    EndScrub,
    /// Amount to add to the target zoom (clamped by the controller)
    ZoomBy(f64),
}

/// What the host should do with the original event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventResponse {
    /// Suppress the platform default (page scroll for wheel)
    pub prevent_default: bool,
    /// The event changed engine state
    pub handled: bool,
}

impl EventResponse {
    const IGNORED: Self = Self {
        prevent_default: false,
        handled: false,
    };
    const HANDLED: Self = Self {
        prevent_default: false,
        handled: true,
    };
}

#[derive(Debug, Clone)]
pub struct GestureTranslator {
    sensitivity_divisor: f64,
    wheel_zoom_factor: f64,
    /// Last pointer x while the button is down
    last_x: Option<f64>,
}

impl GestureTranslator {
    pub fn new(sensitivity_divisor: f64, wheel_zoom_factor: f64) -> Self {
        Self {
            sensitivity_divisor,
            wheel_zoom_factor,
            last_x: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.last_x.is_some()
    }

    /// Forget any drag in progress
    pub fn reset(&mut self) {
        self.last_x = None;
    }

    /// Non-finite coordinates and wheel deltas are dropped without touching
    /// the drag anchor.
    pub fn translate(&mut self, event: PointerEvent) -> (Option<GestureAction>, EventResponse) {
        trace!("Pointer event: {:?}", event);
        match event {
            PointerEvent::Down { x } | PointerEvent::Move { x } if !x.is_finite() => {
                debug!("Dropping pointer event with non-finite x: {:?}", event);
                (None, EventResponse::IGNORED)
            }
            PointerEvent::Wheel { delta_y } if !delta_y.is_finite() => {
                debug!("Dropping wheel event with non-finite delta: {}", delta_y);
                (None, EventResponse::IGNORED)
            }
            PointerEvent::Down { x } => {
                self.last_x = Some(x);
                (Some(GestureAction::BeginScrub), EventResponse::HANDLED)
            }
            PointerEvent::Move { x } => match self.last_x {
                Some(last) => {
                    self.last_x = Some(x);
                    let delta = (x - last) / self.sensitivity_divisor;
                    (Some(GestureAction::ScrubBy(delta)), EventResponse::HANDLED)
                }
                None => (None, EventResponse::IGNORED),
            },
            // Leave with the button down ends the drag like Up
            PointerEvent::Up | PointerEvent::Leave => match self.last_x.take() {
                Some(_) => (Some(GestureAction::EndScrub), EventResponse::HANDLED),
                None => (None, EventResponse::IGNORED),
            },
            PointerEvent::Wheel { delta_y } => (
                Some(GestureAction::ZoomBy(delta_y * self.wheel_zoom_factor)),
                EventResponse {
                    prevent_default: true,
                    handled: true,
                },
            ),
        }
    }
}
