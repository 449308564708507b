//! Scrub intents and the target they steer
//!
//! `ScrubController` is the only writer of `ScrubTarget` and `PlaybackState`.
//! Buttons, keyboard shortcuts and translated gestures all end up here.
//!
//! Transitions:
//!
//! ```text
//! Idle --BeginScrub--> Scrubbing --EndScrub--> Idle
//!  any --play()------> AutoPlaying
//!  any --jump/stop---> Idle
//! ```
//!
//! Jumps (start, middle, end, go_to) cancel AutoPlaying. play/stop never
//! touch the target.

use log::debug;
use serde::{Deserialize, Serialize};

use super::event_bus::EventEmitter;
use super::events::{PlaybackChanged, UnknownSection};
use super::frame::{display_frame, wrap_frame, FrameIndex};
use super::gesture::GestureAction;
use super::sections::SectionMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Scrubbing,
    AutoPlaying,
}

/// Where the motion integrator is heading
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrubTarget {
    /// Real-valued, unbounded; drags accumulate without wrapping
    pub frame: f64,
    pub zoom: f64,
}

/// Camera distance bounds and button step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ZoomRange {
    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min, self.max)
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self {
            min: 1.2,
            max: 4.0,
            step: 0.4,
        }
    }
}

#[derive(Debug)]
pub struct ScrubController {
    total_frames: usize,
    zoom: ZoomRange,
    end_offset: usize,
    sections: SectionMap,
    target: ScrubTarget,
    playback: PlaybackState,
    events: Option<EventEmitter>,
}

impl ScrubController {
    /// Idle at frame 0 with `initial_zoom` clamped into range.
    ///
    /// `total_frames` must be non-zero (checked by scene validation).
    pub fn new(
        total_frames: usize,
        zoom: ZoomRange,
        initial_zoom: f64,
        end_offset: usize,
        sections: SectionMap,
    ) -> Self {
        Self {
            total_frames,
            zoom,
            end_offset,
            sections,
            target: ScrubTarget {
                frame: 0.0,
                zoom: zoom.clamp(initial_zoom),
            },
            playback: PlaybackState::Idle,
            events: None,
        }
    }

    /// Report playback changes and unknown sections on this emitter
    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn target(&self) -> ScrubTarget {
        self.target
    }

    /// Target as a displayable index (wrapped)
    pub fn target_frame(&self) -> FrameIndex {
        display_frame(self.target.frame, self.total_frames)
    }

    pub fn target_zoom(&self) -> f64 {
        self.target.zoom
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    pub fn sections(&self) -> &SectionMap {
        &self.sections
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    fn set_playback(&mut self, to: PlaybackState) {
        let from = self.playback;
        if from == to {
            return;
        }
        self.playback = to;
        debug!("Playback {:?} -> {:?}", from, to);
        if let Some(events) = &self.events {
            events.emit(PlaybackChanged { from, to });
        }
    }

    fn jump(&mut self, frame: FrameIndex) {
        self.target.frame = frame as f64;
        self.set_playback(PlaybackState::Idle);
    }

    pub fn start(&mut self) {
        debug!("Intent: start");
        self.jump(0);
    }

    pub fn middle(&mut self) {
        debug!("Intent: middle");
        self.jump(self.total_frames / 2);
    }

    /// `end_offset` frames before the last one, wrapped for short sequences
    pub fn end(&mut self) {
        let frame = wrap_frame(self.total_frames as i64 - self.end_offset as i64, self.total_frames);
        debug!("Intent: end -> {}", frame);
        self.jump(frame);
    }

    pub fn play(&mut self) {
        debug!("Intent: play");
        self.set_playback(PlaybackState::AutoPlaying);
    }

    pub fn stop(&mut self) {
        debug!("Intent: stop");
        self.set_playback(PlaybackState::Idle);
    }

    /// Move the camera closer by one step
    pub fn zoom_in(&mut self) {
        self.zoom_by(-self.zoom.step);
    }

    /// Move the camera away by one step
    pub fn zoom_out(&mut self) {
        self.zoom_by(self.zoom.step);
    }

    /// Non-finite results are ignored: `clamp` passes NaN through.
    fn zoom_by(&mut self, delta: f64) {
        let zoom = self.target.zoom + delta;
        if !zoom.is_finite() {
            debug!("Ignoring zoom delta {}", delta);
            return;
        }
        self.target.zoom = self.zoom.clamp(zoom);
        debug!("Target zoom: {:.3}", self.target.zoom);
    }

    /// Jump to a named section. Unknown names change nothing.
    pub fn go_to(&mut self, name: &str) {
        match self.sections.resolve(name) {
            Some(frame) => {
                debug!("Intent: go_to '{}' -> {}", name, frame);
                self.jump(frame);
            }
            None => {
                debug!("Intent: go_to '{}' ignored, no such section", name);
                if let Some(events) = &self.events {
                    events.emit(UnknownSection {
                        name: name.to_string(),
                    });
                }
            }
        }
    }

    pub fn apply(&mut self, action: GestureAction) {
        match action {
            GestureAction::BeginScrub => self.set_playback(PlaybackState::Scrubbing),
            GestureAction::ScrubBy(delta) => {
                let frame = self.target.frame + delta;
                if self.playback == PlaybackState::Scrubbing && frame.is_finite() {
                    self.target.frame = frame;
                }
            }
            GestureAction::EndScrub => {
                if self.playback == PlaybackState::Scrubbing {
                    self.set_playback(PlaybackState::Idle);
                }
            }
            GestureAction::ZoomBy(delta) => self.zoom_by(delta),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event_bus::{downcast_event, EventBus};

    fn pier(total: usize) -> ScrubController {
        let sections = SectionMap::new([("playa", 796), ("arboles", 672), ("casa", 650)], total).unwrap();
        ScrubController::new(total, ZoomRange::default(), 2.0, 20, sections)
    }

    #[test]
    fn test_initial_state() {
        let c = pier(838);
        assert_eq!(c.playback(), PlaybackState::Idle);
        assert_eq!(c.target(), ScrubTarget { frame: 0.0, zoom: 2.0 });
    }

    #[test]
    fn test_initial_zoom_clamped() {
        let c = ScrubController::new(10, ZoomRange::default(), 9.0, 0, SectionMap::default());
        assert_eq!(c.target_zoom(), 4.0);
    }

    #[test]
    fn test_jumps() {
        let mut c = pier(838);
        c.middle();
        assert_eq!(c.target_frame(), 419);
        c.end();
        assert_eq!(c.target_frame(), 818);
        c.start();
        assert_eq!(c.target_frame(), 0);
    }

    #[test]
    fn test_end_wraps_short_sequence() {
        let mut c = ScrubController::new(12, ZoomRange::default(), 2.0, 20, SectionMap::default());
        c.end();
        assert_eq!(c.target_frame(), 4);
    }

    #[test]
    fn test_go_to_cancels_autoplay() {
        let mut c = pier(838);
        c.play();
        assert_eq!(c.playback(), PlaybackState::AutoPlaying);
        c.go_to("playa");
        assert_eq!(c.target().frame, 796.0);
        assert_eq!(c.playback(), PlaybackState::Idle);
    }

    #[test]
    fn test_every_jump_cancels_autoplay() {
        let jumps: [fn(&mut ScrubController); 4] = [
            ScrubController::start,
            ScrubController::middle,
            ScrubController::end,
            |c| c.go_to("casa"),
        ];
        for jump in jumps {
            let mut c = pier(838);
            c.play();
            jump(&mut c);
            assert_eq!(c.playback(), PlaybackState::Idle);
        }
    }

    #[test]
    fn test_unknown_section_is_noop() {
        let bus = EventBus::new();
        let mut c = pier(838).with_events(bus.emitter());
        c.middle();
        c.play();
        bus.poll();

        c.go_to("piscina");
        assert_eq!(c.target().frame, 419.0);
        assert_eq!(c.playback(), PlaybackState::AutoPlaying);

        let events = bus.poll();
        assert_eq!(events.len(), 1);
        assert_eq!(
            downcast_event::<UnknownSection>(&events[0]).map(|e| e.name.as_str()),
            Some("piscina")
        );
    }

    #[test]
    fn test_play_stop_keep_target() {
        let mut c = pier(838);
        c.go_to("arboles");
        c.play();
        c.stop();
        assert_eq!(c.playback(), PlaybackState::Idle);
        assert_eq!(c.target().frame, 672.0);
    }

    #[test]
    fn test_drag_left_wraps() {
        let mut c = ScrubController::new(838, ZoomRange::default(), 2.0, 20, SectionMap::default());
        c.apply(GestureAction::BeginScrub);
        assert_eq!(c.playback(), PlaybackState::Scrubbing);
        c.apply(GestureAction::ScrubBy(-50.0 / 5.0));
        assert_eq!(c.target().frame, -10.0);
        assert_eq!(c.target_frame(), 828);
        c.apply(GestureAction::EndScrub);
        assert_eq!(c.playback(), PlaybackState::Idle);
        assert_eq!(c.target().frame, -10.0);
    }

    #[test]
    fn test_begin_scrub_cancels_autoplay() {
        let mut c = pier(838);
        c.play();
        c.apply(GestureAction::BeginScrub);
        assert_eq!(c.playback(), PlaybackState::Scrubbing);
    }

    #[test]
    fn test_end_scrub_keeps_autoplay() {
        let mut c = pier(838);
        c.apply(GestureAction::BeginScrub);
        c.play();
        c.apply(GestureAction::ScrubBy(30.0));
        c.apply(GestureAction::EndScrub);
        assert_eq!(c.playback(), PlaybackState::AutoPlaying);
        assert_eq!(c.target().frame, 0.0);
    }

    #[test]
    fn test_zoom_stays_in_bounds() {
        let mut c = pier(838);
        for _ in 0..20 {
            c.zoom_out();
        }
        assert_eq!(c.target_zoom(), 4.0);
        for _ in 0..20 {
            c.zoom_in();
        }
        assert_eq!(c.target_zoom(), 1.2);

        for delta in [1e9, -1e9, 0.37, -0.0001, 12.0, -3.3] {
            c.apply(GestureAction::ZoomBy(delta));
            assert!((1.2..=4.0).contains(&c.target_zoom()), "{}", c.target_zoom());
        }
    }

    #[test]
    fn test_non_finite_deltas_leave_target_alone() {
        let mut c = pier(838);
        for delta in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            c.apply(GestureAction::ZoomBy(delta));
            assert_eq!(c.target_zoom(), 2.0);
        }
        c.zoom_out();
        assert!((c.target_zoom() - 2.4).abs() < 1e-12);

        c.apply(GestureAction::BeginScrub);
        c.apply(GestureAction::ScrubBy(7.0));
        c.apply(GestureAction::ScrubBy(f64::NAN));
        c.apply(GestureAction::ScrubBy(f64::INFINITY));
        assert_eq!(c.target().frame, 7.0);
        c.apply(GestureAction::ScrubBy(-2.0));
        assert_eq!(c.target().frame, 5.0);
    }

    #[test]
    fn test_playback_changed_events() {
        let bus = EventBus::new();
        let mut c = pier(838).with_events(bus.emitter());
        c.play();
        c.play();
        c.stop();

        let changes: Vec<_> = bus
            .poll()
            .iter()
            .filter_map(|e| downcast_event::<PlaybackChanged>(e).copied())
            .collect();
        assert_eq!(
            changes,
            vec![
                PlaybackChanged {
                    from: PlaybackState::Idle,
                    to: PlaybackState::AutoPlaying
                },
                PlaybackChanged {
                    from: PlaybackState::AutoPlaying,
                    to: PlaybackState::Idle
                },
            ]
        );
    }
}
