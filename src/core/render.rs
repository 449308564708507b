//! Tick-driven render loop
//!
//! One `tick()` per display refresh:
//!
//! 1. advance motion toward the controller's target
//! 2. round and wrap the position into a display index
//! 3. request that frame (and neighbours, for lazy loading)
//! 4. swap the surface resource if a different frame became Ready
//! 5. set camera distance, draw once
//!
//! A frame that is not Ready leaves the previous one on screen. Panics and
//! surface errors stay inside the tick: they are logged, published as
//! `TickFault`, and the next tick runs as usual.

use glam::Vec2;
use log::{debug, info, trace, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::cache::{ResourceCache, ResourceSlot};
use super::controller::{PlaybackState, ScrubTarget};
use super::error::{ScrubError, SurfaceError};
use super::event_bus::EventEmitter;
use super::events::TickFault;
use super::frame::FrameIndex;
use super::loader::ResourceLoader;
use super::motion::{MotionIntegrator, ScrubCurrent};

/// Size of the textured plane the frame is mapped onto
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneTransform {
    pub size: Vec2,
}

impl Default for PlaneTransform {
    fn default() -> Self {
        Self {
            size: Vec2::new(1.6, 1.0),
        }
    }
}

impl PlaneTransform {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            size: Vec2::new(width, height),
        }
    }
}

/// The drawable the engine renders into (window, canvas, GPU texture quad...)
pub trait RenderSurface<R> {
    /// Show `resource` on the plane
    fn set_resource(&mut self, resource: &R, plane: PlaneTransform);
    /// The shown resource changed and must be re-uploaded
    fn mark_dirty(&mut self);
    fn set_camera_distance(&mut self, distance: f64);
    fn draw(&mut self) -> Result<(), SurfaceError>;
    /// Free GPU/window resources. Called once, after the last draw.
    fn release(&mut self);
}

impl<R, S: RenderSurface<R> + ?Sized> RenderSurface<R> for Box<S> {
    fn set_resource(&mut self, resource: &R, plane: PlaneTransform) {
        (**self).set_resource(resource, plane)
    }
    fn mark_dirty(&mut self) {
        (**self).mark_dirty()
    }
    fn set_camera_distance(&mut self, distance: f64) {
        (**self).set_camera_distance(distance)
    }
    fn draw(&mut self) -> Result<(), SurfaceError> {
        (**self).draw()
    }
    fn release(&mut self) {
        (**self).release()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    /// Terminal: no further ticks, surface released
    Stopped,
}

/// Result of one `tick()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Drawn {
        /// Index computed from the motion state this tick
        displayed: FrameIndex,
        /// Frame whose resource is on the surface (None until the first Ready)
        shown: Option<FrameIndex>,
    },
    Faulted,
    Stopped,
}

pub struct RenderLoop<L: ResourceLoader, S: RenderSurface<L::Resource>> {
    cache: Arc<ResourceCache<L>>,
    motion: MotionIntegrator,
    surface: S,
    plane: PlaneTransform,
    total_frames: usize,
    displayed: FrameIndex,
    shown: Option<FrameIndex>,
    state: LoopState,
    ticks: u64,
    faults: u64,
    events: Option<EventEmitter>,
}

impl<L: ResourceLoader, S: RenderSurface<L::Resource>> std::fmt::Debug for RenderLoop<L, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderLoop")
            .field("state", &self.state)
            .field("ticks", &self.ticks)
            .field("displayed", &self.displayed)
            .field("shown", &self.shown)
            .finish()
    }
}

impl<L: ResourceLoader, S: RenderSurface<L::Resource>> RenderLoop<L, S> {
    pub fn new(
        cache: Arc<ResourceCache<L>>,
        motion: MotionIntegrator,
        surface: S,
        plane: PlaneTransform,
    ) -> Self {
        let total_frames = cache.total_frames();
        let displayed = motion.current().display_frame(total_frames);
        Self {
            cache,
            motion,
            surface,
            plane,
            total_frames,
            displayed,
            shown: None,
            state: LoopState::Running,
            ticks: 0,
            faults: 0,
            events: None,
        }
    }

    /// Publish tick faults on this emitter
    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn current(&self) -> ScrubCurrent {
        self.motion.current()
    }

    pub fn displayed_frame(&self) -> FrameIndex {
        self.displayed
    }

    pub fn shown_frame(&self) -> Option<FrameIndex> {
        self.shown
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn faults(&self) -> u64 {
        self.faults
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn tick(&mut self, target: ScrubTarget, playback: PlaybackState) -> TickOutcome {
        if self.state == LoopState::Stopped {
            return TickOutcome::Stopped;
        }
        self.ticks += 1;
        let tick = self.ticks;

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.step(target, playback)));
        match result {
            Ok(Ok(displayed)) => TickOutcome::Drawn {
                displayed,
                shown: self.shown,
            },
            Ok(Err(e)) => self.fault(tick, ScrubError::Surface(e)),
            Err(payload) => self.fault(tick, ScrubError::TickPanic(panic_message(payload.as_ref()))),
        }
    }

    fn step(&mut self, target: ScrubTarget, playback: PlaybackState) -> Result<FrameIndex, SurfaceError> {
        let current = self.motion.advance(target, playback);
        let index = current.display_frame(self.total_frames);
        self.displayed = index;

        self.cache.request(index);
        self.cache.prefetch_around(index);

        if self.shown != Some(index) {
            if let ResourceSlot::Ready(resource) = self.cache.peek(index) {
                trace!("Swap resource {:?} -> {}", self.shown, index);
                self.surface.set_resource(&resource, self.plane);
                self.surface.mark_dirty();
                self.shown = Some(index);
            }
        }

        self.surface.set_camera_distance(current.zoom);
        self.surface.draw()?;
        trace!(
            "Tick {}: frame={:.3} zoom={:.3} displayed={} shown={:?}",
            self.ticks, current.frame, current.zoom, index, self.shown
        );
        Ok(index)
    }

    fn fault(&mut self, tick: u64, error: ScrubError) -> TickOutcome {
        self.faults += 1;
        warn!("Tick {} fault: {}", tick, error);
        if let Some(events) = &self.events {
            events.emit(TickFault { tick, error });
        }
        TickOutcome::Faulted
    }

    /// Stop ticking, then release the surface. Idempotent.
    pub fn shutdown(&mut self) {
        if self.state == LoopState::Stopped {
            return;
        }
        self.state = LoopState::Stopped;
        debug!("Render loop stopped after {} ticks ({} faults)", self.ticks, self.faults);
        self.surface.release();
        info!("Render surface released");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::LoadPolicy;
    use crate::core::error::LoadError;
    use crate::core::event_bus::{downcast_event, EventBus};
    use crate::core::frame::FramePathTemplate;
    use crate::core::motion::MotionParams;
    use crate::core::workers::InlineExecutor;
    use std::path::Path;

    /// Resource = frame file name; frames listed in `missing` fail
    struct NameLoader {
        missing: Vec<String>,
    }

    impl ResourceLoader for NameLoader {
        type Resource = String;

        fn load(&self, path: &Path) -> Result<String, LoadError> {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            if self.missing.contains(&name) {
                Err(LoadError::NotFound(path.to_path_buf()))
            } else {
                Ok(name)
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        set: Vec<String>,
        dirty: usize,
        draws: usize,
        distance: f64,
        released: usize,
        fail_draw_at: Option<usize>,
        panic_draw_at: Option<usize>,
    }

    impl RenderSurface<String> for Recorder {
        fn set_resource(&mut self, resource: &String, _plane: PlaneTransform) {
            self.set.push(resource.clone());
        }
        fn mark_dirty(&mut self) {
            self.dirty += 1;
        }
        fn set_camera_distance(&mut self, distance: f64) {
            self.distance = distance;
        }
        fn draw(&mut self) -> Result<(), SurfaceError> {
            self.draws += 1;
            if self.panic_draw_at == Some(self.draws) {
                panic!("driver lost");
            }
            if self.fail_draw_at == Some(self.draws) {
                return Err(SurfaceError("context lost".into()));
            }
            Ok(())
        }
        fn release(&mut self) {
            self.released += 1;
        }
    }

    fn template() -> FramePathTemplate {
        FramePathTemplate {
            dir: "f".into(),
            prefix: "f".into(),
            padding: 2,
            first_number: 0,
            extension: "png".into(),
        }
    }

    fn make(total: usize, missing: &[&str], policy: LoadPolicy, start: f64) -> RenderLoop<NameLoader, Recorder> {
        let loader = NameLoader {
            missing: missing.iter().map(|s| s.to_string()).collect(),
        };
        let cache = Arc::new(ResourceCache::new(
            total,
            template(),
            Arc::new(loader),
            Arc::new(InlineExecutor),
            policy,
        ));
        cache.warm();
        let motion = MotionIntegrator::new(
            ScrubCurrent { frame: start, zoom: 2.0 },
            MotionParams {
                alpha_frame: 0.5,
                alpha_zoom: 0.5,
                play_speed: 1.0,
            },
        );
        RenderLoop::new(cache, motion, Recorder::default(), PlaneTransform::default())
    }

    #[test]
    fn test_swap_only_on_change() {
        let mut rl = make(10, &[], LoadPolicy::Eager, 3.0);
        let target = ScrubTarget { frame: 3.0, zoom: 2.0 };
        for _ in 0..5 {
            let out = rl.tick(target, PlaybackState::Idle);
            assert_eq!(out, TickOutcome::Drawn { displayed: 3, shown: Some(3) });
        }
        assert_eq!(rl.surface().set, vec!["f03.png"]);
        assert_eq!(rl.surface().dirty, 1);
        assert_eq!(rl.surface().draws, 5);
    }

    #[test]
    fn test_autoplay_wraps_and_swaps() {
        let mut rl = make(4, &[], LoadPolicy::Eager, 2.0);
        let target = ScrubTarget { frame: 0.0, zoom: 3.0 };
        let shown: Vec<_> = (0..4)
            .map(|_| match rl.tick(target, PlaybackState::AutoPlaying) {
                TickOutcome::Drawn { displayed, .. } => displayed,
                other => panic!("{:?}", other),
            })
            .collect();
        assert_eq!(shown, vec![3, 0, 1, 2]);
        assert_eq!(rl.surface().set, vec!["f03.png", "f00.png", "f01.png", "f02.png"]);
        // zoom smoothed halfway toward 3.0 each tick
        assert!(rl.surface().distance > 2.9 && rl.surface().distance < 3.0);
    }

    #[test]
    fn test_failed_frame_keeps_last_good() {
        let mut rl = make(10, &["f04.png"], LoadPolicy::Eager, 3.0);
        rl.tick(ScrubTarget { frame: 3.0, zoom: 2.0 }, PlaybackState::Idle);
        let out = rl.tick(ScrubTarget { frame: 5.0, zoom: 2.0 }, PlaybackState::Idle);
        // 3 + (5 - 3) * 0.5 = 4: failed, so 3 stays on screen
        assert_eq!(out, TickOutcome::Drawn { displayed: 4, shown: Some(3) });
        assert_eq!(rl.surface().set, vec!["f03.png"]);
    }

    #[test]
    fn test_lazy_requests_neighbours() {
        let mut rl = make(20, &[], LoadPolicy::Lazy { radius: 2 }, 10.0);
        rl.tick(ScrubTarget { frame: 10.0, zoom: 2.0 }, PlaybackState::Idle);
        let stats = rl.cache.stats();
        assert_eq!(stats.ready, 5);
        assert_eq!(stats.not_requested, 15);
        assert_eq!(rl.shown_frame(), Some(10));
    }

    #[test]
    fn test_surface_error_is_contained() {
        let bus = EventBus::new();
        let mut rl = make(5, &[], LoadPolicy::Eager, 0.0).with_events(bus.emitter());
        rl.surface.fail_draw_at = Some(2);
        let target = ScrubTarget { frame: 0.0, zoom: 2.0 };

        assert!(matches!(rl.tick(target, PlaybackState::Idle), TickOutcome::Drawn { .. }));
        assert_eq!(rl.tick(target, PlaybackState::Idle), TickOutcome::Faulted);
        assert!(matches!(rl.tick(target, PlaybackState::Idle), TickOutcome::Drawn { .. }));
        assert_eq!(rl.faults(), 1);

        let events = bus.poll();
        let fault = events.iter().find_map(downcast_event::<TickFault>).unwrap();
        assert_eq!(fault.tick, 2);
        assert_eq!(fault.error, ScrubError::Surface(SurfaceError("context lost".into())));
    }

    #[test]
    fn test_panic_is_contained() {
        let bus = EventBus::new();
        let mut rl = make(5, &[], LoadPolicy::Eager, 0.0).with_events(bus.emitter());
        rl.surface.panic_draw_at = Some(1);
        let target = ScrubTarget { frame: 0.0, zoom: 2.0 };
        assert_eq!(rl.tick(target, PlaybackState::Idle), TickOutcome::Faulted);
        assert!(matches!(rl.tick(target, PlaybackState::Idle), TickOutcome::Drawn { .. }));
        assert_eq!(rl.ticks(), 2);

        let events = bus.poll();
        let fault = events.iter().find_map(downcast_event::<TickFault>).unwrap();
        assert_eq!(fault.tick, 1);
        assert!(matches!(fault.error, ScrubError::TickPanic(_)), "{:?}", fault.error);
    }

    #[test]
    fn test_shutdown_releases_once() {
        let mut rl = make(5, &[], LoadPolicy::Eager, 0.0);
        rl.shutdown();
        rl.shutdown();
        assert_eq!(rl.state(), LoopState::Stopped);
        assert_eq!(rl.surface().released, 1);
        let draws = rl.surface().draws;
        assert_eq!(rl.tick(ScrubTarget::default(), PlaybackState::Idle), TickOutcome::Stopped);
        assert_eq!(rl.surface().draws, draws);
    }
}
