//! The scrubbing engine as offered to a host
//!
//! `ScrubEngine` owns every component and is the only thing a host talks
//! to: intents from buttons, raw pointer events, one `tick()` per refresh.
//!
//! # Lifecycle
//!
//! `new()` validates the scene, wires the components and issues eager
//! loads. `teardown()` (or `Drop`) releases in a fixed order:
//!
//! 1. detach gesture input (later events are ignored)
//! 2. stop the render loop (later ticks return `Stopped`)
//! 3. release the surface

use log::{debug, info};
use std::sync::Arc;

use super::cache::{CacheStats, ResourceCache};
use super::controller::{PlaybackState, ScrubController};
use super::error::ScrubError;
use super::event_bus::EventBus;
use super::frame::FrameIndex;
use super::gesture::{EventResponse, GestureTranslator, PointerEvent};
use super::loader::ResourceLoader;
use super::motion::{MotionIntegrator, ScrubCurrent};
use super::render::{LoopState, RenderLoop, RenderSurface, TickOutcome};
use super::sections::SectionMap;
use super::workers::LoadExecutor;
use crate::config::SceneConfig;

/// Read-only view for hosts and tests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSnapshot {
    pub displayed_frame: FrameIndex,
    pub current_frame: f64,
    pub current_zoom: f64,
    pub target_frame: f64,
    pub target_zoom: f64,
    pub playback: PlaybackState,
    /// Frame whose resource is on the surface
    pub shown_frame: Option<FrameIndex>,
    pub running: bool,
}

pub struct ScrubEngine<L: ResourceLoader, S: RenderSurface<L::Resource>> {
    controller: ScrubController,
    gestures: Option<GestureTranslator>,
    render: RenderLoop<L, S>,
    cache: Arc<ResourceCache<L>>,
    events: EventBus,
}

impl<L: ResourceLoader, S: RenderSurface<L::Resource>> std::fmt::Debug for ScrubEngine<L, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrubEngine")
            .field("controller", &self.controller)
            .field("render", &self.render)
            .field("cache", &self.cache)
            .finish()
    }
}

impl<L: ResourceLoader, S: RenderSurface<L::Resource>> ScrubEngine<L, S> {
    /// Build every component from `config` and issue the initial loads.
    ///
    /// Fails only on invalid configuration.
    pub fn new(
        config: &SceneConfig,
        loader: L,
        executor: Arc<dyn LoadExecutor>,
        surface: S,
    ) -> Result<Self, ScrubError> {
        config.validate()?;
        let sections: SectionMap = config.section_map()?;
        let events = EventBus::new();

        let cache = Arc::new(
            ResourceCache::new(
                config.total_frames,
                config.frames.clone(),
                Arc::new(loader),
                executor,
                config.load_policy,
            )
            .with_events(events.emitter()),
        );

        let controller = ScrubController::new(
            config.total_frames,
            config.zoom_range(),
            config.initial_zoom,
            config.end_offset,
            sections,
        )
        .with_events(events.emitter());

        // Current starts on the target: nothing moves until an intent arrives
        let target = controller.target();
        let motion = MotionIntegrator::new(
            ScrubCurrent {
                frame: target.frame,
                zoom: target.zoom,
            },
            config.motion_params(),
        );

        let render = RenderLoop::new(Arc::clone(&cache), motion, surface, config.plane())
            .with_events(events.emitter());

        let gestures = GestureTranslator::new(config.sensitivity_divisor, config.wheel_zoom_factor);

        cache.warm();
        info!(
            "Engine started: scene '{}', {} frames, policy {:?}",
            config.name, config.total_frames, config.load_policy
        );

        Ok(Self {
            controller,
            gestures: Some(gestures),
            render,
            cache,
            events,
        })
    }

    pub fn start(&mut self) {
        self.controller.start();
    }

    pub fn middle(&mut self) {
        self.controller.middle();
    }

    pub fn end(&mut self) {
        self.controller.end();
    }

    pub fn play(&mut self) {
        self.controller.play();
    }

    pub fn stop(&mut self) {
        self.controller.stop();
    }

    pub fn zoom_in(&mut self) {
        self.controller.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.controller.zoom_out();
    }

    pub fn go_to(&mut self, name: &str) {
        self.controller.go_to(name);
    }

    /// Feed one pointer event. Ignored after teardown.
    pub fn handle_gesture(&mut self, event: PointerEvent) -> EventResponse {
        let Some(gestures) = self.gestures.as_mut() else {
            return EventResponse::default();
        };
        let (action, response) = gestures.translate(event);
        if let Some(action) = action {
            self.controller.apply(action);
        }
        response
    }

    /// Advance one display refresh. Never panics, never returns an error.
    pub fn tick(&mut self) -> TickOutcome {
        self.render.tick(self.controller.target(), self.controller.playback())
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        let current = self.render.current();
        let target = self.controller.target();
        EngineSnapshot {
            displayed_frame: self.render.displayed_frame(),
            current_frame: current.frame,
            current_zoom: current.zoom,
            target_frame: target.frame,
            target_zoom: target.zoom,
            playback: self.controller.playback(),
            shown_frame: self.render.shown_frame(),
            running: self.render.state() == LoopState::Running,
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Diagnostics bus: `ResourceFailed`, `TickFault`, `UnknownSection`, `PlaybackChanged`
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn sections(&self) -> &SectionMap {
        self.controller.sections()
    }

    pub fn total_frames(&self) -> usize {
        self.controller.total_frames()
    }

    pub fn ticks(&self) -> u64 {
        self.render.ticks()
    }

    pub fn surface(&self) -> &S {
        self.render.surface()
    }

    pub fn is_running(&self) -> bool {
        self.render.state() == LoopState::Running
    }

    /// Detach input, stop ticking, release the surface. Idempotent.
    pub fn teardown(&mut self) {
        if self.gestures.take().is_some() {
            debug!("Gesture input detached");
        }
        if self.render.state() == LoopState::Running {
            self.render.shutdown();
            info!("Engine torn down after {} ticks", self.render.ticks());
        }
    }
}

impl<L: ResourceLoader, S: RenderSurface<L::Resource>> Drop for ScrubEngine<L, S> {
    fn drop(&mut self) {
        self.teardown();
    }
}
