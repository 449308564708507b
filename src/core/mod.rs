//! Core engine modules - cache, gestures, motion, controller, render loop
//!
//! These modules form the scrubbing engine, independent of any window or GPU.

pub mod cache;
pub mod controller;
pub mod engine;
pub mod error;
pub mod event_bus;
pub mod events;
pub mod frame;
pub mod gesture;
pub mod loader;
pub mod motion;
pub mod render;
pub mod sections;
pub mod workers;

// Re-exports for convenience
pub use cache::{CacheStats, LoadPolicy, ResourceCache, ResourceSlot};
pub use controller::{PlaybackState, ScrubController, ScrubTarget, ZoomRange};
pub use engine::{EngineSnapshot, ScrubEngine};
pub use error::{ConfigError, LoadError, ScrubError, SurfaceError};
pub use event_bus::{downcast_event, BoxedEvent, EventBus, EventEmitter};
pub use events::{PlaybackChanged, ResourceFailed, TickFault, UnknownSection};
pub use frame::{display_frame, wrap_frame, FrameIndex, FramePathTemplate};
pub use gesture::{EventResponse, GestureAction, GestureTranslator, PointerEvent};
pub use loader::{ImageLoader, ResourceLoader, Texture};
pub use motion::{integrate, MotionIntegrator, MotionParams, ScrubCurrent};
pub use render::{LoopState, PlaneTransform, RenderLoop, RenderSurface, TickOutcome};
pub use sections::SectionMap;
pub use workers::{InlineExecutor, LoadExecutor, Workers};
