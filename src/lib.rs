//! framescrub - frame-sequence scrubbing engine
//!
//! Turns a pre-rendered image sequence into a navigable pseudo-3D view:
//! gestures and buttons steer a target frame and camera distance, a
//! smoothing integrator follows it, and a render loop shows the nearest
//! loaded frame.

// Core engine (cache, gestures, motion, controller, render loop)
pub mod core;

pub mod cli;
pub mod config;
pub mod point_cloud;
pub mod runner;

// Re-export commonly used types from core
pub use config::SceneConfig;
pub use crate::core::engine::{EngineSnapshot, ScrubEngine};
pub use crate::core::error::{ConfigError, LoadError, ScrubError, SurfaceError};
pub use crate::core::event_bus::{downcast_event, BoxedEvent, EventBus, EventEmitter};
pub use crate::core::gesture::PointerEvent;
pub use crate::core::loader::{ImageLoader, ResourceLoader, Texture};
pub use crate::core::render::{PlaneTransform, RenderSurface, TickOutcome};
pub use point_cloud::{image_to_point_cloud, write_ply, PointCloud, PointCloudParams};
