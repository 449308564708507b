//! Per-frame resource slots with asynchronous fill
//!
//! Every frame index owns one `ResourceSlot`:
//!
//! ```text
//! NotRequested -> Loading -> Ready(resource)
//!                         \-> Failed
//! ```
//!
//! Terminal states never change. A failed frame is not retried; the render
//! loop keeps showing the last good frame instead.
//!
//! # Atomic claiming
//!
//! `request()` flips NotRequested -> Loading under the slot mutex before the
//! job is spawned, so only one load is ever issued per index no matter how
//! many times it is requested.
//!
//! # Policies
//!
//! - `Eager`: every index is requested when the engine starts.
//! - `Lazy { radius }`: each tick requests the displayed frame and its
//!   neighbours in spiral order (0, +1, -1, +2, -2, ...), wrapping around.

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::event_bus::EventEmitter;
use super::events::ResourceFailed;
use super::frame::{wrap_frame, FrameIndex, FramePathTemplate};
use super::loader::ResourceLoader;
use super::workers::LoadExecutor;

/// Load state of one frame
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceSlot<R> {
    NotRequested,
    Loading,
    Ready(R),
    Failed,
}

impl<R> ResourceSlot<R> {
    pub fn is_ready(&self) -> bool {
        matches!(self, ResourceSlot::Ready(_))
    }

    /// Ready or Failed
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResourceSlot::Ready(_) | ResourceSlot::Failed)
    }
}

/// When frames are requested
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Request every frame at start
    #[default]
    Eager,
    /// Request frames within `radius` of the displayed frame
    Lazy { radius: usize },
}

/// Slot counts for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub not_requested: usize,
    pub loading: usize,
    pub ready: usize,
    pub failed: usize,
    /// Loads handed to the executor since start
    pub loads_issued: u64,
}

impl CacheStats {
    pub fn total(&self) -> usize {
        self.not_requested + self.loading + self.ready + self.failed
    }

    /// Fraction of terminal slots (0.0-1.0)
    pub fn settled_fraction(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.ready + self.failed) as f64 / total as f64
        }
    }
}

type Slots<R> = Arc<Mutex<Vec<ResourceSlot<R>>>>;

/// Frame index -> loaded resource, filled on a `LoadExecutor`.
pub struct ResourceCache<L: ResourceLoader> {
    slots: Slots<L::Resource>,
    template: FramePathTemplate,
    loader: Arc<L>,
    executor: Arc<dyn LoadExecutor>,
    policy: LoadPolicy,
    loads_issued: AtomicU64,
    events: Option<EventEmitter>,
}

impl<L: ResourceLoader> std::fmt::Debug for ResourceCache<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceCache")
            .field("total_frames", &self.total_frames())
            .field("policy", &self.policy)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<L: ResourceLoader> ResourceCache<L> {
    /// Create a cache with `total_frames` NotRequested slots.
    ///
    /// Nothing is requested yet; call `warm()` to apply the policy.
    pub fn new(
        total_frames: usize,
        template: FramePathTemplate,
        loader: Arc<L>,
        executor: Arc<dyn LoadExecutor>,
        policy: LoadPolicy,
    ) -> Self {
        debug!(
            "ResourceCache created: {} slots, policy={:?}, dir={}",
            total_frames,
            policy,
            template.dir.display()
        );
        let slots = (0..total_frames).map(|_| ResourceSlot::NotRequested).collect();
        Self {
            slots: Arc::new(Mutex::new(slots)),
            template,
            loader,
            executor,
            policy,
            loads_issued: AtomicU64::new(0),
            events: None,
        }
    }

    /// Report load failures on this emitter
    pub fn with_events(mut self, events: EventEmitter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn total_frames(&self) -> usize {
        self.lock().len()
    }

    pub fn policy(&self) -> LoadPolicy {
        self.policy
    }

    pub fn template(&self) -> &FramePathTemplate {
        &self.template
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ResourceSlot<L::Resource>>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply the start-up part of the policy (Eager requests everything)
    pub fn warm(&self) {
        if self.policy == LoadPolicy::Eager {
            let total = self.total_frames();
            debug!("Eager load: requesting {} frames", total);
            for index in 0..total {
                self.request(index);
            }
        }
    }

    /// Per-tick part of the policy (Lazy requests around `center`)
    pub fn prefetch_around(&self, center: FrameIndex) {
        if let LoadPolicy::Lazy { radius } = self.policy {
            for index in spiral(center, radius, self.total_frames()) {
                self.request(index);
            }
        }
    }

    /// Issue a load for `index` unless one was already issued.
    ///
    /// No-op while Loading, Ready or Failed. Out-of-range indices are ignored.
    pub fn request(&self, index: FrameIndex) {
        {
            let mut slots = self.lock();
            let Some(slot) = slots.get_mut(index) else {
                warn!("Frame {} requested outside 0..{}", index, slots.len());
                return;
            };
            if !matches!(slot, ResourceSlot::NotRequested) {
                return;
            }
            *slot = ResourceSlot::Loading;
        } // release before spawning: inline executors complete inside spawn()

        self.loads_issued.fetch_add(1, Ordering::Relaxed);

        let path = self.template.path(index);
        let slots = Arc::clone(&self.slots);
        let loader = Arc::clone(&self.loader);
        let events = self.events.clone();

        trace!("Loading frame {}: {}", index, path.display());
        self.executor.spawn(Box::new(move || {
            let result = loader.load(&path);
            let mut slots = slots.lock().unwrap_or_else(|e| e.into_inner());
            let Some(slot) = slots.get_mut(index) else {
                return;
            };
            if !matches!(slot, ResourceSlot::Loading) {
                return;
            }
            match result {
                Ok(resource) => {
                    *slot = ResourceSlot::Ready(resource);
                    trace!("Frame {} ready", index);
                }
                Err(reason) => {
                    *slot = ResourceSlot::Failed;
                    drop(slots);
                    warn!("Frame {} failed to load ({}): {}", index, path.display(), reason);
                    if let Some(events) = events {
                        events.emit(ResourceFailed {
                            index,
                            path,
                            reason,
                        });
                    }
                }
            }
        }));
    }

    /// Current slot for `index` (NotRequested when out of range)
    pub fn peek(&self, index: FrameIndex) -> ResourceSlot<L::Resource> {
        self.lock()
            .get(index)
            .cloned()
            .unwrap_or(ResourceSlot::NotRequested)
    }

    pub fn is_ready(&self, index: FrameIndex) -> bool {
        self.lock().get(index).is_some_and(ResourceSlot::is_ready)
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            loads_issued: self.loads_issued.load(Ordering::Relaxed),
            ..CacheStats::default()
        };
        for slot in self.lock().iter() {
            match slot {
                ResourceSlot::NotRequested => stats.not_requested += 1,
                ResourceSlot::Loading => stats.loading += 1,
                ResourceSlot::Ready(_) => stats.ready += 1,
                ResourceSlot::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

/// Indices around `center` nearest first: center, +1, -1, +2, -2, ...
///
/// Wraps around the sequence and never yields an index twice.
pub fn spiral(center: FrameIndex, radius: usize, total_frames: usize) -> Vec<FrameIndex> {
    if total_frames == 0 {
        return Vec::new();
    }
    // Past half the sequence the two arms would meet
    let radius = radius.min(total_frames / 2);
    let mut out = Vec::with_capacity(2 * radius + 1);
    let center = center as i64;
    out.push(wrap_frame(center, total_frames));
    for step in 1..=radius {
        let k = step as i64;
        out.push(wrap_frame(center + k, total_frames));
        // On even lengths the last step reaches the opposite frame from both sides
        if 2 * step != total_frames {
            out.push(wrap_frame(center - k, total_frames));
        }
    }
    out
}
