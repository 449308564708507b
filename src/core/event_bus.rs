//! Pub/sub bus for engine diagnostics.
//!
//! The engine reports load failures, tick faults, unknown sections and
//! playback changes here. Hosts either subscribe (callback runs inside
//! `emit`, possibly on a loader thread) or `poll()` the queue once per frame.
//!
//! Callback order is FIFO within one event type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use log::warn;

/// Queue length at which the oldest half is dropped
const MAX_QUEUE_SIZE: usize = 1000;

/// Marker trait for events
pub trait Event: Any + Send + Sync + 'static {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync + 'static> Event for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

type Callback = Arc<dyn Fn(&dyn Any) + Send + Sync>;

/// Boxed event as stored in the queue
pub type BoxedEvent = Box<dyn Event>;

#[derive(Default)]
struct Shared {
    subscribers: RwLock<HashMap<TypeId, Vec<Callback>>>,
    queue: Mutex<Vec<BoxedEvent>>,
}

impl Shared {
    fn emit<E: Event>(&self, event: E) {
        let type_id = TypeId::of::<E>();

        if let Some(cbs) = self.subscribers.read().unwrap_or_else(|e| e.into_inner()).get(&type_id) {
            for cb in cbs {
                cb(&event);
            }
        }

        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= MAX_QUEUE_SIZE {
            let evict_count = queue.len() / 2;
            warn!("EventBus queue full ({} events), evicting oldest {}", queue.len(), evict_count);
            queue.drain(0..evict_count);
        }
        queue.push(Box::new(event));
    }
}

/// Owning side of the bus: subscribe, poll, clear.
#[derive(Clone, Default)]
pub struct EventBus {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("queue_len", &self.queue_len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events of type `E`.
    pub fn subscribe<E, F>(&self, callback: F)
    where
        E: Event,
        F: Fn(&E) + Send + Sync + 'static,
    {
        let wrapped: Callback = Arc::new(move |any: &dyn Any| {
            if let Some(event) = any.downcast_ref::<E>() {
                callback(event);
            }
        });
        self.shared
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(TypeId::of::<E>())
            .or_default()
            .push(wrapped);
    }

    /// Invoke subscribers of `E` and queue the event for `poll()`
    pub fn emit<E: Event>(&self, event: E) {
        self.shared.emit(event);
    }

    /// Take all queued events
    pub fn poll(&self) -> Vec<BoxedEvent> {
        std::mem::take(&mut *self.shared.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Emit-only handle for loader threads and components
    pub fn emitter(&self) -> EventEmitter {
        EventEmitter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Drop all subscribers of `E`
    pub fn unsubscribe_all<E: Event>(&self) {
        self.shared
            .subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&TypeId::of::<E>());
    }

    /// Drop every subscriber and the queue
    pub fn clear(&self) {
        self.shared.subscribers.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.shared.queue.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Cloneable emit-only handle
#[derive(Clone)]
pub struct EventEmitter {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EventEmitter")
    }
}

impl EventEmitter {
    pub fn emit<E: Event>(&self, event: E) {
        self.shared.emit(event);
    }
}

/// Downcast a queued event.
///
/// Derefs to `dyn Event` first; calling `as_any()` on the `Box` itself would
/// hit the blanket impl and yield the box, not the event.
#[inline]
pub fn downcast_event<E: Event>(event: &BoxedEvent) -> Option<&E> {
    (**event).as_any().downcast_ref::<E>()
}
