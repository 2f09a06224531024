//! Reuse pool for decoded events.
//!
//! Decoding runs on every read of every open device, so events are recycled
//! through a bounded lock-free free list instead of being allocated per
//! record. The pool holds no identity: a released event may be handed to any
//! later decode, from any device.

use std::sync::LazyLock;

use crossbeam::queue::ArrayQueue;

use crate::event::{Event, EventBatch};

/// Free-list capacity of the process-wide pool.
pub const DEFAULT_POOL_CAPACITY: usize = 4096;

static GLOBAL: LazyLock<EventPool> = LazyLock::new(|| EventPool::with_capacity(DEFAULT_POOL_CAPACITY));

/// The pool backing [`crate::decode`] and [`crate::release`].
pub fn global() -> &'static EventPool {
    &GLOBAL
}

#[derive(Debug)]
pub struct EventPool {
    free: ArrayQueue<Box<Event>>,
}

impl EventPool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            free: ArrayQueue::new(capacity.max(1)),
        }
    }

    /// Take an idle event, allocating only when the free list is empty.
    /// Field contents are whatever the previous user left behind.
    pub fn acquire(&self) -> Box<Event> {
        self.free.pop().unwrap_or_default()
    }

    /// Return one event. When the free list is full the event is dropped.
    pub fn release(&self, event: Box<Event>) {
        // Err hands the event back when full; dropping it frees the box.
        drop(self.free.push(event));
    }

    pub fn release_batch(&self, batch: EventBatch) {
        for event in batch {
            self.release(event);
        }
    }

    /// Number of events currently waiting for reuse.
    pub fn idle(&self) -> usize {
        self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.free.capacity()
    }
}
