//! Render queue ordered by priority, then arrival.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use super::Priority;
use crate::tile::CacheKey;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn next_sequence() -> u64 {
    SEQUENCE.fetch_add(1, AtomicOrdering::Relaxed)
}

/// A pointer to one run of a slot.
///
/// The entry is stale once the slot's `run_id` moves on; workers drop
/// stale entries when they pop them.
#[derive(Debug, Clone)]
pub(crate) struct QueuedRender {
    pub key: CacheKey,
    pub slot_id: u64,
    pub run_id: u64,
    pub priority: Priority,
    sequence: u64,
}

impl QueuedRender {
    pub fn new(key: CacheKey, slot_id: u64, run_id: u64, priority: Priority) -> Self {
        Self {
            key,
            slot_id,
            run_id,
            priority,
            sequence: next_sequence(),
        }
    }
}

impl PartialEq for QueuedRender {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for QueuedRender {}

impl PartialOrd for QueuedRender {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedRender {
    fn cmp(&self, other: &Self) -> Ordering {
        // max-heap: higher priority first, then the older sequence
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Debug, Default)]
pub(crate) struct RenderQueue {
    heap: BinaryHeap<QueuedRender>,
}

impl RenderQueue {
    pub fn push(&mut self, job: QueuedRender) {
        self.heap.push(job);
    }

    pub fn pop(&mut self) -> Option<QueuedRender> {
        self.heap.pop()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
