use std::sync::Arc;
use std::time::Instant;

use tokio::sync::oneshot;

use super::Priority;
use crate::render::{RenderError, RenderSpec};
use crate::tile::TileBlob;

/// Final result delivered to every waiter of a render.
pub type RenderOutcome = Result<TileBlob, RenderError>;

/// Builds the render spec for one attempt.
pub type SpecFactory = Arc<dyn Fn() -> RenderSpec + Send + Sync>;

/// Lifecycle position of an active slot. An idle key has no slot at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotState {
    /// Waiting in the queue, possibly behind a retry delay.
    Queued,
    Rendering { started_at: Instant },
}

/// Per-key render state shared by every waiter.
pub(crate) struct RenderSlot {
    /// Identity of this slot. A later slot for the same key gets a new id.
    pub slot_id: u64,
    /// Current run. Queue entries and failures of other runs are ignored.
    pub run_id: u64,
    pub state: SlotState,
    pub priority: Priority,
    /// Attempts started so far.
    pub attempt: u32,
    pub factory: SpecFactory,
    pub waiters: Vec<oneshot::Sender<RenderOutcome>>,
    pub last_error: Option<RenderError>,
}

impl RenderSlot {
    pub fn new(
        slot_id: u64,
        priority: Priority,
        factory: SpecFactory,
        waiter: oneshot::Sender<RenderOutcome>,
    ) -> Self {
        Self {
            slot_id,
            run_id: slot_id,
            state: SlotState::Queued,
            priority,
            attempt: 0,
            factory,
            waiters: vec![waiter],
            last_error: None,
        }
    }

    /// Sends `outcome` to every waiter. Waiters that went away are skipped.
    pub fn resolve(self, outcome: RenderOutcome) {
        for waiter in self.waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}
