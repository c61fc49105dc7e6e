//! Change notifications published by the store.
//!
//! Consumers call [`crate::store::ProductionStore::subscribe`] and re-read
//! state when an event arrives, instead of polling the store.

use serde::Serialize;

use linewatch_core::types::{DbId, StageId, Timestamp};

/// Broadcast channel capacity for store events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A cycle committed a fresh snapshot.
    SnapshotReplaced {
        synced_at: Timestamp,
        lines: usize,
        open_failures: usize,
    },
    /// A cycle failed; the previous snapshot is still in place.
    SyncFailed { error: String },
    /// A line's status or product list was patched by a mutation.
    LinePatched { line_id: DbId },
    /// A failure was reported on a line.
    FailureReported { line_id: DbId, stage: StageId, failure_id: DbId },
    /// Open failures on a line/stage were marked resolved.
    FailuresResolved { line_id: DbId, stage: StageId, count: usize },
}
