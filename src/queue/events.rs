use crate::queue::entry::{EntryId, QueueEntry};
use serde::Serialize;

/// Tone of a global status message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Idle,
    Active,
    Success,
    Warning,
    Error,
}

/// Events that describe changes in the download queue state,
/// consumed by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    /// New entries were appended
    EntriesAdded { entries: Vec<QueueEntry> },
    /// Status, preset or progress text of an entry changed
    EntryUpdated { entry: QueueEntry },
    EntriesRemoved { ids: Vec<EntryId> },
    /// Live progress of the active entry; `item` is its 1-based position
    Progress {
        entry_id: EntryId,
        item: usize,
        percent: f64,
        message: String,
    },
    /// A line for the global log
    Log { line: String },
    Status { message: String, state: StatusState },
    /// Processing stopped; the controller is idle again
    QueueFinished { message: String, state: StatusState },
    /// A command was refused before anything changed
    ValidationFailed { title: String, message: String },
}
