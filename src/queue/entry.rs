//! Queue entries and their lifecycle states

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identity of a queue entry, carried by every task event
pub type EntryId = Uuid;

/// Entry status
///
/// `Queued → Downloading → {Done | Failed | Canceled}`; nothing moves back to `Queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EntryStatus {
    #[default]
    Queued,
    Downloading,
    Done,
    Failed,
    Canceled,
}

impl EntryStatus {
    /// Terminal states removed by "clear finished"
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            EntryStatus::Done | EntryStatus::Failed | EntryStatus::Canceled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Queued => "Queued",
            EntryStatus::Downloading => "Downloading",
            EntryStatus::Done => "Done",
            EntryStatus::Failed => "Failed",
            EntryStatus::Canceled => "Canceled",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One queued URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub url: String,
    pub preset: String,
    pub status: EntryStatus,
    /// Display-only, e.g. `42.3%`
    pub progress_text: String,
    pub added_at: DateTime<Utc>,
}

impl QueueEntry {
    pub fn new(url: impl Into<String>, preset: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            preset: preset.into(),
            status: EntryStatus::Queued,
            progress_text: "0%".to_string(),
            added_at: Utc::now(),
        }
    }
}
