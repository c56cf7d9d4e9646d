//! Download task and progress reporting

pub mod progress;
pub mod task;

// Re-export for convenience
pub use task::{
    DownloadRequest, DownloadTask, TaskEvent, TaskHandle, TaskMessage, TaskOutcome,
};
