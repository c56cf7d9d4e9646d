//! Error handling for vidqueue

use thiserror::Error;

/// Failures raised by the extraction capability (metadata lookup or download)
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("yt-dlp not found. Please install yt-dlp")]
    YtDlpNotFound,

    #[error("Failed to run yt-dlp: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("{0}")]
    Failed(String),

    #[error("Invalid metadata from yt-dlp: {0}")]
    InvalidMetadata(#[from] serde_json::Error),

    /// Raised from the progress hook to abort a transfer
    #[error("{0}")]
    Canceled(String),
}

impl ExtractionError {
    pub fn is_canceled(&self) -> bool {
        matches!(self, ExtractionError::Canceled(_))
    }
}

/// Everything that can end a download task early
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<std::io::Error> for TaskError {
    fn from(e: std::io::Error) -> Self {
        TaskError::Unexpected(e.into())
    }
}

/// User-facing validation failures from queue operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Please enter at least one video URL.")]
    MissingUrl,

    #[error("Please select an output folder.")]
    MissingOutputDir,

    #[error("Add URLs to the queue first.")]
    QueueEmpty,

    #[error("Stop the queue before changing it.")]
    QueueRunning,

    #[error("Queue entry not found: {0}")]
    EntryNotFound(String),

    #[error("Quality cannot be changed while the queue is running.")]
    PresetsLocked,
}

impl QueueError {
    /// Short dialog-style title for the failure
    pub fn title(&self) -> &'static str {
        match self {
            QueueError::MissingUrl => "Missing URL",
            QueueError::MissingOutputDir => "Missing Folder",
            QueueError::QueueEmpty => "Queue Empty",
            QueueError::QueueRunning | QueueError::PresetsLocked => "Queue Running",
            QueueError::EntryNotFound(_) => "Not Found",
        }
    }
}
