//! vidqueue library

pub mod app;
pub mod backend;
pub mod downloader;
pub mod extractor;
pub mod presets;
pub mod queue;
pub mod utils;

// Re-export main types for easier use
pub use downloader::{DownloadTask, TaskEvent, TaskMessage, TaskOutcome};
pub use extractor::{Extractor, YtDlpExtractor};
pub use presets::{PresetConfig, DEFAULT_PRESET};
pub use queue::{EntryStatus, QueueController, QueueEntry, QueueEvent};
pub use utils::{AppSettings, ExtractionError, QueueError};
