//! Utility modules for error handling and configuration

pub mod config;
pub mod error;
pub mod sanitize;

// Re-export for convenience
pub use config::{default_download_dir, default_settings_path, AppSettings};
pub use error::{ExtractionError, QueueError, TaskError};
pub use sanitize::sanitize_filename;
