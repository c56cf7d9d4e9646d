//! Single-shot download of one queue entry
//!
//! A [`DownloadTask`] runs on a tokio worker and never touches queue state.
//! It reports back exclusively through [`TaskMessage`]s tagged with the entry
//! it belongs to, ending with exactly one `Finished` followed by `Exited`.

use crate::downloader::progress;
use crate::extractor::{ExtractOptions, Extractor, ProgressUpdate};
use crate::presets;
use crate::queue::EntryId;
use crate::utils::error::{ExtractionError, TaskError};
use crate::utils::sanitize_filename;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const COMPLETED_MESSAGE: &str = "Download completed successfully.";
pub const CANCELED_MESSAGE: &str = "Download canceled.";

/// Error raised from the progress hook once cancellation was requested
const CANCELED_BY_USER: &str = "Download canceled by user.";

/// How a task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Canceled,
    Failed,
}

impl TaskOutcome {
    /// Recover an outcome from a bare `(success, message)` report.
    ///
    /// Any failure whose message mentions "cancel" (case-insensitive) counts
    /// as a cancellation.
    pub fn classify(success: bool, message: &str) -> Self {
        if success {
            TaskOutcome::Completed
        } else if message.to_lowercase().contains("cancel") {
            TaskOutcome::Canceled
        } else {
            TaskOutcome::Failed
        }
    }
}

/// Events emitted by a running task, in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    Progress { percent: f64, message: String },
    Log(String),
    Finished { outcome: TaskOutcome, message: String },
    /// The task's execution context has ended; always the last event
    Exited,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskMessage {
    pub entry_id: EntryId,
    pub event: TaskEvent,
}

/// What to download and where
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    /// Used only if the file exists
    pub cookie_file: Option<PathBuf>,
    pub preset: String,
}

pub struct DownloadTask {
    entry_id: EntryId,
    request: DownloadRequest,
    extractor: Arc<dyn Extractor>,
    events: mpsc::UnboundedSender<TaskMessage>,
    cancel: CancellationToken,
}

/// Owner-side view of a spawned task
#[derive(Debug)]
pub struct TaskHandle {
    entry_id: EntryId,
    cancel: CancellationToken,
}

impl TaskHandle {
    pub fn entry_id(&self) -> EntryId {
        self.entry_id
    }

    /// Ask the task to stop at its next progress checkpoint
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl DownloadTask {
    pub fn new(
        entry_id: EntryId,
        request: DownloadRequest,
        extractor: Arc<dyn Extractor>,
        events: mpsc::UnboundedSender<TaskMessage>,
    ) -> Self {
        Self {
            entry_id,
            request,
            extractor,
            events,
            cancel: CancellationToken::new(),
        }
    }

    /// Run on a tokio worker. `Exited` is sent once the worker is gone,
    /// even if it panicked.
    pub fn spawn(self) -> TaskHandle {
        let entry_id = self.entry_id;
        let cancel = self.cancel.clone();
        let events = self.events.clone();

        let worker = tokio::spawn(self.run());
        tokio::spawn(async move {
            if let Err(e) = worker.await {
                error!("Download task for {} ended abnormally: {}", entry_id, e);
            }
            let _ = events.send(TaskMessage {
                entry_id,
                event: TaskEvent::Exited,
            });
        });

        TaskHandle { entry_id, cancel }
    }

    /// Drive the download to completion and emit the final `Finished` event
    pub async fn run(self) {
        info!("Starting download of {} ({})", self.request.url, self.request.preset);

        let result = self.execute().await;
        let canceled = self.cancel.is_cancelled();

        let (outcome, message) = match result {
            Ok(()) if canceled => (TaskOutcome::Canceled, CANCELED_MESSAGE.to_string()),
            Ok(()) => (TaskOutcome::Completed, COMPLETED_MESSAGE.to_string()),
            Err(TaskError::Extraction(e)) if canceled || e.is_canceled() => {
                (TaskOutcome::Canceled, CANCELED_MESSAGE.to_string())
            }
            Err(TaskError::Extraction(e)) => {
                let message = format!("Download failed: {}", e);
                (TaskOutcome::classify(false, &message), message)
            }
            Err(TaskError::Unexpected(e)) => (TaskOutcome::Failed, format!("Error: {}", e)),
        };

        match outcome {
            TaskOutcome::Completed => info!("Task {} completed successfully", self.entry_id),
            TaskOutcome::Canceled => info!("Task {} was cancelled", self.entry_id),
            TaskOutcome::Failed => warn!("Task {} failed: {}", self.entry_id, message),
        }

        self.emit(TaskEvent::Finished { outcome, message });
    }

    async fn execute(&self) -> Result<(), TaskError> {
        tokio::fs::create_dir_all(&self.request.output_dir).await?;

        let preset = presets::resolve(&self.request.preset);
        let cookie_file = self
            .request
            .cookie_file
            .as_ref()
            .filter(|path| path.exists())
            .cloned();
        let uses_cookies = cookie_file.is_some();
        let options = ExtractOptions::from_preset(preset, &self.request.output_dir)
            .with_cookie_file(cookie_file);

        self.log(format!("Quality: {}", self.request.preset));
        if uses_cookies {
            self.log("Using cookies file for authenticated download.");
        }

        self.log("Fetching video info...");
        let info = self.extractor.extract_info(&self.request.url, &options).await?;
        self.log(format!("Title: {}", sanitize_filename(&info.title)));

        self.log("Starting download...");
        let entry_id = self.entry_id;
        let cancel = self.cancel.clone();
        let events = self.events.clone();
        let mut hook = move |update: &ProgressUpdate| -> Result<(), ExtractionError> {
            if cancel.is_cancelled() {
                return Err(ExtractionError::Canceled(CANCELED_BY_USER.to_string()));
            }
            let (percent, message) = progress::describe(update);
            let _ = events.send(TaskMessage {
                entry_id,
                event: TaskEvent::Progress { percent, message },
            });
            Ok(())
        };

        self.extractor
            .download(&self.request.url, &options, &mut hook)
            .await?;
        Ok(())
    }

    fn log(&self, line: impl Into<String>) {
        let line = line.into();
        debug!("[{}] {}", self.entry_id, line);
        self.emit(TaskEvent::Log(line));
    }

    fn emit(&self, event: TaskEvent) {
        if self
            .events
            .send(TaskMessage {
                entry_id: self.entry_id,
                event,
            })
            .is_err()
        {
            debug!("Event receiver for {} is gone", self.entry_id);
        }
    }
}
