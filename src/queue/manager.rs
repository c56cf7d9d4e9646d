//! Sequential download queue
//!
//! The controller owns every queue entry and is driven from a single thread
//! of control. It runs at most one [`DownloadTask`] at a time and only moves
//! to the next `Queued` entry once the previous task has reported `Exited`.
//! Methods that start a task must be called from within a tokio runtime.

use crate::downloader::{DownloadRequest, DownloadTask, TaskEvent, TaskHandle, TaskMessage, TaskOutcome};
use crate::extractor::Extractor;
use crate::presets::DEFAULT_PRESET;
use crate::queue::entry::{EntryId, EntryStatus, QueueEntry};
use crate::queue::events::{QueueEvent, StatusState};
use crate::utils::config::AppSettings;
use crate::utils::error::QueueError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const ABANDONED_MESSAGE: &str = "Error: download task ended unexpectedly";

pub struct QueueController {
    entries: Vec<QueueEntry>,
    running: bool,
    stop_requested: bool,
    active: Option<ActiveDownload>,
    output_dir: PathBuf,
    cookie_file: Option<PathBuf>,
    default_preset: String,
    extractor: Arc<dyn Extractor>,
    task_tx: mpsc::UnboundedSender<TaskMessage>,
    events: mpsc::UnboundedSender<QueueEvent>,
}

/// The task currently bound to an entry
struct ActiveDownload {
    handle: TaskHandle,
    /// `Finished` has been handled; only `Exited` is outstanding
    settled: bool,
}

impl QueueController {
    /// `task_tx` is the sending half of the channel whose receiver the owner
    /// drains into [`QueueController::handle_task_message`].
    pub fn new(
        extractor: Arc<dyn Extractor>,
        task_tx: mpsc::UnboundedSender<TaskMessage>,
        events: mpsc::UnboundedSender<QueueEvent>,
    ) -> Self {
        Self {
            entries: Vec::new(),
            running: false,
            stop_requested: false,
            active: None,
            output_dir: PathBuf::new(),
            cookie_file: None,
            default_preset: DEFAULT_PRESET.to_string(),
            extractor,
            task_tx,
            events,
        }
    }

    pub fn with_settings(
        settings: &AppSettings,
        extractor: Arc<dyn Extractor>,
        task_tx: mpsc::UnboundedSender<TaskMessage>,
        events: mpsc::UnboundedSender<QueueEvent>,
    ) -> Self {
        let mut controller = Self::new(extractor, task_tx, events);
        controller.set_output_dir(settings.output_dir.clone());
        controller.set_cookie_file(settings.cookie_file.clone());
        controller.default_preset = settings.default_preset.clone();
        controller
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Entry bound to a task that has not reported `Finished` yet
    pub fn active_entry(&self) -> Option<EntryId> {
        self.active
            .as_ref()
            .filter(|a| !a.settled)
            .map(|a| a.handle.entry_id())
    }

    /// A task exists whose execution context has not ended yet
    pub fn has_live_task(&self) -> bool {
        self.active.is_some()
    }

    pub fn has_queued(&self) -> bool {
        self.next_queued_index().is_some()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn cookie_file(&self) -> Option<&Path> {
        self.cookie_file.as_deref()
    }

    pub fn default_preset(&self) -> &str {
        &self.default_preset
    }

    // ------------------------------------------------------------------
    // Settings shared by every task
    // ------------------------------------------------------------------

    /// Takes effect for the next task started
    pub fn set_output_dir(&mut self, dir: impl Into<PathBuf>) {
        self.output_dir = dir.into();
    }

    /// An empty path clears the cookie file
    pub fn set_cookie_file(&mut self, path: Option<PathBuf>) {
        self.cookie_file = path.filter(|p| !p.as_os_str().is_empty());
    }

    pub fn set_default_preset(&mut self, preset: &str) -> Result<(), QueueError> {
        if self.running {
            return Err(QueueError::PresetsLocked);
        }
        self.default_preset = preset.to_string();
        Ok(())
    }

    pub fn set_entry_preset(&mut self, id: EntryId, preset: &str) -> Result<(), QueueError> {
        if self.running {
            return Err(QueueError::PresetsLocked);
        }
        let index = self
            .index_of(id)
            .ok_or_else(|| QueueError::EntryNotFound(id.to_string()))?;

        self.entries[index].preset = preset.to_string();
        let entry = self.entries[index].clone();
        self.emit(QueueEvent::EntryUpdated { entry });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queue editing
    // ------------------------------------------------------------------

    /// Append one `Queued` entry per non-blank line, in order.
    ///
    /// Each item may itself hold several newline-separated URLs.
    pub fn enqueue<I, S>(&mut self, urls: I, preset: &str) -> Result<Vec<EntryId>, QueueError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let added: Vec<QueueEntry> = urls
            .into_iter()
            .flat_map(|chunk| {
                chunk
                    .as_ref()
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .map(|url| QueueEntry::new(url, preset))
            .collect();

        if added.is_empty() {
            return Err(QueueError::MissingUrl);
        }

        let ids = added.iter().map(|e| e.id).collect();
        let count = added.len();
        self.entries.extend(added.iter().cloned());
        info!("Added {} task(s) to queue with preset {}", count, preset);

        self.emit(QueueEvent::EntriesAdded { entries: added });
        self.log(format!("Queued {} item(s) with quality: {}", count, preset));
        self.status(format!("Added {} item(s) to queue.", count), StatusState::Idle);
        Ok(ids)
    }

    /// Enqueue pasted text using the default preset
    pub fn enqueue_text(&mut self, text: &str) -> Result<Vec<EntryId>, QueueError> {
        let preset = self.default_preset.clone();
        self.enqueue([text], &preset)
    }

    /// Remove the entries at `rows`; out-of-range rows are ignored.
    pub fn remove_selected(&mut self, rows: &[usize]) -> Result<usize, QueueError> {
        if self.running {
            return Err(QueueError::QueueRunning);
        }

        let mut rows: Vec<usize> = rows
            .iter()
            .copied()
            .filter(|&row| row < self.entries.len())
            .collect();
        rows.sort_unstable_by(|a, b| b.cmp(a));
        rows.dedup();

        if rows.is_empty() {
            return Ok(0);
        }

        // Highest index first keeps the remaining indices valid
        let ids: Vec<EntryId> = rows
            .iter()
            .map(|&row| self.entries.remove(row).id)
            .collect();
        let count = ids.len();
        info!("Removed {} task(s) from queue", count);

        self.emit(QueueEvent::EntriesRemoved { ids });
        self.status(format!("Removed {} item(s).", count), StatusState::Idle);
        Ok(count)
    }

    /// Remove every `Done`, `Failed` and `Canceled` entry
    pub fn clear_finished(&mut self) -> Result<usize, QueueError> {
        if self.running {
            return Err(QueueError::QueueRunning);
        }

        let ids: Vec<EntryId> = self
            .entries
            .iter()
            .filter(|e| e.status.is_finished())
            .map(|e| e.id)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }

        self.entries.retain(|e| !e.status.is_finished());
        let count = ids.len();
        info!("Cleared {} finished task(s) from queue", count);

        self.emit(QueueEvent::EntriesRemoved { ids });
        self.status(
            format!("Cleared {} finished item(s).", count),
            StatusState::Idle,
        );
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Processing
    // ------------------------------------------------------------------

    /// Start processing `Queued` entries in order. A no-op while running.
    pub fn start(&mut self) -> Result<(), QueueError> {
        if self.running {
            return Ok(());
        }
        if self.output_dir.to_string_lossy().trim().is_empty() {
            return Err(QueueError::MissingOutputDir);
        }
        if !self.has_queued() {
            return Err(QueueError::QueueEmpty);
        }

        info!("Starting queue processing");
        self.log("Starting queue...");
        self.running = true;
        self.stop_requested = false;
        self.advance();
        Ok(())
    }

    /// Halt after the current item, cancelling it if one is in flight
    pub fn request_stop(&mut self) {
        if let Some(active) = self.active.as_ref() {
            if active.handle.is_cancel_requested() {
                debug!("Cancel already requested for {}", active.handle.entry_id());
                return;
            }
            active.handle.cancel();
            self.stop_requested = true;
            info!("Stop requested, cancelling {}", active.handle.entry_id());
            self.status("Cancelling current item...", StatusState::Warning);
            self.log("Cancel requested...");
        } else if self.running {
            self.stop_requested = true;
            info!("Stop requested between items");
            self.status("Stopping queue...", StatusState::Warning);
        }
    }

    /// Apply one event from a download task
    pub fn handle_task_message(&mut self, msg: TaskMessage) {
        let TaskMessage { entry_id, event } = msg;
        let is_active = self
            .active
            .as_ref()
            .map_or(false, |a| a.handle.entry_id() == entry_id);

        if let TaskEvent::Exited = event {
            if !is_active {
                debug!("Ignoring exit of stale task {}", entry_id);
                return;
            }
            self.on_task_exited(entry_id);
            return;
        }

        let Some(index) = self.index_of(entry_id) else {
            debug!("Dropping event for unknown entry {}", entry_id);
            return;
        };

        match event {
            TaskEvent::Progress { percent, message } => {
                if !is_active || self.entries[index].status != EntryStatus::Downloading {
                    debug!("Ignoring late progress for {}", entry_id);
                    return;
                }
                self.entries[index].progress_text = format!("{:.1}%", percent);
                self.emit(QueueEvent::Progress {
                    entry_id,
                    item: index + 1,
                    percent,
                    message,
                });
            }
            TaskEvent::Log(line) => {
                self.log(format!("[Item {}] {}", index + 1, line));
            }
            TaskEvent::Finished { outcome, message } => {
                if self.active_entry() != Some(entry_id) {
                    warn!("Ignoring duplicate or stale finish for {}", entry_id);
                    return;
                }
                self.settle(index, outcome, &message);
            }
            TaskEvent::Exited => {}
        }
    }

    fn on_task_exited(&mut self, entry_id: EntryId) {
        let settled = self.active.as_ref().map_or(true, |a| a.settled);
        if !settled {
            if let Some(index) = self.index_of(entry_id) {
                warn!("Task {} exited without finishing", entry_id);
                self.settle(index, TaskOutcome::Failed, ABANDONED_MESSAGE);
            }
        }

        self.active = None;
        if self.running {
            self.advance();
        }
    }

    /// Record the terminal state of the active entry
    fn settle(&mut self, index: usize, outcome: TaskOutcome, message: &str) {
        let (status, state) = match outcome {
            TaskOutcome::Completed => (EntryStatus::Done, StatusState::Success),
            TaskOutcome::Canceled => (EntryStatus::Canceled, StatusState::Warning),
            TaskOutcome::Failed => (EntryStatus::Failed, StatusState::Error),
        };

        let entry = &mut self.entries[index];
        entry.status = status;
        match status {
            EntryStatus::Done => entry.progress_text = "100%".to_string(),
            EntryStatus::Failed => entry.progress_text = "0%".to_string(),
            _ => {}
        }
        let entry = entry.clone();

        if outcome == TaskOutcome::Canceled {
            self.stop_requested = true;
        }
        if let Some(active) = self.active.as_mut() {
            active.settled = true;
        }
        info!("Entry {} finished as {}", entry.id, status);

        self.emit(QueueEvent::EntryUpdated { entry });
        self.status(message, state);
        self.log(format!("[Item {}] {}", index + 1, message));
    }

    /// Start the next `Queued` entry, or wind the queue down
    fn advance(&mut self) {
        if self.stop_requested {
            self.finish_queue("Queue stopped.", StatusState::Warning);
            return;
        }

        let Some(index) = self.next_queued_index() else {
            self.finish_queue("Queue completed.", StatusState::Success);
            return;
        };

        let total = self.entries.len();
        let entry = &mut self.entries[index];
        entry.status = EntryStatus::Downloading;
        entry.progress_text = "0%".to_string();
        let entry = entry.clone();

        let request = DownloadRequest {
            url: entry.url.clone(),
            output_dir: self.output_dir.clone(),
            cookie_file: self.cookie_file.clone(),
            preset: entry.preset.clone(),
        };
        let handle = DownloadTask::new(
            entry.id,
            request,
            Arc::clone(&self.extractor),
            self.task_tx.clone(),
        )
        .spawn();
        self.active = Some(ActiveDownload {
            handle,
            settled: false,
        });
        info!("Started download for task {}", entry.id);

        let status = format!(
            "Downloading item {}/{} ({})",
            index + 1,
            total,
            entry.preset
        );
        self.emit(QueueEvent::EntryUpdated { entry });
        self.status(status, StatusState::Active);
    }

    fn finish_queue(&mut self, message: &str, state: StatusState) {
        self.running = false;
        self.stop_requested = false;
        self.active = None;
        info!("{}", message);

        self.status(message, state);
        self.log(message);
        self.emit(QueueEvent::QueueFinished {
            message: message.to_string(),
            state,
        });
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn next_queued_index(&self) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.status == EntryStatus::Queued)
    }

    fn index_of(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    fn emit(&self, event: QueueEvent) {
        if self.events.send(event).is_err() {
            debug!("Queue event receiver is gone");
        }
    }

    fn log(&self, line: impl Into<String>) {
        self.emit(QueueEvent::Log { line: line.into() });
    }

    fn status(&self, message: impl Into<String>, state: StatusState) {
        self.emit(QueueEvent::Status {
            message: message.into(),
            state,
        });
    }
}
