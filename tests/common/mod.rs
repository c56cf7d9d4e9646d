//! Shared fixtures for the queue integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, Notify};
use vidqueue::extractor::{ExtractOptions, Extractor, ProgressHook, ProgressUpdate, VideoInfo};
use vidqueue::queue::{EntryStatus, QueueController, QueueEvent};
use vidqueue::{ExtractionError, TaskEvent, TaskMessage};

const RECV_TIMEOUT: Duration = Duration::from_secs(10);

/// What the scripted extractor does for one URL
#[derive(Clone)]
pub enum Script {
    /// Report the given updates, then succeed
    Succeed(Vec<ProgressUpdate>),
    /// Metadata lookup fails
    FailInfo(String),
    /// Report some progress, then fail
    FailDownload(String),
    /// Keep reporting 30% until the hook aborts the transfer
    UntilCanceled,
    /// Block until notified, then fail without another progress checkpoint
    Hang(Arc<Notify>, String),
    /// Panic inside the metadata lookup
    Panic,
}

pub fn downloading(downloaded: u64, total: u64) -> ProgressUpdate {
    ProgressUpdate::Downloading {
        downloaded_bytes: downloaded,
        total_bytes: Some(total),
        speed: Some(2.0 * 1024.0 * 1024.0),
        eta: Some(3),
    }
}

pub fn quick_success() -> Script {
    Script::Succeed(vec![
        downloading(0, 100),
        downloading(50, 100),
        downloading(100, 100),
        ProgressUpdate::Finished,
    ])
}

/// Extractor double driven by a per-URL script
pub struct ScriptedExtractor {
    scripts: Mutex<HashMap<String, Script>>,
    fallback: Script,
    calls: Mutex<Vec<(String, ExtractOptions)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new(fallback: Script) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with(self, url: &str, script: Script) -> Self {
        self.scripts.lock().unwrap().insert(url.to_string(), script);
        self
    }

    /// URLs passed to `download`, in call order, with their options
    pub fn downloads(&self) -> Vec<(String, ExtractOptions)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn script_for(&self, url: &str) -> Script {
        self.scripts
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    async fn play(
        &self,
        script: Script,
        on_progress: ProgressHook<'_>,
    ) -> Result<(), ExtractionError> {
        match script {
            Script::Succeed(updates) => {
                for update in &updates {
                    on_progress(update)?;
                    tokio::task::yield_now().await;
                }
                Ok(())
            }
            Script::FailDownload(message) => {
                on_progress(&downloading(10, 100))?;
                Err(ExtractionError::Failed(message))
            }
            Script::UntilCanceled => {
                for _ in 0..5_000 {
                    on_progress(&downloading(30, 100))?;
                    tokio::time::sleep(Duration::from_millis(2)).await;
                }
                Err(ExtractionError::Failed("never canceled".into()))
            }
            Script::Hang(release, message) => {
                release.notified().await;
                Err(ExtractionError::Failed(message))
            }
            Script::FailInfo(_) | Script::Panic => Ok(()),
        }
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    fn id(&self) -> &'static str {
        "scripted"
    }

    async fn extract_info(
        &self,
        url: &str,
        _options: &ExtractOptions,
    ) -> Result<VideoInfo, ExtractionError> {
        match self.script_for(url) {
            Script::FailInfo(message) => Err(ExtractionError::Failed(message)),
            Script::Panic => panic!("extractor blew up on {}", url),
            _ => Ok(VideoInfo {
                id: url.rsplit('/').next().unwrap_or_default().to_string(),
                title: format!("Clip: {}", url),
                url: url.to_string(),
                ..Default::default()
            }),
        }
    }

    async fn download(
        &self,
        url: &str,
        options: &ExtractOptions,
        on_progress: ProgressHook<'_>,
    ) -> Result<(), ExtractionError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), options.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let result = self.play(self.script_for(url), on_progress).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// A controller wired to in-memory channels, driven by hand
pub struct Harness {
    pub controller: QueueController,
    pub task_rx: mpsc::UnboundedReceiver<TaskMessage>,
    pub events_rx: mpsc::UnboundedReceiver<QueueEvent>,
    pub extractor: Arc<ScriptedExtractor>,
    pub output_dir: PathBuf,
    _dir: TempDir,
}

impl Harness {
    pub fn new(extractor: ScriptedExtractor) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("out");
        let extractor = Arc::new(extractor);
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut controller = QueueController::new(extractor.clone(), task_tx, events_tx);
        controller.set_output_dir(output_dir.clone());

        Self {
            controller,
            task_rx,
            events_rx,
            extractor,
            output_dir,
            _dir: dir,
        }
    }

    /// Next raw message from the active task, without applying it
    pub async fn next_message(&mut self) -> TaskMessage {
        tokio::time::timeout(RECV_TIMEOUT, self.task_rx.recv())
            .await
            .expect("timed out waiting for a task message")
            .expect("task channel closed")
    }

    /// Apply the next task message and check the queue invariants
    pub async fn pump(&mut self) -> TaskMessage {
        let msg = self.next_message().await;
        self.controller.handle_task_message(msg.clone());
        check_invariants(&self.controller);
        msg
    }

    /// Pump until a task reports `Finished`
    pub async fn pump_until_finished(&mut self) -> TaskMessage {
        loop {
            let msg = self.pump().await;
            if matches!(msg.event, TaskEvent::Finished { .. }) {
                return msg;
            }
        }
    }

    pub async fn run_to_idle(&mut self) {
        while self.controller.is_running() {
            self.pump().await;
        }
    }

    pub fn statuses(&self) -> Vec<EntryStatus> {
        self.controller.entries().iter().map(|e| e.status).collect()
    }

    pub fn events(&mut self) -> Vec<QueueEvent> {
        std::iter::from_fn(|| self.events_rx.try_recv().ok()).collect()
    }

    /// Global log lines emitted so far (drains the event channel)
    pub fn log_lines(&mut self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                QueueEvent::Log { line } => Some(line),
                _ => None,
            })
            .collect()
    }
}

pub fn check_invariants(controller: &QueueController) {
    let downloading = controller
        .entries()
        .iter()
        .filter(|e| e.status == EntryStatus::Downloading)
        .count();
    assert!(downloading <= 1, "{} entries downloading at once", downloading);

    if let Some(id) = controller.active_entry() {
        let entry = controller
            .entries()
            .iter()
            .find(|e| e.id == id)
            .expect("active entry is in the queue");
        assert_eq!(entry.status, EntryStatus::Downloading);
        assert!(controller.is_running());
    }
}

/// The `QueueFinished` event, if one was emitted
pub fn finished_event(events: &[QueueEvent]) -> Option<&QueueEvent> {
    events
        .iter()
        .find(|e| matches!(e, QueueEvent::QueueFinished { .. }))
}
