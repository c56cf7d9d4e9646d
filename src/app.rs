//! Console front end: feeds commands to the backend and renders its events

use crate::backend::{BackendActor, BackendCommand};
use crate::extractor::Extractor;
use crate::queue::{EntryStatus, QueueEntry, QueueEvent, StatusState};
use crate::utils::config::AppSettings;
use anyhow::Result;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// What the binary was asked to download
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Newline-separated URLs
    pub urls: String,
    /// Overrides the configured default preset
    pub preset: Option<String>,
    /// Print events as JSON lines instead of text
    pub json: bool,
}

/// How a run ended
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Final state of every queued entry
    pub entries: Vec<QueueEntry>,
    /// Title of the validation failure that ended the run, if any
    pub rejected: Option<String>,
}

impl RunReport {
    /// Nothing was rejected and no entry failed
    pub fn is_success(&self) -> bool {
        self.rejected.is_none() && count(&self.entries, EntryStatus::Failed) == 0
    }
}

/// Queue every URL and run the queue to the end.
///
/// The first Ctrl-C stops after the current item; the second stops waiting.
pub async fn run(
    settings: AppSettings,
    extractor: Arc<dyn Extractor>,
    request: RunRequest,
) -> Result<RunReport> {
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let backend = tokio::spawn(BackendActor::new(&settings, extractor, cmd_rx, event_tx).run());

    cmd_tx
        .send(BackendCommand::Enqueue {
            urls: request.urls.clone(),
            preset: request.preset.clone(),
        })
        .await?;
    cmd_tx.send(BackendCommand::Start).await?;

    let mut presenter = ConsolePresenter::new(request.json);
    let mut interrupts = 0;
    let mut rejected = None;

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                presenter.render(&event)?;
                match event {
                    QueueEvent::QueueFinished { .. } => break,
                    QueueEvent::ValidationFailed { title, .. } => {
                        rejected = Some(title);
                        break;
                    }
                    _ => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                interrupts += 1;
                if interrupts > 1 {
                    warn!("Second interrupt, shutting down");
                    break;
                }
                warn!("Interrupt received, stopping after the current item");
                let _ = cmd_tx.send(BackendCommand::Stop).await;
            }
        }
    }

    let _ = cmd_tx.send(BackendCommand::Shutdown).await;
    let entries = backend.await?;
    while let Ok(event) = event_rx.try_recv() {
        presenter.render(&event)?;
    }
    presenter.summary(&entries)?;

    Ok(RunReport { entries, rejected })
}

/// Renders queue events on stdout/stderr
pub struct ConsolePresenter {
    json: bool,
    /// A `\r` progress line is on screen and must be cleared first
    progress_shown: bool,
}

impl ConsolePresenter {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            progress_shown: false,
        }
    }

    pub fn render(&mut self, event: &QueueEvent) -> io::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(event)?);
            return Ok(());
        }

        match event {
            QueueEvent::Progress { item, message, .. } => {
                let mut err = io::stderr().lock();
                write!(err, "\r\x1b[2K[Item {}] {}", item, message)?;
                err.flush()?;
                self.progress_shown = true;
            }
            QueueEvent::Log { line } => {
                self.clear_progress()?;
                println!("{}", line);
            }
            QueueEvent::Status { message, state } => match state {
                StatusState::Active | StatusState::Warning => {
                    self.clear_progress()?;
                    println!("* {}", message);
                }
                _ => debug!("Status ({:?}): {}", state, message),
            },
            QueueEvent::ValidationFailed { title, message } => {
                self.clear_progress()?;
                eprintln!("{}: {}", title, message);
            }
            QueueEvent::EntriesAdded { entries } => debug!("{} entries added", entries.len()),
            QueueEvent::EntryUpdated { entry } => {
                debug!("Entry {} is {} ({})", entry.id, entry.status, entry.progress_text)
            }
            QueueEvent::EntriesRemoved { ids } => debug!("{} entries removed", ids.len()),
            QueueEvent::QueueFinished { message, .. } => debug!("Queue finished: {}", message),
        }
        Ok(())
    }

    /// Final per-entry table (or one JSON document)
    pub fn summary(&mut self, entries: &[QueueEntry]) -> io::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(entries)?);
            return Ok(());
        }
        self.clear_progress()?;
        if entries.is_empty() {
            return Ok(());
        }

        println!();
        println!("{:<12} {:>8}  {:<20} URL", "STATUS", "PROGRESS", "QUALITY");
        for entry in entries {
            println!(
                "{:<12} {:>8}  {:<20} {}",
                entry.status.as_str(),
                entry.progress_text,
                entry.preset,
                entry.url
            );
        }

        let done = count(entries, EntryStatus::Done);
        let failed = count(entries, EntryStatus::Failed);
        let canceled = count(entries, EntryStatus::Canceled);
        let queued = count(entries, EntryStatus::Queued);
        println!(
            "\n{} done, {} failed, {} canceled, {} still queued",
            done, failed, canceled, queued
        );
        Ok(())
    }

    fn clear_progress(&mut self) -> io::Result<()> {
        if self.progress_shown {
            let mut err = io::stderr().lock();
            write!(err, "\r\x1b[2K")?;
            err.flush()?;
            self.progress_shown = false;
        }
        Ok(())
    }
}

fn count(entries: &[QueueEntry], status: EntryStatus) -> usize {
    entries.iter().filter(|e| e.status == status).count()
}
