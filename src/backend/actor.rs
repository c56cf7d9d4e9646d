use super::messages::BackendCommand;
use crate::downloader::TaskMessage;
use crate::extractor::Extractor;
use crate::queue::{QueueController, QueueEntry, QueueEvent};
use crate::utils::config::AppSettings;
use crate::utils::error::QueueError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How long shutdown waits for a cancelled task to wind down
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// The single owner of queue state
///
/// Commands from the presentation layer and events from the active download
/// task are both applied here, one at a time, so no locking is needed.
pub struct BackendActor {
    receiver: mpsc::Receiver<BackendCommand>,
    sender: mpsc::UnboundedSender<QueueEvent>,
    task_rx: mpsc::UnboundedReceiver<TaskMessage>,
    controller: QueueController,
}

impl BackendActor {
    pub fn new(
        settings: &AppSettings,
        extractor: Arc<dyn Extractor>,
        receiver: mpsc::Receiver<BackendCommand>,
        sender: mpsc::UnboundedSender<QueueEvent>,
    ) -> Self {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let controller =
            QueueController::with_settings(settings, extractor, task_tx, sender.clone());

        Self {
            receiver,
            sender,
            task_rx,
            controller,
        }
    }

    /// Process commands until `Shutdown` (or every command sender is gone).
    /// Returns the final queue.
    pub async fn run(mut self) -> Vec<QueueEntry> {
        info!("BackendActor started");

        loop {
            tokio::select! {
                Some(msg) = self.task_rx.recv() => {
                    self.controller.handle_task_message(msg);
                }
                cmd = self.receiver.recv() => match cmd {
                    Some(BackendCommand::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
            }
        }

        self.shutdown().await;
        info!("BackendActor shutting down");
        self.controller.entries().to_vec()
    }

    fn handle_command(&mut self, cmd: BackendCommand) {
        debug!("Backend command: {:?}", cmd);
        let result = match cmd {
            BackendCommand::Enqueue { urls, preset } => match preset {
                Some(preset) => self.controller.enqueue([urls], &preset).map(|_| ()),
                None => self.controller.enqueue_text(&urls).map(|_| ()),
            },
            BackendCommand::SetOutputDir(dir) => {
                self.controller.set_output_dir(dir);
                info!("Output folder set to {}", self.controller.output_dir().display());
                Ok(())
            }
            BackendCommand::SetCookieFile(path) => {
                self.controller.set_cookie_file(path);
                match self.controller.cookie_file() {
                    Some(path) => info!("Using cookies file {}", path.display()),
                    None => info!("Cookies file cleared"),
                }
                Ok(())
            }
            BackendCommand::SetDefaultPreset(preset) => {
                self.controller.set_default_preset(&preset).map(|()| {
                    info!("Default quality set to {}", self.controller.default_preset())
                })
            }
            BackendCommand::SetEntryPreset { id, preset } => {
                self.controller.set_entry_preset(id, &preset)
            }
            BackendCommand::Start => self.controller.start(),
            BackendCommand::Stop => {
                self.controller.request_stop();
                Ok(())
            }
            BackendCommand::RemoveSelected(rows) => {
                self.controller.remove_selected(&rows).map(|_| ())
            }
            BackendCommand::ClearFinished => self.controller.clear_finished().map(|_| ()),
            BackendCommand::Shutdown => Ok(()),
        };

        if let Err(e) = result {
            self.reject(e);
        }
    }

    fn reject(&self, error: QueueError) {
        warn!("Command rejected: {}", error);
        let _ = self.sender.send(QueueEvent::ValidationFailed {
            title: error.title().to_string(),
            message: error.to_string(),
        });
    }

    /// Cancel the active task and give it a moment to report back
    async fn shutdown(&mut self) {
        if !self.controller.has_live_task() {
            return;
        }

        if !self.controller.is_stop_requested() {
            self.controller.request_stop();
        }
        let deadline = tokio::time::sleep(SHUTDOWN_GRACE);
        tokio::pin!(deadline);

        while self.controller.has_live_task() {
            tokio::select! {
                Some(msg) = self.task_rx.recv() => self.controller.handle_task_message(msg),
                _ = &mut deadline => {
                    warn!("Active download did not stop within {:?}", SHUTDOWN_GRACE);
                    break;
                }
            }
        }
    }
}
