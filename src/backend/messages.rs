use crate::queue::EntryId;
use std::path::PathBuf;

/// Commands sent from the presentation layer to the backend
#[derive(Debug, Clone)]
pub enum BackendCommand {
    /// Newline-separated URLs; `None` uses the default preset
    Enqueue {
        urls: String,
        preset: Option<String>,
    },
    SetOutputDir(PathBuf),
    SetCookieFile(Option<PathBuf>),
    SetDefaultPreset(String),
    SetEntryPreset {
        id: EntryId,
        preset: String,
    },
    Start,
    Stop,
    RemoveSelected(Vec<usize>),
    ClearFinished,
    // System
    Shutdown,
}
