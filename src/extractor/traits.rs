use crate::extractor::models::VideoInfo;
use crate::presets::PresetConfig;
use crate::utils::error::ExtractionError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Post-processing step run by the capability after the transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostProcessor {
    /// Re-encode to an audio-only file
    ExtractAudio { codec: String, quality: String },
}

/// Everything the capability needs to fetch one item
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    pub format: String,
    pub merge_output_format: Option<String>,
    pub postprocessors: Vec<PostProcessor>,
    /// Output path template, e.g. `/tmp/out/%(title)s.%(ext)s`
    pub output_template: String,
    /// Treat playlist URLs as the single video they point at
    pub no_playlist: bool,
    /// Restrict file names to characters valid on every platform
    pub windows_filenames: bool,
    pub cookie_file: Option<PathBuf>,
}

impl ExtractOptions {
    pub fn from_preset(preset: &PresetConfig, output_dir: &Path) -> Self {
        Self {
            format: preset.format.to_string(),
            merge_output_format: preset.merge_output_format.map(str::to_string),
            postprocessors: preset.postprocessors.clone(),
            output_template: output_dir
                .join("%(title)s.%(ext)s")
                .to_string_lossy()
                .into_owned(),
            no_playlist: true,
            windows_filenames: true,
            cookie_file: None,
        }
    }

    pub fn with_cookie_file(mut self, cookie_file: Option<PathBuf>) -> Self {
        self.cookie_file = cookie_file;
        self
    }
}

/// One notification from a running transfer
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressUpdate {
    Downloading {
        downloaded_bytes: u64,
        /// Exact size, or the capability's estimate when the exact size is unknown
        total_bytes: Option<u64>,
        /// Bytes per second
        speed: Option<f64>,
        /// Seconds remaining
        eta: Option<u64>,
    },
    /// Transfer done, post-processing may still follow
    Finished,
}

/// Callback invoked for every progress notification.
///
/// Returning an error aborts the transfer; the capability must hand that
/// error back to its caller instead of swallowing it.
pub type ProgressHook<'a> =
    &'a mut (dyn FnMut(&ProgressUpdate) -> Result<(), ExtractionError> + Send);

/// The external extraction capability
///
/// This trait isolates the queue from the specific extraction method
/// (yt-dlp subprocess, test doubles, ...).
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Returns a unique identifier for this extractor (e.g., "ytdlp")
    fn id(&self) -> &'static str;

    /// Fetch metadata without downloading anything
    async fn extract_info(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<VideoInfo, ExtractionError>;

    /// Download one item, reporting progress through `on_progress`
    async fn download(
        &self,
        url: &str,
        options: &ExtractOptions,
        on_progress: ProgressHook<'_>,
    ) -> Result<(), ExtractionError>;
}
