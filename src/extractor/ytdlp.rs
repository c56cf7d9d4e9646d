//! yt-dlp wrapper for metadata lookup and downloads
//!
//! Every operation runs the yt-dlp executable as a child process. Downloads
//! ask yt-dlp for machine-readable progress lines (`--progress-template`) and
//! turn each one into a [`ProgressUpdate`] for the caller's hook.
//!
//! Aborting a download kills the yt-dlp process only. An ffmpeg child that
//! yt-dlp started for merging or audio conversion is not tracked and may
//! finish its current step after the abort.

use crate::extractor::models::VideoInfo;
use crate::extractor::traits::{
    ExtractOptions, Extractor, PostProcessor, ProgressHook, ProgressUpdate,
};
use crate::utils::error::ExtractionError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, info, warn};

/// Marker that starts every progress line we ask yt-dlp to print
const PROGRESS_PREFIX: &str = "vidqueue-progress|";

const PROGRESS_TEMPLATE: &str = "download:vidqueue-progress|%(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s|%(progress.speed)s|%(progress.eta)s";

/// Extraction capability backed by a yt-dlp executable
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    ytdlp_path: PathBuf,
}

impl YtDlpExtractor {
    /// Locate yt-dlp and build an extractor around it
    ///
    /// Search order:
    /// 1. Next to the current executable
    /// 2. System PATH
    /// 3. Common installation paths
    pub fn new() -> Result<Self, ExtractionError> {
        match find_ytdlp() {
            Some(path) => {
                info!("Found yt-dlp at: {}", path.display());
                Ok(Self { ytdlp_path: path })
            }
            None => {
                error!("yt-dlp not found anywhere!");
                Err(ExtractionError::YtDlpNotFound)
            }
        }
    }

    /// Use a specific yt-dlp binary
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            ytdlp_path: path.into(),
        }
    }

    /// Get the path to yt-dlp being used
    pub fn ytdlp_path(&self) -> &Path {
        &self.ytdlp_path
    }

    /// Run `yt-dlp --version`
    pub async fn version(&self) -> Result<String, ExtractionError> {
        let output = self.command().arg("--version").output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Failed(stderr.trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn command(&self) -> AsyncCommand {
        let mut cmd = AsyncCommand::new(&self.ytdlp_path);
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn id(&self) -> &'static str {
        "ytdlp"
    }

    /// Uses: yt-dlp --dump-single-json --no-download
    async fn extract_info(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<VideoInfo, ExtractionError> {
        debug!("Extracting video info for URL: {}", url);

        let output = self
            .command()
            .args(info_args(url, options))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let lines: Vec<String> = stderr.lines().map(str::to_string).collect();
            let message = failure_message(&lines, output.status);
            error!("yt-dlp extraction failed: {}", message);
            return Err(ExtractionError::Failed(message));
        }

        let video_info: VideoInfo = serde_json::from_slice(&output.stdout)?;
        Ok(video_info)
    }

    async fn download(
        &self,
        url: &str,
        options: &ExtractOptions,
        on_progress: ProgressHook<'_>,
    ) -> Result<(), ExtractionError> {
        debug!("Downloading {} with format {}", url, options.format);

        let mut child = self
            .command()
            .args(download_args(url, options))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractionError::Failed("yt-dlp stdout unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExtractionError::Failed("yt-dlp stderr unavailable".to_string()))?;

        let mut out_reader = BufReader::new(stdout).lines();
        let mut err_reader = BufReader::new(stderr).lines();
        let mut stdout_done = false;
        let mut stderr_done = false;
        let mut diagnostics = Vec::new();

        // yt-dlp may print progress on either stream depending on --quiet
        loop {
            let (line, from_stderr) = tokio::select! {
                res = out_reader.next_line(), if !stdout_done => match res {
                    Ok(Some(line)) => (line, false),
                    Ok(None) => { stdout_done = true; continue; }
                    Err(e) => {
                        warn!("Error reading yt-dlp stdout: {}", e);
                        stdout_done = true;
                        continue;
                    }
                },
                res = err_reader.next_line(), if !stderr_done => match res {
                    Ok(Some(line)) => (line, true),
                    Ok(None) => { stderr_done = true; continue; }
                    Err(e) => {
                        warn!("Error reading yt-dlp stderr: {}", e);
                        stderr_done = true;
                        continue;
                    }
                },
                else => break,
            };

            match parse_progress_line(&line) {
                Some(update) => {
                    if let Err(abort) = on_progress(&update) {
                        info!("Progress hook aborted download of {}: {}", url, abort);
                        if let Err(e) = child.start_kill() {
                            warn!("Failed to kill yt-dlp process: {}", e);
                        }
                        let _ = child.wait().await;
                        return Err(abort);
                    }
                }
                None if from_stderr => diagnostics.push(line),
                None => debug!("yt-dlp: {}", line),
            }
        }

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            let message = failure_message(&diagnostics, status);
            error!("yt-dlp download failed: {}", message);
            Err(ExtractionError::Failed(message))
        }
    }
}

/// Arguments shared by metadata lookups and downloads
fn common_args(options: &ExtractOptions) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["--no-warnings".into()];
    if options.no_playlist {
        args.push("--no-playlist".into());
    }
    if let Some(cookies) = &options.cookie_file {
        args.push("--cookies".into());
        args.push(cookies.into());
    }
    args
}

/// Arguments for a metadata-only lookup
pub fn info_args(url: &str, options: &ExtractOptions) -> Vec<OsString> {
    let mut args = common_args(options);
    args.push("-f".into());
    args.push(options.format.as_str().into());
    args.push("--dump-single-json".into());
    args.push("--no-download".into());
    args.push("--".into());
    args.push(url.into());
    args
}

/// Arguments for a download that reports progress on its own lines
pub fn download_args(url: &str, options: &ExtractOptions) -> Vec<OsString> {
    let mut args = common_args(options);
    args.extend(
        ["--quiet", "--progress", "--newline", "--progress-template", PROGRESS_TEMPLATE]
            .into_iter()
            .map(OsString::from),
    );
    args.push("-f".into());
    args.push(options.format.as_str().into());

    if let Some(container) = &options.merge_output_format {
        args.push("--merge-output-format".into());
        args.push(container.as_str().into());
    }

    for step in &options.postprocessors {
        match step {
            PostProcessor::ExtractAudio { codec, quality } => {
                args.push("--extract-audio".into());
                args.push("--audio-format".into());
                args.push(codec.as_str().into());
                args.push("--audio-quality".into());
                args.push(audio_quality_arg(quality).into());
            }
        }
    }

    if options.windows_filenames {
        args.push("--windows-filenames".into());
    }
    args.push("-o".into());
    args.push(options.output_template.as_str().into());
    args.push("--".into());
    args.push(url.into());
    args
}

/// A bare bitrate such as `192` means kbit/s
fn audio_quality_arg(quality: &str) -> String {
    if !quality.is_empty() && quality.chars().all(|c| c.is_ascii_digit()) {
        format!("{}K", quality)
    } else {
        quality.to_string()
    }
}

/// Parse one line printed through [`PROGRESS_TEMPLATE`]
///
/// yt-dlp renders missing values as `NA`.
pub fn parse_progress_line(line: &str) -> Option<ProgressUpdate> {
    let start = line.find(PROGRESS_PREFIX)?;
    let mut fields = line[start + PROGRESS_PREFIX.len()..].trim().split('|');

    match fields.next()? {
        "downloading" => {
            let downloaded_bytes = number(fields.next()).map(|v| v as u64).unwrap_or(0);
            let total = number(fields.next()).filter(|v| *v > 0.0);
            let estimate = number(fields.next()).filter(|v| *v > 0.0);
            let speed = number(fields.next());
            let eta = fields.next().and_then(|v| v.trim().parse::<u64>().ok());

            Some(ProgressUpdate::Downloading {
                downloaded_bytes,
                total_bytes: total.or(estimate).map(|v| v.round() as u64),
                speed,
                eta,
            })
        }
        "finished" => Some(ProgressUpdate::Finished),
        _ => None,
    }
}

fn number(field: Option<&str>) -> Option<f64> {
    field?.trim().parse::<f64>().ok().filter(|v| v.is_finite() && *v >= 0.0)
}

/// Pick the most useful error text from yt-dlp's diagnostics
fn failure_message(lines: &[String], status: ExitStatus) -> String {
    lines
        .iter()
        .rev()
        .map(|l| l.trim())
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.iter().rev().map(|l| l.trim()).find(|l| !l.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("yt-dlp exited with {}", status))
}

// ============================================================
// yt-dlp Detection Functions
// ============================================================

/// Find yt-dlp binary with priority:
/// 1. Next to the executable
/// 2. System PATH
/// 3. Common installation paths
pub fn find_ytdlp() -> Option<PathBuf> {
    if let Some(bundled) = find_bundled_ytdlp() {
        info!("Using bundled yt-dlp: {:?}", bundled);
        return Some(bundled);
    }

    if let Ok(system) = which::which("yt-dlp") {
        info!("Using system yt-dlp: {:?}", system);
        return Some(system);
    }

    if let Some(common) = find_in_common_paths() {
        info!("Using yt-dlp from common path: {:?}", common);
        return Some(common);
    }

    warn!("yt-dlp not found anywhere!");
    None
}

/// yt-dlp shipped alongside the vidqueue binary
fn find_bundled_ytdlp() -> Option<PathBuf> {
    let exe_path = std::env::current_exe().ok()?;
    let exe_dir = exe_path.parent()?;

    let name = if cfg!(windows) { "yt-dlp.exe" } else { "yt-dlp" };
    let candidate = exe_dir.join(name);
    debug!("Checking bundled path: {:?}", candidate);

    if candidate.is_file() && is_executable(&candidate) {
        Some(candidate)
    } else {
        None
    }
}

fn find_in_common_paths() -> Option<PathBuf> {
    let common_paths = [
        // macOS Homebrew (Apple Silicon)
        "/opt/homebrew/bin/yt-dlp",
        // macOS Homebrew (Intel)
        "/usr/local/bin/yt-dlp",
        "/usr/bin/yt-dlp",
        // pip --user
        "~/.local/bin/yt-dlp",
    ];

    common_paths
        .iter()
        .map(|path_str| match path_str.strip_prefix("~/") {
            Some(rest) => dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(path_str)),
            None => PathBuf::from(path_str),
        })
        .find(|path| path.is_file() && is_executable(path))
}

/// Check if a file is executable
fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.exists()
    }
}

// ============================================================
// Tests
// ============================================================
