//! vidqueue - sequential video downloader
//!
//! Queues video URLs, applies a quality preset to each and downloads them one
//! at a time through yt-dlp, printing live progress and a log.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use vidqueue::app::{self, RunRequest};
use vidqueue::extractor::{Extractor, YtDlpExtractor};
use vidqueue::presets;
use vidqueue::utils::{default_settings_path, AppSettings};

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Video URLs to download, in order
    urls: Vec<String>,

    /// Read additional URLs from a file, one per line
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Quality preset (see --list-presets)
    #[arg(short, long)]
    preset: Option<String>,

    /// Output folder
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// cookies.txt for authenticated downloads
    #[arg(short, long)]
    cookies: Option<PathBuf>,

    /// Path to the yt-dlp executable
    #[arg(long)]
    ytdlp: Option<PathBuf>,

    /// Settings file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the available presets and exit
    #[arg(long)]
    list_presets: bool,

    /// Emit events as JSON lines
    #[arg(long)]
    json: bool,

    /// More diagnostics
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if args.list_presets {
        for name in presets::PRESET_NAMES {
            let preset = presets::resolve(name);
            println!("{:<20} {}", name, preset.format);
        }
        return Ok(());
    }

    let settings = build_settings(&args)?;
    let urls = collect_urls(&args)?;

    let extractor = match &settings.ytdlp_path {
        Some(path) => YtDlpExtractor::with_path(path),
        None => YtDlpExtractor::new()?,
    };

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(async move {
        check_ytdlp_installed(&extractor).await;
        let extractor: Arc<dyn Extractor> = Arc::new(extractor);
        app::run(
            settings,
            extractor,
            RunRequest {
                urls,
                preset: args.preset.clone(),
                json: args.json,
            },
        )
        .await
    })?;

    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

fn build_settings(args: &Args) -> Result<AppSettings> {
    let path = args.config.clone().unwrap_or_else(default_settings_path);
    let mut settings = AppSettings::load(&path)?;

    if let Some(output) = &args.output {
        settings.output_dir = output.clone();
    }
    if let Some(cookies) = &args.cookies {
        settings.cookie_file = Some(cookies.clone());
    }
    if let Some(ytdlp) = &args.ytdlp {
        settings.ytdlp_path = Some(ytdlp.clone());
    }
    settings.output_dir = settings.absolute_output_dir();

    if let Some(preset) = &args.preset {
        if !presets::is_known(preset) {
            warn!(
                "Unknown preset {:?}, \"{}\" will be used",
                preset,
                presets::canonical_name(preset)
            );
        }
    }

    info!("Saving to {}", settings.output_dir.display());
    Ok(settings)
}

fn collect_urls(args: &Args) -> Result<String> {
    let mut urls = args.urls.join("\n");
    if let Some(file) = &args.file {
        let content = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read URL list {}", file.display()))?;
        urls.push('\n');
        urls.push_str(&content);
    }
    Ok(urls)
}

async fn check_ytdlp_installed(extractor: &YtDlpExtractor) {
    match extractor.version().await {
        Ok(version) => info!(
            "yt-dlp {} at {}",
            version,
            extractor.ytdlp_path().display()
        ),
        Err(e) => {
            // Keep going; every item will fail with the underlying error
            warn!("yt-dlp at {} is not usable: {}", extractor.ytdlp_path().display(), e);
            warn!("Please install yt-dlp: pip install yt-dlp, or visit https://github.com/yt-dlp/yt-dlp");
        }
    }
}
