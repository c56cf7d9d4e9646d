//! Progress reporting for the active download

use crate::extractor::ProgressUpdate;

/// Shown while the total size is unknown
pub const SIZE_UNKNOWN_MESSAGE: &str = "Downloading...";

/// Shown once the transfer is done and post-processing starts
pub const TRANSFER_FINISHED_MESSAGE: &str = "Download complete, processing file...";

/// Snapshot of an in-flight transfer
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadProgress {
    pub total_bytes: Option<u64>,
    pub downloaded_bytes: u64,
    pub speed: Option<f64>, // bytes per second
    pub eta: Option<u64>,   // seconds
}

impl DownloadProgress {
    /// Get progress percentage (0.0 to 100.0), `None` while the size is unknown
    pub fn percentage(&self) -> Option<f64> {
        match self.total_bytes {
            Some(total) if total > 0 => {
                Some((self.downloaded_bytes as f64 / total as f64 * 100.0).clamp(0.0, 100.0))
            }
            _ => None,
        }
    }

    /// Speed in MB/s with one decimal, or `N/A`
    pub fn speed_text(&self) -> String {
        match self.speed {
            Some(bps) => format!("{:.1} MB/s", bps / 1024.0 / 1024.0),
            None => "N/A".to_string(),
        }
    }

    pub fn eta_text(&self) -> String {
        match self.eta {
            Some(secs) => format!("{}s", secs),
            None => "N/A".to_string(),
        }
    }

    /// Percent and display line for the presentation layer
    pub fn report(&self) -> (f64, String) {
        match self.percentage() {
            Some(percent) => (
                percent,
                format!(
                    "{:.1}% | {} | ETA: {}",
                    percent,
                    self.speed_text(),
                    self.eta_text()
                ),
            ),
            None => (0.0, SIZE_UNKNOWN_MESSAGE.to_string()),
        }
    }
}

/// Turn a raw capability notification into `(percent, message)`
pub fn describe(update: &ProgressUpdate) -> (f64, String) {
    match *update {
        ProgressUpdate::Downloading {
            downloaded_bytes,
            total_bytes,
            speed,
            eta,
        } => DownloadProgress {
            total_bytes,
            downloaded_bytes,
            speed,
            eta,
        }
        .report(),
        ProgressUpdate::Finished => (100.0, TRANSFER_FINISHED_MESSAGE.to_string()),
    }
}
