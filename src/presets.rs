//! Named quality presets and the yt-dlp settings they map to

use crate::extractor::PostProcessor;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Preset used whenever a name is not recognised
pub const DEFAULT_PRESET: &str = "Best (Video + Audio)";

/// Format selection and post-processing applied to one download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetConfig {
    /// yt-dlp format selector, e.g. `bestvideo[height<=720]+bestaudio/best`
    pub format: &'static str,
    /// Container used when separate video and audio streams are merged
    pub merge_output_format: Option<&'static str>,
    pub postprocessors: Vec<PostProcessor>,
}

/// Preset names in display order
pub const PRESET_NAMES: [&str; 4] = [
    DEFAULT_PRESET,
    "1080p (MP4)",
    "720p (MP4)",
    "Audio Only (MP3)",
];

fn table() -> &'static BTreeMap<&'static str, PresetConfig> {
    static TABLE: OnceLock<BTreeMap<&'static str, PresetConfig>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut presets = BTreeMap::new();
        presets.insert(
            DEFAULT_PRESET,
            PresetConfig {
                format: "best",
                merge_output_format: None,
                postprocessors: Vec::new(),
            },
        );
        presets.insert(
            "1080p (MP4)",
            PresetConfig {
                format: "bestvideo[height<=1080]+bestaudio/best[height<=1080]/best",
                merge_output_format: Some("mp4"),
                postprocessors: Vec::new(),
            },
        );
        presets.insert(
            "720p (MP4)",
            PresetConfig {
                format: "bestvideo[height<=720]+bestaudio/best[height<=720]/best",
                merge_output_format: Some("mp4"),
                postprocessors: Vec::new(),
            },
        );
        presets.insert(
            "Audio Only (MP3)",
            PresetConfig {
                format: "bestaudio/best",
                merge_output_format: None,
                postprocessors: vec![PostProcessor::ExtractAudio {
                    codec: "mp3".to_string(),
                    quality: "192".to_string(),
                }],
            },
        );
        presets
    })
}

/// Look up a preset by name, falling back to [`DEFAULT_PRESET`] for unknown names.
pub fn resolve(name: &str) -> &'static PresetConfig {
    let presets = table();
    presets
        .get(name)
        .or_else(|| presets.get(DEFAULT_PRESET))
        .unwrap_or_else(|| unreachable!("default preset is always present"))
}

pub fn is_known(name: &str) -> bool {
    table().contains_key(name)
}

/// Name that will actually be applied for `name`
pub fn canonical_name(name: &str) -> &'static str {
    PRESET_NAMES
        .iter()
        .copied()
        .find(|known| *known == name)
        .unwrap_or(DEFAULT_PRESET)
}
