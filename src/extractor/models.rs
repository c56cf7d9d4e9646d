//! Data structures for video information

use serde::{Deserialize, Serialize};

/// Metadata reported by the capability before downloading
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoInfo {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "webpage_url")]
    pub url: String,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub extractor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ytdlp_dump() {
        let json = r#"{
            "id": "abc123",
            "title": "A Title",
            "webpage_url": "https://x.test/a",
            "ext": "webm",
            "duration": 61.5,
            "uploader": "someone",
            "extractor": "generic",
            "formats": [{"format_id": "18"}]
        }"#;
        let info: VideoInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.title, "A Title");
        assert_eq!(info.url, "https://x.test/a");
        assert_eq!(info.duration, Some(61.5));
    }

    #[test]
    fn missing_title_is_empty() {
        let info: VideoInfo = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert!(info.title.is_empty());
    }
}
