use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{MuxkitError, Result};

const DEFAULT_LANGUAGE: &str = "und";

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    streams: Vec<ProbeStream>,
}

/// One entry of ffprobe's `streams` array.
#[derive(Debug, Clone, Deserialize)]
struct ProbeStream {
    index: u32,
    #[serde(default)]
    codec_type: Option<String>,
    #[serde(default)]
    tags: HashMap<String, Value>,
}

impl ProbeStream {
    fn is(&self, codec_type: &str) -> bool {
        self.codec_type.as_deref() == Some(codec_type)
    }

    fn language(&self) -> String {
        self.tags
            .get("language")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string()
    }
}

/// An audio stream addressed by its position among audio streams (`0:a:N`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioStream {
    pub ordinal: usize,
    pub index: u32,
}

/// A subtitle stream addressed by its absolute stream index (`0:N`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleStream {
    pub index: u32,
    pub language: String,
}

/// Parsed output of `ffprobe -show_streams -print_format json`.
#[derive(Debug, Clone)]
pub struct StreamListing {
    streams: Vec<ProbeStream>,
}

impl StreamListing {
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Err(MuxkitError::MalformedOutput("ffprobe returned empty output.".to_string()));
        }

        let output: ProbeOutput =
            serde_json::from_str(json).map_err(|e| MuxkitError::parse("ffprobe stream listing", e))?;
        Ok(Self { streams: output.streams })
    }

    pub fn audio_streams(&self) -> Vec<AudioStream> {
        self.streams
            .iter()
            .filter(|s| s.is("audio"))
            .enumerate()
            .map(|(ordinal, s)| AudioStream { ordinal, index: s.index })
            .collect()
    }

    pub fn subtitle_streams(&self) -> Vec<SubtitleStream> {
        self.streams
            .iter()
            .filter(|s| s.is("subtitle"))
            .map(|s| SubtitleStream {
                index: s.index,
                language: s.language(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264"},
            {"index": 1, "codec_type": "audio", "codec_name": "aac", "tags": {"language": "eng"}},
            {"index": 2, "codec_type": "subtitle", "codec_name": "subrip", "tags": {"language": "eng"}},
            {"index": 3, "codec_type": "audio", "codec_name": "ac3"},
            {"index": 4, "codec_type": "subtitle", "codec_name": "ass", "tags": {"title": "Signs"}},
            {"index": 5, "codec_type": "attachment", "tags": {"filename": "font.ttf"}}
        ]
    }"#;

    #[test]
    fn test_audio_streams_are_numbered_among_audio_only() {
        let listing = StreamListing::from_json(LISTING).unwrap();
        assert_eq!(
            listing.audio_streams(),
            vec![AudioStream { ordinal: 0, index: 1 }, AudioStream { ordinal: 1, index: 3 }]
        );
    }

    #[test]
    fn test_subtitle_language_defaults_to_und() {
        let listing = StreamListing::from_json(LISTING).unwrap();
        assert_eq!(
            listing.subtitle_streams(),
            vec![
                SubtitleStream { index: 2, language: "eng".to_string() },
                SubtitleStream { index: 4, language: "und".to_string() },
            ]
        );
    }

    #[test]
    fn test_no_streams() {
        let listing = StreamListing::from_json(r#"{"streams": []}"#).unwrap();
        assert!(listing.audio_streams().is_empty());
        assert!(listing.subtitle_streams().is_empty());
    }

    #[test]
    fn test_empty_output_is_rejected() {
        let err = StreamListing::from_json("  \n").unwrap_err();
        assert!(matches!(err, MuxkitError::MalformedOutput(_)));
        assert!(err.to_string().contains("ffprobe returned empty output."));
    }

    #[test]
    fn test_missing_streams_key_is_a_parse_error() {
        let err = StreamListing::from_json(r#"{"format": {}}"#).unwrap_err();
        assert!(matches!(err, MuxkitError::Parse { .. }));
        assert!(err.to_string().starts_with("JSON parsing error in ffprobe stream listing"));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        assert!(matches!(
            StreamListing::from_json("not json").unwrap_err(),
            MuxkitError::Parse { .. }
        ));
    }
}
