//! Container and track properties as reported by `mkvmerge -J`.

use serde::{Deserialize, Serialize};

use super::formats::TrackType;
use crate::error::{MuxkitError, Result};

const PARSE_CONTEXT: &str = "MKV properties";

#[derive(Debug, Deserialize)]
struct IdentifyOutput {
    #[serde(default)]
    container: Option<IdentifyContainer>,
    tracks: Vec<IdentifyTrack>,
}

#[derive(Debug, Default, Deserialize)]
struct IdentifyContainer {
    #[serde(default)]
    properties: Option<ContainerProperties>,
}

#[derive(Debug, Default, Deserialize)]
struct ContainerProperties {
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdentifyTrack {
    id: u32,
    #[serde(rename = "type")]
    track_type: String,
    codec: String,
    #[serde(default)]
    properties: TrackProperties,
}

#[derive(Debug, Deserialize)]
struct TrackProperties {
    #[serde(default)]
    track_name: String,
    #[serde(default)]
    default_track: bool,
    #[serde(default = "enabled_by_default")]
    enabled_track: bool,
    #[serde(default = "undetermined_language")]
    language: String,
}

impl Default for TrackProperties {
    fn default() -> Self {
        Self {
            track_name: String::new(),
            default_track: false,
            enabled_track: true,
            language: undetermined_language(),
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

fn undetermined_language() -> String {
    "und".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MkvTrack {
    /// 0-based id used by mkvmerge track selection.
    pub id: u32,
    /// `v1`, `a2`, `s1`... for mkvpropedit; `@<id+1>` for other track types.
    pub selector: String,
    pub track_type: TrackType,
    pub codec: String,
    pub name: String,
    pub default_track: bool,
    pub enabled_track: bool,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MkvPropertyInfo {
    pub title: String,
    pub tracks: Vec<MkvTrack>,
}

impl MkvPropertyInfo {
    pub fn from_json(json: &str) -> Result<Self> {
        let output: IdentifyOutput =
            serde_json::from_str(json).map_err(|e| MuxkitError::parse(PARSE_CONTEXT, e))?;

        let title = output
            .container
            .and_then(|c| c.properties)
            .and_then(|p| p.title)
            .unwrap_or_default();

        let (mut video, mut audio, mut subtitles) = (0u32, 0u32, 0u32);
        let tracks = output
            .tracks
            .into_iter()
            .map(|track| {
                let track_type = TrackType::from_json_name(&track.track_type);
                let selector = match track_type {
                    TrackType::Video => {
                        video += 1;
                        format!("v{}", video)
                    }
                    TrackType::Audio => {
                        audio += 1;
                        format!("a{}", audio)
                    }
                    TrackType::Subtitles => {
                        subtitles += 1;
                        format!("s{}", subtitles)
                    }
                    TrackType::Unknown => format!("@{}", u64::from(track.id) + 1),
                };

                MkvTrack {
                    id: track.id,
                    selector,
                    track_type,
                    codec: track.codec,
                    name: track.properties.track_name,
                    default_track: track.properties.default_track,
                    enabled_track: track.properties.enabled_track,
                    language: track.properties.language,
                }
            })
            .collect();

        Ok(Self { title, tracks })
    }
}
