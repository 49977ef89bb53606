use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::MuxkitError;

/// Target containers for a lossless remux.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFormat {
    Mp4,
    Mkv,
    Mov,
}

impl VideoFormat {
    pub const ALL: [VideoFormat; 3] = [VideoFormat::Mp4, VideoFormat::Mkv, VideoFormat::Mov];

    pub fn extension(self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "mp4",
            VideoFormat::Mkv => "mkv",
            VideoFormat::Mov => "mov",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "MPEG-4 Part 14",
            VideoFormat::Mkv => "Matroska Multimedia Container",
            VideoFormat::Mov => "QuickTime File Format",
        }
    }

    /// Subtitle codec ffmpeg must use when writing this container.
    ///
    /// MP4 and MOV only carry `mov_text` subtitles, so text subtitles are
    /// transcoded; Matroska accepts every subtitle codec as-is.
    pub fn subtitle_codec(self) -> &'static str {
        match self {
            VideoFormat::Mp4 | VideoFormat::Mov => "mov_text",
            VideoFormat::Mkv => "copy",
        }
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.extension().to_uppercase(), self.description())
    }
}

impl FromStr for VideoFormat {
    type Err = MuxkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.').to_lowercase();
        VideoFormat::ALL
            .into_iter()
            .find(|format| format.extension() == wanted)
            .ok_or_else(|| MuxkitError::Validation(format!("No video format found for extension: {}", s)))
    }
}

/// Output encodings for audio track extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Aac,
    Mp3,
    Wav,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 3] = [AudioFormat::Aac, AudioFormat::Mp3, AudioFormat::Wav];

    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Aac => "aac",
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AudioFormat::Aac => "Advanced Audio Coding",
            AudioFormat::Mp3 => "MPEG Audio Layer III",
            AudioFormat::Wav => "Waveform Audio File Format",
        }
    }

    /// Fixed bitrate for lossy encodings; PCM output takes no bitrate flag.
    pub fn bitrate(self) -> Option<&'static str> {
        match self {
            AudioFormat::Aac | AudioFormat::Mp3 => Some("320k"),
            AudioFormat::Wav => None,
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.extension().to_uppercase(), self.description())
    }
}

impl FromStr for AudioFormat {
    type Err = MuxkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.').to_lowercase();
        AudioFormat::ALL
            .into_iter()
            .find(|format| format.extension() == wanted)
            .ok_or_else(|| MuxkitError::Validation(format!("No audio format found for extension: {}", s)))
    }
}

/// Track kinds as reported by `mkvmerge -J`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrackType {
    Video,
    Audio,
    Subtitles,
    Unknown,
}

impl TrackType {
    /// Parse the `type` field; anything unrecognised is `Unknown`.
    pub fn from_json_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "video" => TrackType::Video,
            "audio" => TrackType::Audio,
            "subtitles" => TrackType::Subtitles,
            _ => TrackType::Unknown,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            TrackType::Video => "video",
            TrackType::Audio => "audio",
            TrackType::Subtitles => "subtitles",
            TrackType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
