use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use super::formats::{AudioFormat, VideoFormat};
use super::tools::{OutputChannels, Tool, ToolResolver};
use crate::error::{MuxkitError, Result};

/// A fully built invocation of one external tool.
///
/// `program` is the resolved invocable; `args` follow in the order the tool
/// expects. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaCommand {
    pub tool: Tool,
    pub program: String,
    pub args: Vec<String>,
    pub description: String,
    pub channels: OutputChannels,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(tool: Tool, program: S1, description: S2) -> Self {
        Self {
            tool,
            program: program.into(),
            args: Vec::new(),
            description: description.into(),
            channels: tool.output_channels(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add a bare path argument
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").path(path)
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.path(path)
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Map streams from the first input
    pub fn map<S: Into<String>>(self, selector: S) -> Self {
        self.arg("-map").arg(selector)
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Set subtitle codec
    pub fn subtitle_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:s").arg(codec)
    }

    /// Copy video stream
    pub fn copy_video(self) -> Self {
        self.video_codec("copy")
    }

    /// Copy audio stream
    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    /// Copy every stream
    pub fn copy_all(self) -> Self {
        self.arg("-c").arg("copy")
    }

    /// The full argument vector, invocable first.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Human-readable command line for logs.
    pub fn command_line(&self) -> String {
        self.argv()
            .iter()
            .map(|arg| {
                if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                    format!("\"{}\"", arg)
                } else {
                    arg.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One track's new properties for `mkvpropedit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackUpdate {
    /// Selector from the property read, e.g. `v1`, `a2`, `s1`.
    pub selector: String,
    pub name: String,
    pub enabled: bool,
    pub default: bool,
}

impl FromStr for TrackUpdate {
    type Err = MuxkitError;

    /// Parses `<selector>,<enabled>,<default>,<name>`; the name may contain commas.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            MuxkitError::Validation(format!(
                "Invalid track update '{}': expected <selector>,<enabled>,<default>,<name>",
                s
            ))
        };

        let mut parts = s.splitn(4, ',');
        let selector = parts.next().map(str::trim).filter(|p| !p.is_empty()).ok_or_else(invalid)?;
        let enabled = parts.next().and_then(parse_flag).ok_or_else(invalid)?;
        let default = parts.next().and_then(parse_flag).ok_or_else(invalid)?;
        let name = parts.next().ok_or_else(invalid)?;

        Ok(TrackUpdate {
            selector: selector.to_string(),
            name: name.to_string(),
            enabled,
            default,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn flag_value(flag: bool) -> &'static str {
    if flag { "1" } else { "0" }
}

/// Which tracks survive a remux with `mkvmerge`.
///
/// Ids are the 0-based ids from the property read. An empty list drops every
/// track of that type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRemovalSpec {
    pub input: PathBuf,
    pub output: PathBuf,
    pub video_ids_to_keep: Vec<u32>,
    pub audio_ids_to_keep: Vec<u32>,
    pub subtitle_ids_to_keep: Vec<u32>,
}

impl TrackRemovalSpec {
    /// Absent keep-lists mean the same as empty ones.
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        input: P,
        output: Q,
        video_ids_to_keep: Option<Vec<u32>>,
        audio_ids_to_keep: Option<Vec<u32>>,
        subtitle_ids_to_keep: Option<Vec<u32>>,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            video_ids_to_keep: video_ids_to_keep.unwrap_or_default(),
            audio_ids_to_keep: audio_ids_to_keep.unwrap_or_default(),
            subtitle_ids_to_keep: subtitle_ids_to_keep.unwrap_or_default(),
        }
    }
}

/// Segment length accepted by ffmpeg's `-segment_time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentTime(String);

impl SegmentTime {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SegmentTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SegmentTime {
    type Err = MuxkitError;

    /// Plain seconds (`600`, `12.5`) or `[HH:]MM:SS[.fff]`.
    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        if value.is_empty() {
            return Err(MuxkitError::Validation("Segment time must not be empty.".to_string()));
        }

        let (clock, fraction) = match value.split_once('.') {
            Some((clock, fraction)) => (clock, Some(fraction)),
            None => (value, None),
        };
        let fraction_ok = fraction.is_none_or(|f| !f.is_empty() && f.chars().all(|c| c.is_ascii_digit()));
        let fields: Vec<&str> = clock.split(':').collect();
        let fields_ok = match fields.as_slice() {
            [seconds] => is_digits(seconds),
            [minutes, seconds] | [_, minutes, seconds] => {
                fields.iter().all(|f| is_digits(f)) && below_sixty(minutes) && below_sixty(seconds)
            }
            _ => false,
        };

        if fields_ok && fraction_ok {
            Ok(SegmentTime(value.to_string()))
        } else {
            Err(MuxkitError::Validation(format!(
                "Invalid segment time '{}': use seconds or HH:MM:SS",
                s
            )))
        }
    }
}

fn is_digits(field: &str) -> bool {
    !field.is_empty() && field.chars().all(|c| c.is_ascii_digit())
}

fn below_sixty(field: &str) -> bool {
    field.parse::<u32>().map(|v| v < 60).unwrap_or(false)
}

/// Escape a path for a `file '...'` line of an ffmpeg concat list.
pub fn escape_concat_path(path: &str) -> String {
    path.replace('\'', "'\\''")
}

/// Contents of an ffmpeg concat list file, one newline-terminated line per clip.
pub fn render_concat_list<S: AsRef<str>>(clips: &[S]) -> String {
    clips
        .iter()
        .map(|clip| format!("file '{}'\n", escape_concat_path(clip.as_ref())))
        .collect()
}

/// File name without its last extension.
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Place `file_name` next to `input`, or bare when `input` has no directory part.
pub fn sibling_path(input: &Path, file_name: &str) -> PathBuf {
    match input.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Output of a remux to `format`: `<dir>/<base>-converted.<ext>`.
pub fn converted_output_path(input: &Path, format: VideoFormat) -> PathBuf {
    sibling_path(input, &format!("{}-converted.{}", base_name(input), format.extension()))
}

/// Segment pattern for a split: `<dir>/<base>-%04d.<original ext>`.
pub fn segment_output_pattern(input: &Path) -> PathBuf {
    let file_name = match input.extension() {
        Some(ext) => format!("{}-%04d.{}", base_name(input), ext.to_string_lossy()),
        None => format!("{}-%04d", base_name(input)),
    };
    sibling_path(input, &file_name)
}

/// Output of one extracted audio track: `<dir>/<base>-audio-<ordinal>.<ext>`.
pub fn audio_output_path(input: &Path, ordinal: usize, format: AudioFormat) -> PathBuf {
    sibling_path(
        input,
        &format!("{}-audio-{}.{}", base_name(input), ordinal, format.extension()),
    )
}

/// Output of one extracted subtitle track: `<dir>/<base>-<language>.srt`.
pub fn subtitle_output_path(input: &Path, language: &str) -> PathBuf {
    sibling_path(input, &format!("{}-{}.srt", base_name(input), language))
}

/// Builds the argument vector of every supported operation.
pub struct MediaCommandBuilder {
    resolver: Arc<ToolResolver>,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new(resolver: Arc<ToolResolver>) -> Self {
        Self { resolver }
    }

    fn command<S: Into<String>>(&self, tool: Tool, description: S) -> MediaCommand {
        MediaCommand::new(tool, self.resolver.resolve(tool), description)
    }

    /// Remux every stream into `format` without re-encoding.
    pub fn convert(&self, input: &Path, output: &Path, format: VideoFormat) -> MediaCommand {
        self.command(Tool::Ffmpeg, format!("Convert to {}", format.extension()))
            .overwrite()
            .input(input)
            .map("0")
            .copy_video()
            .copy_audio()
            .subtitle_codec(format.subtitle_codec())
            .output(output)
    }

    /// Cut `input` into segments of `segment_time` using the segment muxer.
    pub fn split(&self, input: &Path, segment_time: &SegmentTime, output_pattern: &Path) -> MediaCommand {
        self.command(Tool::Ffmpeg, "Split video")
            .overwrite()
            .input(input)
            .copy_all()
            .map("0")
            .arg("-segment_time")
            .arg(segment_time.as_str())
            .arg("-f")
            .arg("segment")
            .arg("-reset_timestamps")
            .arg("1")
            .output(output_pattern)
    }

    /// Concatenate the clips listed in `list_file` with the concat demuxer.
    pub fn merge(&self, list_file: &Path, output: &Path) -> MediaCommand {
        self.command(Tool::Ffmpeg, "Merge clips")
            .arg("-f")
            .arg("concat")
            .arg("-safe")
            .arg("0")
            .input(list_file)
            .copy_all()
            .output(output)
    }

    /// List every stream of `input` as JSON.
    pub fn probe_streams(&self, input: &Path) -> MediaCommand {
        self.command(Tool::Ffprobe, "Probe streams")
            .arg("-v")
            .arg("quiet")
            .arg("-print_format")
            .arg("json")
            .arg("-show_streams")
            .path(input)
    }

    /// Extract the `ordinal`-th audio stream (0-based among audio streams).
    pub fn extract_audio(&self, input: &Path, ordinal: usize, format: AudioFormat, output: &Path) -> MediaCommand {
        let command = self
            .command(Tool::Ffmpeg, format!("Extract audio track {}", ordinal))
            .overwrite()
            .input(input)
            .map(format!("0:a:{}", ordinal));

        let command = match format.bitrate() {
            Some(bitrate) => command.arg("-b:a").arg(bitrate),
            None => command,
        };
        command.output(output)
    }

    /// Extract the subtitle stream at absolute index `stream_index` as SubRip.
    pub fn extract_subtitle(&self, input: &Path, stream_index: u32, output: &Path) -> MediaCommand {
        self.command(Tool::Ffmpeg, format!("Extract subtitle stream {}", stream_index))
            .overwrite()
            .input(input)
            .map(format!("0:{}", stream_index))
            .subtitle_codec("srt")
            .output(output)
    }

    /// Report container and track properties as JSON.
    pub fn identify(&self, file: &Path) -> MediaCommand {
        self.command(Tool::Mkvmerge, "Read properties").arg("-J").path(file)
    }

    /// Set the title and per-track name/enabled/default flags in place.
    pub fn edit_properties(&self, file: &Path, title: &str, updates: &[TrackUpdate]) -> MediaCommand {
        let mut command = self
            .command(Tool::Mkvpropedit, "Edit properties")
            .path(file)
            .arg("--edit")
            .arg("info")
            .arg("--set")
            .arg(format!("title={}", title));

        for update in updates {
            command = command
                .arg("--edit")
                .arg(format!("track:{}", update.selector))
                .arg("--set")
                .arg(format!("name={}", update.name))
                .arg("--set")
                .arg(format!("flag-enabled={}", flag_value(update.enabled)))
                .arg("--set")
                .arg(format!("flag-default={}", flag_value(update.default)));
        }
        command
    }

    /// Remux keeping only the listed tracks. Attachments are always dropped.
    pub fn remove_tracks(&self, removal: &TrackRemovalSpec) -> MediaCommand {
        let command = self
            .command(Tool::Mkvmerge, "Remove tracks")
            .arg("-o")
            .path(&removal.output);
        let command = keep_or_drop(command, &removal.video_ids_to_keep, "-d", "--no-video");
        let command = keep_or_drop(command, &removal.audio_ids_to_keep, "-a", "--no-audio");
        let command = keep_or_drop(command, &removal.subtitle_ids_to_keep, "-s", "--no-subtitles");

        command.arg("--no-attachments").path(&removal.input)
    }

    /// Print the tool's version banner.
    pub fn version(&self, tool: Tool) -> MediaCommand {
        self.command(tool, "Version check").arg(tool.version_flag())
    }
}

fn keep_or_drop(command: MediaCommand, ids: &[u32], keep_flag: &str, drop_flag: &str) -> MediaCommand {
    if ids.is_empty() {
        command.arg(drop_flag)
    } else {
        let joined = ids.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
        command.arg(keep_flag).arg(joined)
    }
}
