//! Probe-then-extract operations.
//!
//! One ffprobe run lists the streams; every matching stream then gets its own
//! ffmpeg task on a `JoinSet`. The aggregate fails with the first failure to
//! complete, but only after every sibling task has finished.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::report;
use crate::error::{MuxkitError, Result};
use crate::media::probe::StreamListing;
use crate::media::{
    AudioFormat, CommandExecutor, MediaCommand, MediaCommandBuilder, audio_output_path, run_classified,
    subtitle_output_path,
};
use crate::progress::Reporter;

pub const NO_AUDIO_MESSAGE: &str = "No audio tracks found in the video.";
pub const NO_SUBTITLES_MESSAGE: &str = "No subtitle tracks found in the video.";
pub const SUBTITLES_DONE_MESSAGE: &str = "Subtitle extraction complete for all tracks.";

/// One file written by an extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTrack {
    pub stream_index: u32,
    pub output: PathBuf,
}

/// A planned extraction and the message used if it fails.
struct ExtractionJob {
    stream_index: u32,
    output: PathBuf,
    command: MediaCommand,
    label: String,
}

async fn probe(
    executor: &dyn CommandExecutor,
    builder: &MediaCommandBuilder,
    input: &Path,
    reporter: &Reporter,
) -> Result<StreamListing> {
    let command = builder.probe_streams(input);
    let outcome = run_classified(executor, &command, reporter).await?;
    StreamListing::from_json(outcome.payload.as_deref().unwrap_or_default())
}

/// Run every job concurrently and wait for all of them.
async fn run_all(
    executor: &Arc<dyn CommandExecutor>,
    jobs: Vec<ExtractionJob>,
    kind: &str,
    reporter: &Reporter,
) -> Result<Vec<ExtractedTrack>> {
    let mut tasks = JoinSet::new();
    for job in jobs {
        let executor = executor.clone();
        let reporter = reporter.clone();
        tasks.spawn(async move {
            run_classified(executor.as_ref(), &job.command, &reporter)
                .await
                .map(|_| ExtractedTrack {
                    stream_index: job.stream_index,
                    output: job.output,
                })
                .map_err(|e| track_failure(&job.label, e))
        });
    }

    let mut extracted = Vec::new();
    let mut first_failure: Option<String> = None;
    while let Some(joined) = tasks.join_next().await {
        let failure = match joined {
            Ok(Ok(track)) => {
                debug!("Extracted stream {} to {}", track.stream_index, track.output.display());
                extracted.push(track);
                continue;
            }
            Ok(Err(message)) => message,
            Err(e) => format!("extraction task aborted: {}", e),
        };
        warn!("{} extraction task failed: {}", kind, failure);
        first_failure.get_or_insert(failure);
    }

    match first_failure {
        Some(message) => Err(MuxkitError::Extraction {
            kind: kind.to_string(),
            message,
        }),
        None => {
            extracted.sort_by_key(|t| t.stream_index);
            Ok(extracted)
        }
    }
}

fn track_failure(label: &str, error: MuxkitError) -> String {
    match error {
        MuxkitError::Tool {
            exit_code: Some(code), ..
        } => format!("FFmpeg process for {} failed with exit code: {}", label, code),
        other => format!("FFmpeg process for {} failed: {}", label, other),
    }
}

/// Extracts every audio stream into its own file.
pub struct AudioExtractor {
    executor: Arc<dyn CommandExecutor>,
    builder: Arc<MediaCommandBuilder>,
}

impl AudioExtractor {
    pub fn new(executor: Arc<dyn CommandExecutor>, builder: Arc<MediaCommandBuilder>) -> Self {
        Self { executor, builder }
    }

    pub async fn extract(&self, input: &Path, format: AudioFormat, reporter: &Reporter) -> Result<Vec<ExtractedTrack>> {
        let result = self.run(input, format, reporter).await;
        report(reporter, result, |tracks| match tracks.len() {
            0 => NO_AUDIO_MESSAGE.to_string(),
            n => format!("Audio extraction complete for all {} tracks.", n),
        })
    }

    async fn run(&self, input: &Path, format: AudioFormat, reporter: &Reporter) -> Result<Vec<ExtractedTrack>> {
        let listing = probe(self.executor.as_ref(), &self.builder, input, reporter).await?;
        let streams = listing.audio_streams();
        info!("Found {} audio streams in {}", streams.len(), input.display());

        let jobs = streams
            .into_iter()
            .map(|stream| {
                let output = audio_output_path(input, stream.ordinal, format);
                ExtractionJob {
                    stream_index: stream.index,
                    command: self.builder.extract_audio(input, stream.ordinal, format, &output),
                    output,
                    label: format!("audio track {}", stream.ordinal),
                }
            })
            .collect();

        run_all(&self.executor, jobs, "audio", reporter).await
    }
}

/// Extracts every subtitle stream to SubRip.
pub struct SubtitleExtractor {
    executor: Arc<dyn CommandExecutor>,
    builder: Arc<MediaCommandBuilder>,
}

impl SubtitleExtractor {
    pub fn new(executor: Arc<dyn CommandExecutor>, builder: Arc<MediaCommandBuilder>) -> Self {
        Self { executor, builder }
    }

    pub async fn extract(&self, input: &Path, reporter: &Reporter) -> Result<Vec<ExtractedTrack>> {
        let result = self.run(input, reporter).await;
        report(reporter, result, |tracks| {
            if tracks.is_empty() {
                NO_SUBTITLES_MESSAGE.to_string()
            } else {
                SUBTITLES_DONE_MESSAGE.to_string()
            }
        })
    }

    async fn run(&self, input: &Path, reporter: &Reporter) -> Result<Vec<ExtractedTrack>> {
        let listing = probe(self.executor.as_ref(), &self.builder, input, reporter).await?;
        let streams = listing.subtitle_streams();
        info!("Found {} subtitle streams in {}", streams.len(), input.display());

        let jobs = streams
            .into_iter()
            .map(|stream| {
                let output = subtitle_output_path(input, &stream.language);
                ExtractionJob {
                    stream_index: stream.index,
                    command: self.builder.extract_subtitle(input, stream.index, &output),
                    output,
                    label: format!("track {} ('{}')", stream.index, stream.language),
                }
            })
            .collect();

        run_all(&self.executor, jobs, "subtitle", reporter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::Tool;
    use crate::operations::testing::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const TWO_AUDIO_TWO_SUBS: &str = r#"{"streams": [
        {"index": 0, "codec_type": "video"},
        {"index": 1, "codec_type": "audio", "tags": {"language": "eng"}},
        {"index": 2, "codec_type": "subtitle", "tags": {"language": "eng"}},
        {"index": 3, "codec_type": "subtitle", "tags": {"language": "jpn"}},
        {"index": 4, "codec_type": "audio"}
    ]}"#;

    fn probe_then(ffprobe_json: &'static str, extraction_exit: fn(&MediaCommand) -> i32) -> Arc<ScriptedExecutor> {
        ScriptedExecutor::new(move |command| match command.tool {
            Tool::Ffprobe => exited(command, 0, ffprobe_json, ""),
            _ => exited(command, extraction_exit(command), "", ""),
        })
    }

    #[tokio::test]
    async fn test_audio_extraction_fans_out_per_stream() {
        let executor = probe_then(TWO_AUDIO_TWO_SUBS, |_| 0);
        let extractor = AudioExtractor::new(executor.clone(), builder());
        let (listener, reporter) = recording();

        let tracks = extractor
            .extract(Path::new("/v/my_video.mkv"), AudioFormat::Mp3, &reporter)
            .await
            .unwrap();

        assert_eq!(
            tracks,
            vec![
                ExtractedTrack { stream_index: 1, output: PathBuf::from("/v/my_video-audio-0.mp3") },
                ExtractedTrack { stream_index: 4, output: PathBuf::from("/v/my_video-audio-1.mp3") },
            ]
        );
        assert_eq!(
            listener.terminal_events(),
            vec![Event::Complete("Audio extraction complete for all 2 tracks.".to_string())]
        );

        let maps: Vec<String> = executor
            .commands()
            .iter()
            .filter(|c| c.tool == Tool::Ffmpeg)
            .map(|c| c.args[c.args.iter().position(|a| a == "-map").unwrap() + 1].clone())
            .collect();
        assert_eq!(maps.len(), 2);
        assert!(maps.contains(&"0:a:0".to_string()) && maps.contains(&"0:a:1".to_string()));
    }

    #[tokio::test]
    async fn test_no_audio_streams_completes_without_launching() {
        let executor = probe_then(r#"{"streams": [{"index": 0, "codec_type": "video"}]}"#, |_| 0);
        let extractor = AudioExtractor::new(executor.clone(), builder());
        let (listener, reporter) = recording();

        let tracks = extractor.extract(Path::new("a.mp4"), AudioFormat::Aac, &reporter).await.unwrap();

        assert!(tracks.is_empty());
        assert_eq!(executor.commands().len(), 1);
        assert_eq!(listener.terminal_events(), vec![Event::Complete(NO_AUDIO_MESSAGE.to_string())]);
    }

    #[tokio::test]
    async fn test_probe_failure_fails_without_extractions() {
        let executor = ScriptedExecutor::new(|command| exited(command, 1, "a.mp4: No such file or directory\n", ""));
        let extractor = AudioExtractor::new(executor.clone(), builder());
        let (listener, reporter) = recording();

        assert!(extractor.extract(Path::new("a.mp4"), AudioFormat::Aac, &reporter).await.is_err());
        assert_eq!(executor.commands().len(), 1);
        assert!(matches!(
            listener.terminal_events().as_slice(),
            [Event::Error(m)] if m.contains("No such file or directory")
        ));
    }

    #[tokio::test]
    async fn test_unparseable_probe_output_is_a_parse_error() {
        let executor = probe_then("{not json", |_| 0);
        let extractor = SubtitleExtractor::new(executor.clone(), builder());
        let (listener, reporter) = recording();

        let err = extractor.extract(Path::new("a.mkv"), &reporter).await.unwrap_err();
        assert!(matches!(err, MuxkitError::Parse { .. }));
        assert_eq!(executor.commands().len(), 1);
        assert_eq!(listener.terminal_events().len(), 1);
    }

    #[tokio::test]
    async fn test_subtitle_extraction_names_outputs_by_language() {
        let executor = probe_then(TWO_AUDIO_TWO_SUBS, |_| 0);
        let extractor = SubtitleExtractor::new(executor.clone(), builder());
        let (listener, reporter) = recording();

        let tracks = extractor.extract(Path::new("/path/to/video.mkv"), &reporter).await.unwrap();

        let outputs: Vec<PathBuf> = tracks.into_iter().map(|t| t.output).collect();
        assert_eq!(
            outputs,
            vec![PathBuf::from("/path/to/video-eng.srt"), PathBuf::from("/path/to/video-jpn.srt")]
        );
        assert_eq!(listener.terminal_events(), vec![Event::Complete(SUBTITLES_DONE_MESSAGE.to_string())]);
    }

    #[tokio::test]
    async fn test_no_subtitles_message() {
        let executor = probe_then(r#"{"streams": []}"#, |_| 0);
        let extractor = SubtitleExtractor::new(executor, builder());
        let (listener, reporter) = recording();

        extractor.extract(Path::new("a.mkv"), &reporter).await.unwrap();
        assert_eq!(listener.terminal_events(), vec![Event::Complete(NO_SUBTITLES_MESSAGE.to_string())]);
    }

    #[tokio::test]
    async fn test_one_failed_track_fails_the_aggregate() {
        let executor = probe_then(TWO_AUDIO_TWO_SUBS, |command| {
            if command.args.contains(&"0:3".to_string()) { 1 } else { 0 }
        });
        let extractor = SubtitleExtractor::new(executor.clone(), builder());
        let (listener, reporter) = recording();

        let err = extractor.extract(Path::new("/v/movie.mkv"), &reporter).await.unwrap_err();

        assert_eq!(
            err.to_string(),
            "An error occurred during subtitle extraction: FFmpeg process for track 3 ('jpn') failed with exit code: 1"
        );
        assert_eq!(executor.commands().len(), 3);
        assert_eq!(listener.terminal_events(), vec![Event::Error(err.to_string())]);
    }

    struct SlowSibling {
        finished: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl CommandExecutor for SlowSibling {
        async fn execute(
            &self,
            command: &MediaCommand,
            _reporter: &Reporter,
        ) -> Result<crate::media::ExecutionResult> {
            match command.tool {
                Tool::Ffprobe => exited(command, 0, TWO_AUDIO_TWO_SUBS, ""),
                _ if command.args.contains(&"0:a:0".to_string()) => exited(command, 1, "boom", ""),
                _ => {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    self.finished.fetch_add(1, Ordering::SeqCst);
                    exited(command, 0, "", "")
                }
            }
        }
    }

    #[tokio::test]
    async fn test_failure_waits_for_siblings() {
        let finished = Arc::new(AtomicUsize::new(0));
        let executor = Arc::new(SlowSibling { finished: finished.clone() });
        let extractor = AudioExtractor::new(executor, builder());
        let (listener, reporter) = recording();

        let err = extractor.extract(Path::new("a.mkv"), AudioFormat::Wav, &reporter).await.unwrap_err();

        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(err.to_string().contains("audio track 0"));
        assert_eq!(listener.terminal_events().len(), 1);
    }
}
