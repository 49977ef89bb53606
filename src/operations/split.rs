use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::report;
use crate::error::Result;
use crate::media::{CommandExecutor, MediaCommandBuilder, SegmentTime, run_classified, segment_output_pattern};
use crate::progress::Reporter;

/// Cuts a video into fixed-length segments without re-encoding.
pub struct VideoSplitter {
    executor: Arc<dyn CommandExecutor>,
    builder: Arc<MediaCommandBuilder>,
}

impl VideoSplitter {
    pub fn new(executor: Arc<dyn CommandExecutor>, builder: Arc<MediaCommandBuilder>) -> Self {
        Self { executor, builder }
    }

    /// Split `input` and return the segment file pattern.
    ///
    /// An invalid `segment_time` is reported without launching ffmpeg.
    pub async fn split(&self, input: &Path, segment_time: &str, reporter: &Reporter) -> Result<PathBuf> {
        let result = self.run(input, segment_time, reporter).await;
        report(reporter, result, |(_, message)| message.clone()).map(|(pattern, _)| pattern)
    }

    async fn run(&self, input: &Path, segment_time: &str, reporter: &Reporter) -> Result<(PathBuf, String)> {
        let segment_time: SegmentTime = segment_time.parse()?;
        let pattern = segment_output_pattern(input);
        info!("Splitting {} every {} into {}", input.display(), segment_time, pattern.display());

        let command = self.builder.split(input, &segment_time, &pattern);
        let outcome = run_classified(self.executor.as_ref(), &command, reporter).await?;
        Ok((pattern, outcome.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::SUCCESS_MESSAGE;
    use crate::operations::testing::*;

    #[tokio::test]
    async fn test_split_runs_segment_muxer() {
        let executor = ScriptedExecutor::new(|command| exited(command, 0, "", ""));
        let splitter = VideoSplitter::new(executor.clone(), builder());
        let (listener, reporter) = recording();

        let pattern = splitter.split(Path::new("clip.mp4"), "00:05:00", &reporter).await.unwrap();

        assert_eq!(pattern, PathBuf::from("clip-%04d.mp4"));
        assert_eq!(listener.terminal_events(), vec![Event::Complete(SUCCESS_MESSAGE.to_string())]);
        let command = &executor.commands()[0];
        assert_eq!(command.args.last().map(String::as_str), Some("clip-%04d.mp4"));
        assert!(command.args.windows(2).any(|w| w == ["-segment_time", "00:05:00"]));
    }

    #[tokio::test]
    async fn test_invalid_segment_time_launches_nothing() {
        let executor = ScriptedExecutor::new(|command| exited(command, 0, "", ""));
        let splitter = VideoSplitter::new(executor.clone(), builder());
        let (listener, reporter) = recording();

        assert!(splitter.split(Path::new("clip.mp4"), " ", &reporter).await.is_err());

        assert!(executor.commands().is_empty());
        assert_eq!(
            listener.events(),
            vec![Event::Error("Segment time must not be empty.".to_string())]
        );
    }
}
