use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;
use tracing::{debug, info, warn};

use super::report;
use crate::error::{MuxkitError, Result};
use crate::media::{CommandExecutor, MediaCommandBuilder, Outcome, render_concat_list, run_classified};
use crate::progress::Reporter;

const LIST_FILE_PREFIX: &str = "ffmpeg-merge-list";
const LIST_FILE_SUFFIX: &str = ".txt";

/// Concatenates clips with ffmpeg's concat demuxer.
pub struct ClipMerger {
    executor: Arc<dyn CommandExecutor>,
    builder: Arc<MediaCommandBuilder>,
}

impl ClipMerger {
    pub fn new(executor: Arc<dyn CommandExecutor>, builder: Arc<MediaCommandBuilder>) -> Self {
        Self { executor, builder }
    }

    /// Merge `clips` in order into `output`.
    ///
    /// The temporary list file is removed before the terminal notification,
    /// whatever the outcome. A failed removal is reported as progress.
    pub async fn merge(&self, clips: &[PathBuf], output: &Path, reporter: &Reporter) -> Result<Outcome> {
        let result = self.run(clips, output, reporter).await;
        report(reporter, result, |outcome| outcome.message.clone())
    }

    async fn run(&self, clips: &[PathBuf], output: &Path, reporter: &Reporter) -> Result<Outcome> {
        if clips.is_empty() {
            return Err(MuxkitError::Validation("No video clips provided to merge.".to_string()));
        }

        let list_file = write_list_file(clips)?;
        info!("Merging {} clips into {}", clips.len(), output.display());

        let command = self.builder.merge(&list_file, output);
        let result = run_classified(self.executor.as_ref(), &command, reporter).await;

        let list_path = list_file.to_path_buf();
        match list_file.close() {
            Ok(()) => debug!("Removed merge list {}", list_path.display()),
            Err(e) => {
                warn!("Failed to remove merge list {}: {}", list_path.display(), e);
                reporter.progress(&format!("Cleanup failed: {}", e));
            }
        }

        result
    }
}

fn write_list_file(clips: &[PathBuf]) -> Result<TempPath> {
    let clips: Vec<String> = clips.iter().map(|c| c.to_string_lossy().to_string()).collect();

    let mut file = tempfile::Builder::new()
        .prefix(LIST_FILE_PREFIX)
        .suffix(LIST_FILE_SUFFIX)
        .tempfile()?;
    file.write_all(render_concat_list(&clips).as_bytes())?;
    file.flush()?;

    let path = file.into_temp_path();
    debug!("Wrote merge list {}", path.display());
    Ok(path)
}
