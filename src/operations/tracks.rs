use std::sync::Arc;
use tracing::info;

use super::report;
use crate::error::{MuxkitError, Result};
use crate::media::{CommandExecutor, MediaCommandBuilder, Outcome, TrackRemovalSpec, run_classified};
use crate::progress::Reporter;

/// Remuxes a Matroska file keeping only selected tracks.
pub struct MkvTrackRemover {
    executor: Arc<dyn CommandExecutor>,
    builder: Arc<MediaCommandBuilder>,
}

impl MkvTrackRemover {
    pub fn new(executor: Arc<dyn CommandExecutor>, builder: Arc<MediaCommandBuilder>) -> Self {
        Self { executor, builder }
    }

    pub async fn remove(&self, removal: &TrackRemovalSpec, reporter: &Reporter) -> Result<Outcome> {
        let result = self.run(removal, reporter).await;
        report(reporter, result, |outcome| outcome.message.clone())
    }

    async fn run(&self, removal: &TrackRemovalSpec, reporter: &Reporter) -> Result<Outcome> {
        if removal.input == removal.output {
            return Err(MuxkitError::Validation(
                "Output file must differ from the input file.".to_string(),
            ));
        }

        info!(
            "Remuxing {} into {} keeping video {:?}, audio {:?}, subtitles {:?}",
            removal.input.display(),
            removal.output.display(),
            removal.video_ids_to_keep,
            removal.audio_ids_to_keep,
            removal.subtitle_ids_to_keep
        );
        let command = self.builder.remove_tracks(removal);
        run_classified(self.executor.as_ref(), &command, reporter).await
    }
}
