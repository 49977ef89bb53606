use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use super::report;
use crate::error::Result;
use crate::media::{CommandExecutor, MediaCommandBuilder, VideoFormat, converted_output_path, run_classified};
use crate::progress::Reporter;

/// Lossless remux into another container.
pub struct VideoConverter {
    executor: Arc<dyn CommandExecutor>,
    builder: Arc<MediaCommandBuilder>,
}

impl VideoConverter {
    pub fn new(executor: Arc<dyn CommandExecutor>, builder: Arc<MediaCommandBuilder>) -> Self {
        Self { executor, builder }
    }

    /// Convert `input` and return the path of the new file.
    pub async fn convert(&self, input: &Path, format: VideoFormat, reporter: &Reporter) -> Result<PathBuf> {
        let output = converted_output_path(input, format);
        info!("Converting {} to {}", input.display(), output.display());

        let command = self.builder.convert(input, &output, format);
        let result = run_classified(self.executor.as_ref(), &command, reporter)
            .await
            .map(|outcome| (output, outcome.message));

        report(reporter, result, |(_, message)| message.clone()).map(|(output, _)| output)
    }
}
