use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::media::properties::MkvPropertyInfo;
use crate::media::{
    AudioFormat, CommandExecutor, ExecutorFactory, MediaCommandBuilder, Outcome, ProcessRunner, ToolResolver,
    TrackRemovalSpec, TrackUpdate, VideoFormat, application_base_dir,
};
use crate::operations::{
    AudioExtractor, ClipMerger, ExtractedTrack, MkvPropertyEditor, MkvTrackRemover, SubtitleExtractor, ToolCheck,
    ToolChecker, VideoConverter, VideoSplitter,
};
use crate::progress::Reporter;

/// Every operation wired to one shared process runner.
pub struct Workflow {
    runner: Arc<ProcessRunner>,
    converter: VideoConverter,
    splitter: VideoSplitter,
    merger: ClipMerger,
    audio: AudioExtractor,
    subtitles: SubtitleExtractor,
    properties: MkvPropertyEditor,
    tracks: MkvTrackRemover,
    checker: ToolChecker,
}

impl Workflow {
    pub fn new(config: &Config) -> Self {
        let base_dir = config.tools.base_dir.clone().unwrap_or_else(application_base_dir);
        debug!("Resolving bundled tools under {}", base_dir.join(&config.tools.library_dir).display());

        let resolver = Arc::new(ToolResolver::new(&base_dir, &config.tools.library_dir, config.tools.layout));
        let runner = ExecutorFactory::create_runner(&config.runner);
        info!("Workflow ready with {} worker(s), {:?} tool layout", runner.workers(), config.tools.layout);

        Self::from_parts(runner, Arc::new(MediaCommandBuilder::new(resolver)))
    }

    fn from_parts(runner: Arc<ProcessRunner>, builder: Arc<MediaCommandBuilder>) -> Self {
        let executor: Arc<dyn CommandExecutor> = runner.clone();
        Self {
            converter: VideoConverter::new(executor.clone(), builder.clone()),
            splitter: VideoSplitter::new(executor.clone(), builder.clone()),
            merger: ClipMerger::new(executor.clone(), builder.clone()),
            audio: AudioExtractor::new(executor.clone(), builder.clone()),
            subtitles: SubtitleExtractor::new(executor.clone(), builder.clone()),
            properties: MkvPropertyEditor::new(executor.clone(), builder.clone()),
            tracks: MkvTrackRemover::new(executor.clone(), builder.clone()),
            checker: ToolChecker::new(executor, builder),
            runner,
        }
    }

    pub async fn convert(&self, input: &Path, format: VideoFormat, reporter: &Reporter) -> Result<PathBuf> {
        self.converter.convert(input, format, reporter).await
    }

    pub async fn split(&self, input: &Path, segment_time: &str, reporter: &Reporter) -> Result<PathBuf> {
        self.splitter.split(input, segment_time, reporter).await
    }

    pub async fn merge(&self, clips: &[PathBuf], output: &Path, reporter: &Reporter) -> Result<Outcome> {
        self.merger.merge(clips, output, reporter).await
    }

    pub async fn extract_audio(
        &self,
        input: &Path,
        format: AudioFormat,
        reporter: &Reporter,
    ) -> Result<Vec<ExtractedTrack>> {
        self.audio.extract(input, format, reporter).await
    }

    pub async fn extract_subtitles(&self, input: &Path, reporter: &Reporter) -> Result<Vec<ExtractedTrack>> {
        self.subtitles.extract(input, reporter).await
    }

    pub async fn read_properties(&self, file: &Path, reporter: &Reporter) -> Result<MkvPropertyInfo> {
        self.properties.read(file, reporter).await
    }

    pub async fn edit_properties(
        &self,
        file: &Path,
        title: &str,
        updates: &[TrackUpdate],
        reporter: &Reporter,
    ) -> Result<Outcome> {
        self.properties.edit(file, title, updates, reporter).await
    }

    pub async fn remove_tracks(&self, removal: &TrackRemovalSpec, reporter: &Reporter) -> Result<Outcome> {
        self.tracks.remove(removal, reporter).await
    }

    pub async fn check_tools(&self, reporter: &Reporter) -> Vec<ToolCheck> {
        self.checker.check_all(reporter).await
    }

    /// Stop accepting commands and wait for running ones. Only the first call does anything.
    pub async fn shutdown(&self) -> bool {
        self.runner.shutdown().await
    }
}
