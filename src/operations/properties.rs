use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::report;
use crate::error::Result;
use crate::media::properties::MkvPropertyInfo;
use crate::media::{CommandExecutor, MediaCommandBuilder, Outcome, TrackUpdate, run_classified};
use crate::progress::Reporter;

/// Reads and edits Matroska title and track properties.
pub struct MkvPropertyEditor {
    executor: Arc<dyn CommandExecutor>,
    builder: Arc<MediaCommandBuilder>,
}

impl MkvPropertyEditor {
    pub fn new(executor: Arc<dyn CommandExecutor>, builder: Arc<MediaCommandBuilder>) -> Self {
        Self { executor, builder }
    }

    /// Parse the `mkvmerge -J` report of `file`.
    pub async fn read(&self, file: &Path, reporter: &Reporter) -> Result<MkvPropertyInfo> {
        let result = self.run_read(file, reporter).await;
        report(reporter, result, |(_, message)| message.clone()).map(|(info, _)| info)
    }

    async fn run_read(&self, file: &Path, reporter: &Reporter) -> Result<(MkvPropertyInfo, String)> {
        let command = self.builder.identify(file);
        let outcome = run_classified(self.executor.as_ref(), &command, reporter).await?;
        let info = MkvPropertyInfo::from_json(outcome.payload.as_deref().unwrap_or_default())?;
        info!("Read {} tracks from {}", info.tracks.len(), file.display());
        Ok((info, outcome.message))
    }

    /// Rewrite the title and the given tracks in place.
    pub async fn edit(&self, file: &Path, title: &str, updates: &[TrackUpdate], reporter: &Reporter) -> Result<Outcome> {
        info!("Editing properties of {} ({} track updates)", file.display(), updates.len());
        let command = self.builder.edit_properties(file, title, updates);
        let result = run_classified(self.executor.as_ref(), &command, reporter).await;
        report(reporter, result, |outcome| outcome.message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MuxkitError;
    use crate::media::{Classification, SUCCESS_MESSAGE, Tool, WARNING_MESSAGE};
    use crate::operations::testing::*;

    const IDENTIFY: &str = r#"{"container": {"properties": {"title": "Holiday"}},
        "tracks": [{"id": 0, "type": "video", "codec": "HEVC", "properties": {}},
                   {"id": 1, "type": "audio", "codec": "Opus", "properties": {"track_name": "Stereo"}}]}"#;

    #[tokio::test]
    async fn test_read_returns_parsed_payload() {
        let executor = ScriptedExecutor::new(|command| exited(command, 0, IDENTIFY, ""));
        let editor = MkvPropertyEditor::new(executor.clone(), builder());
        let (listener, reporter) = recording();

        let info = editor.read(Path::new("/m/holiday.mkv"), &reporter).await.unwrap();

        assert_eq!(info.title, "Holiday");
        assert_eq!(info.tracks[1].selector, "a1");
        assert_eq!(executor.commands()[0].argv(), vec!["mkvmerge", "-J", "/m/holiday.mkv"]);
        assert_eq!(listener.terminal_events(), vec![Event::Complete(SUCCESS_MESSAGE.to_string())]);
    }

    #[tokio::test]
    async fn test_read_tolerates_warnings() {
        let executor = ScriptedExecutor::new(|command| {
            exited(command, 1, IDENTIFY, "Warning: The file contains an unknown element.\n")
        });
        let editor = MkvPropertyEditor::new(executor, builder());
        let (listener, reporter) = recording();

        let info = editor.read(Path::new("x.mkv"), &reporter).await.unwrap();
        assert_eq!(info.tracks.len(), 2);
        assert_eq!(listener.terminal_events(), vec![Event::Complete(WARNING_MESSAGE.to_string())]);
    }

    #[tokio::test]
    async fn test_read_reports_json_parsing_errors() {
        let executor = ScriptedExecutor::new(|command| exited(command, 0, "mkvmerge v80.0", ""));
        let editor = MkvPropertyEditor::new(executor, builder());
        let (listener, reporter) = recording();

        let err = editor.read(Path::new("x.mkv"), &reporter).await.unwrap_err();
        assert!(matches!(err, MuxkitError::Parse { .. }));
        assert!(matches!(
            listener.terminal_events().as_slice(),
            [Event::Error(m)] if m.starts_with("JSON parsing error in MKV properties")
        ));
    }

    #[tokio::test]
    async fn test_edit_runs_mkvpropedit() {
        let executor = ScriptedExecutor::new(|command| exited(command, 0, "Done.\n", ""));
        let editor = MkvPropertyEditor::new(executor.clone(), builder());
        let (listener, reporter) = recording();

        let updates = vec![TrackUpdate {
            selector: "s1".to_string(),
            name: "Forced".to_string(),
            enabled: true,
            default: false,
        }];
        let outcome = editor.edit(Path::new("x.mkv"), "New", &updates, &reporter).await.unwrap();

        assert_eq!(outcome.classification, Classification::Success);
        let command = &executor.commands()[0];
        assert_eq!(command.tool, Tool::Mkvpropedit);
        assert!(command.args.contains(&"track:s1".to_string()));
        assert_eq!(listener.terminal_events().len(), 1);
    }

    #[tokio::test]
    async fn test_edit_failure_quotes_stderr() {
        let executor = ScriptedExecutor::new(|command| exited(command, 2, "", "Error: The file 'x.mkv' could not be opened\n"));
        let editor = MkvPropertyEditor::new(executor, builder());
        let (listener, reporter) = recording();

        assert!(editor.edit(Path::new("x.mkv"), "", &[], &reporter).await.is_err());
        assert_eq!(
            listener.terminal_events(),
            vec![Event::Error(
                "Operation failed with exit code 2.\nDetails:\nError: The file 'x.mkv' could not be opened".to_string()
            )]
        );
    }
}
