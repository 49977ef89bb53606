// User-facing operations
//
// Each operation builds its command(s), runs them through a CommandExecutor
// and delivers exactly one terminal notification through its Reporter:
// - Convert / Split / Merge: single ffmpeg invocations
// - Extract: ffprobe followed by one ffmpeg per discovered stream
// - Properties / Tracks: mkvmerge and mkvpropedit
// - Check: version probe of every tool

pub mod check;
pub mod convert;
pub mod extract;
pub mod merge;
pub mod properties;
pub mod split;
pub mod tracks;

pub use check::{ToolCheck, ToolChecker};
pub use convert::VideoConverter;
pub use extract::{AudioExtractor, ExtractedTrack, SubtitleExtractor};
pub use merge::ClipMerger;
pub use properties::MkvPropertyEditor;
pub use split::VideoSplitter;
pub use tracks::MkvTrackRemover;

use crate::error::Result;
use crate::progress::Reporter;

/// Deliver the terminal notification for `result` and hand it back.
pub(crate) fn report<T, F>(reporter: &Reporter, result: Result<T>, success_message: F) -> Result<T>
where
    F: FnOnce(&T) -> String,
{
    reporter.finish(&result, success_message);
    result
}
