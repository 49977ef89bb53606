use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::outcome::ExitPolicy;

/// The external programs muxkit drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
    Mkvmerge,
    Mkvpropedit,
}

/// How a tool's stdout and stderr are collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputChannels {
    /// Both channels feed one accumulation buffer.
    Merged,
    /// stdout and stderr are kept apart so stderr can be inspected on its own.
    Separate,
}

impl Tool {
    pub const ALL: [Tool; 4] = [Tool::Ffmpeg, Tool::Ffprobe, Tool::Mkvmerge, Tool::Mkvpropedit];

    pub fn executable_name(self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
            Tool::Mkvmerge => "mkvmerge",
            Tool::Mkvpropedit => "mkvpropedit",
        }
    }

    pub fn output_channels(self) -> OutputChannels {
        match self {
            Tool::Ffmpeg | Tool::Ffprobe => OutputChannels::Merged,
            Tool::Mkvmerge | Tool::Mkvpropedit => OutputChannels::Separate,
        }
    }

    pub fn exit_policy(self) -> ExitPolicy {
        match self {
            Tool::Ffmpeg | Tool::Ffprobe => ExitPolicy::Strict,
            Tool::Mkvmerge | Tool::Mkvpropedit => ExitPolicy::WarningTolerant,
        }
    }

    pub fn version_flag(self) -> &'static str {
        match self {
            Tool::Ffmpeg | Tool::Ffprobe => "-version",
            Tool::Mkvmerge | Tool::Mkvpropedit => "--version",
        }
    }

    fn is_property_tool(self) -> bool {
        matches!(self, Tool::Mkvmerge | Tool::Mkvpropedit)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) { Platform::Windows } else { Platform::Unix }
    }

    fn executable_file_name(self, tool: Tool) -> String {
        match self {
            Platform::Windows => format!("{}.exe", tool.executable_name()),
            Platform::Unix => tool.executable_name().to_string(),
        }
    }
}

/// Where executables are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ToolLayout {
    /// Bundled executable when it exists, otherwise the bare name for `PATH` lookup.
    #[default]
    Auto,
    /// Windows bundles all four tools; elsewhere the MKVToolNix pair comes
    /// from `PATH` and ffmpeg/ffprobe from the bundle.
    Distribution,
    /// Always the bare name.
    SystemPath,
}

/// Maps a [`Tool`] to the string placed first in its argument vector.
///
/// Resolution never fails: a missing executable only shows up as a launch
/// failure when the process runner tries to start it.
#[derive(Debug, Clone)]
pub struct ToolResolver {
    library_dir: PathBuf,
    layout: ToolLayout,
    platform: Platform,
}

impl ToolResolver {
    pub fn new<P: AsRef<Path>>(base_dir: P, library_dir: &str, layout: ToolLayout) -> Self {
        Self::for_platform(base_dir, library_dir, layout, Platform::current())
    }

    pub fn for_platform<P: AsRef<Path>>(
        base_dir: P,
        library_dir: &str,
        layout: ToolLayout,
        platform: Platform,
    ) -> Self {
        Self {
            library_dir: base_dir.as_ref().join(library_dir),
            layout,
            platform,
        }
    }

    pub fn resolve(&self, tool: Tool) -> String {
        let bundled = self.library_dir.join(self.platform.executable_file_name(tool));
        let bare = || self.platform.executable_file_name(tool);

        let resolved = match self.layout {
            ToolLayout::SystemPath => bare(),
            ToolLayout::Distribution => {
                if self.platform == Platform::Unix && tool.is_property_tool() {
                    bare()
                } else {
                    bundled.to_string_lossy().to_string()
                }
            }
            ToolLayout::Auto => {
                if bundled.is_file() {
                    bundled.to_string_lossy().to_string()
                } else {
                    bare()
                }
            }
        };

        debug!("Resolved {} to {}", tool, resolved);
        resolved
    }
}

/// Directory holding the running executable, or `.` when it cannot be determined.
pub fn application_base_dir() -> PathBuf {
    match std::env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        Err(e) => {
            warn!("Could not determine application base path, using current directory: {}", e);
            PathBuf::from(".")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_distribution_layout_on_unix() {
        let resolver = ToolResolver::for_platform("/opt/muxkit", "library", ToolLayout::Distribution, Platform::Unix);

        assert_eq!(resolver.resolve(Tool::Ffmpeg), "/opt/muxkit/library/ffmpeg");
        assert_eq!(resolver.resolve(Tool::Ffprobe), "/opt/muxkit/library/ffprobe");
        assert_eq!(resolver.resolve(Tool::Mkvmerge), "mkvmerge");
        assert_eq!(resolver.resolve(Tool::Mkvpropedit), "mkvpropedit");
    }

    #[test]
    fn test_distribution_layout_on_windows_bundles_everything() {
        let resolver = ToolResolver::for_platform("/opt/muxkit", "library", ToolLayout::Distribution, Platform::Windows);

        for tool in Tool::ALL {
            let resolved = resolver.resolve(tool);
            assert!(resolved.ends_with(&format!("{}.exe", tool.executable_name())), "{}", resolved);
            assert!(resolved.contains("library"), "{}", resolved);
        }
    }

    #[test]
    fn test_system_path_layout() {
        let resolver = ToolResolver::for_platform("/opt/muxkit", "library", ToolLayout::SystemPath, Platform::Unix);
        for tool in Tool::ALL {
            assert_eq!(resolver.resolve(tool), tool.executable_name());
        }
    }

    #[test]
    fn test_auto_layout_prefers_bundled_executable() {
        let base = assert_fs::TempDir::new().unwrap();
        base.child("library/ffmpeg").touch().unwrap();

        let resolver = ToolResolver::for_platform(base.path(), "library", ToolLayout::Auto, Platform::Unix);

        let ffmpeg = resolver.resolve(Tool::Ffmpeg);
        assert_eq!(PathBuf::from(&ffmpeg), base.path().join("library").join("ffmpeg"));
        assert_eq!(resolver.resolve(Tool::Ffprobe), "ffprobe");
        assert_eq!(resolver.resolve(Tool::Mkvmerge), "mkvmerge");
    }

    #[test]
    fn test_tool_families() {
        assert_eq!(Tool::Ffmpeg.output_channels(), OutputChannels::Merged);
        assert_eq!(Tool::Mkvmerge.output_channels(), OutputChannels::Separate);
        assert_eq!(Tool::Ffprobe.exit_policy(), ExitPolicy::Strict);
        assert_eq!(Tool::Mkvpropedit.exit_policy(), ExitPolicy::WarningTolerant);
    }
}
