use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::media::{AudioFormat, TrackUpdate, VideoFormat};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Remux a video into another container without re-encoding
    Convert {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Target container (mp4, mkv, mov)
        #[arg(short, long)]
        format: VideoFormat,
    },

    /// Split a video into fixed-length segments
    Split {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Segment length in seconds or HH:MM:SS
        #[arg(short, long)]
        segment_time: String,
    },

    /// Concatenate clips into one file
    Merge {
        /// Output video file
        #[arg(short, long)]
        output: PathBuf,

        /// Clips in merge order
        #[arg(required = true)]
        clips: Vec<PathBuf>,
    },

    /// Extract every audio track into its own file
    ExtractAudio {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Audio format (aac, mp3, wav)
        #[arg(short, long, default_value = "aac")]
        format: AudioFormat,
    },

    /// Extract every subtitle track as SubRip
    ExtractSubtitles {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show the title and tracks of a Matroska file
    Props {
        /// Matroska file
        #[arg(short, long)]
        input: PathBuf,

        /// Print the properties as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit the title and track properties of a Matroska file in place
    EditProps {
        /// Matroska file
        #[arg(short, long)]
        input: PathBuf,

        /// New container title
        #[arg(short, long, default_value = "")]
        title: String,

        /// Track update as <selector>,<enabled>,<default>,<name> (repeatable)
        #[arg(long = "track")]
        tracks: Vec<TrackUpdate>,
    },

    /// Remux a Matroska file keeping only the listed tracks
    RemoveTracks {
        /// Input Matroska file
        #[arg(short, long)]
        input: PathBuf,

        /// Output Matroska file
        #[arg(short, long)]
        output: PathBuf,

        /// Video track ids to keep (comma-separated); none drops all video
        #[arg(long, value_delimiter = ',')]
        video: Option<Vec<u32>>,

        /// Audio track ids to keep (comma-separated); none drops all audio
        #[arg(long, value_delimiter = ',')]
        audio: Option<Vec<u32>>,

        /// Subtitle track ids to keep (comma-separated); none drops all subtitles
        #[arg(long, value_delimiter = ',')]
        subtitles: Option<Vec<u32>>,
    },

    /// Check that every external tool can be started
    Check,

    /// Write a default configuration file
    InitConfig {
        /// Destination path
        #[arg(short, long, default_value = "muxkit.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edit_props() {
        let args = Args::try_parse_from([
            "muxkit", "edit-props", "-i", "movie.mkv", "-t", "Title", "--track", "a1,1,0,English", "--track",
            "s1,0,0,Signs",
        ])
        .unwrap();

        match args.command {
            Commands::EditProps { input, title, tracks } => {
                assert_eq!(input, PathBuf::from("movie.mkv"));
                assert_eq!(title, "Title");
                assert_eq!(tracks.len(), 2);
                assert_eq!(tracks[1].selector, "s1");
                assert!(!tracks[1].enabled);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_parse_remove_tracks_lists() {
        let args = Args::try_parse_from([
            "muxkit", "-v", "remove-tracks", "-i", "in.mkv", "-o", "out.mkv", "--audio", "1,3",
        ])
        .unwrap();
        assert!(args.verbose);

        match args.command {
            Commands::RemoveTracks { video, audio, subtitles, .. } => {
                assert_eq!(video, None);
                assert_eq!(audio, Some(vec![1, 3]));
                assert_eq!(subtitles, None);
            }
            _ => panic!("wrong subcommand"),
        }
    }

    #[test]
    fn test_parse_formats() {
        let args = Args::try_parse_from(["muxkit", "convert", "-i", "a.mkv", "-f", "MOV"]).unwrap();
        assert!(matches!(args.command, Commands::Convert { format: VideoFormat::Mov, .. }));

        assert!(Args::try_parse_from(["muxkit", "convert", "-i", "a.mkv", "-f", "avi"]).is_err());
        assert!(Args::try_parse_from(["muxkit", "merge", "-o", "out.mp4"]).is_err());
    }
}
