//! muxkit - Lossless media tool orchestration
//!
//! Builds argument vectors for ffmpeg, ffprobe, mkvmerge and mkvpropedit,
//! runs them as async subprocesses with concurrent output draining, and
//! reports progress plus exactly one terminal outcome per operation.

pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod media;
pub mod operations;
pub mod progress;
pub mod workflow;
