//! Media conversion
//!
//! Turns an uploaded video into an mp3 that can be delivered like any other
//! track. ffmpeg does the work; see [`video`].

pub mod video;

use thiserror::Error;

use crate::core::config;
use crate::core::process::probe_version;

pub use video::{AudioExtractor, FfmpegExtractor};

/// Errors that can occur during conversion
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    #[error("Input file not found: {0}")]
    InputNotFound(String),

    #[error("FFmpeg timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type ConversionResult<T> = Result<T, ConversionError>;

/// First line of `ffmpeg -version`
pub async fn ffmpeg_version() -> Option<String> {
    probe_version(
        config::FFMPEG_BIN.as_str(),
        "-version",
        config::tools::version_probe_timeout(),
    )
    .await
}
