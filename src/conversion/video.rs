//! Video to audio (MP3) extraction

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use super::{ConversionError, ConversionResult};
use crate::core::config;
use crate::core::process::run_with_timeout;
use crate::download::error::DownloadError;
use crate::download::workdir::{LocalAudioFile, ScopedFile};

/// Produces an audio file from a local video file.
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Writes the audio track of `video` to `destination`.
    ///
    /// The returned file owns `destination`; on error the caller still does.
    async fn extract_audio(&self, video: &Path, destination: &Path) -> ConversionResult<LocalAudioFile>;
}

/// ffmpeg-backed extractor (`libmp3lame`, constant bitrate)
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    ffmpeg_bin: String,
    bitrate: String,
    timeout: Duration,
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegExtractor {
    pub fn new() -> Self {
        Self {
            ffmpeg_bin: config::FFMPEG_BIN.clone(),
            bitrate: config::audio::FFMPEG_BITRATE.to_string(),
            timeout: config::tools::ffmpeg_timeout(),
        }
    }

    pub fn with_binary(mut self, bin: impl Into<String>) -> Self {
        self.ffmpeg_bin = bin.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_args(&self, video: &Path, destination: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-y", "-i"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(video.as_os_str().to_owned());
        args.extend(["-vn", "-acodec", "libmp3lame", "-b:a"].into_iter().map(OsString::from));
        args.push(OsString::from(&self.bitrate));
        args.push(destination.as_os_str().to_owned());
        args
    }
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    async fn extract_audio(&self, video: &Path, destination: &Path) -> ConversionResult<LocalAudioFile> {
        let guard = ScopedFile::new(destination);

        if !video.exists() {
            return Err(ConversionError::InputNotFound(video.display().to_string()));
        }

        log::info!("🎬 Extracting audio: {} -> {}", video.display(), destination.display());

        let mut cmd = Command::new(&self.ffmpeg_bin);
        cmd.args(self.build_args(video, destination));

        let output = run_with_timeout(&mut cmd, self.timeout).await.map_err(|e| match e {
            DownloadError::Timeout(_) => ConversionError::Timeout(self.timeout.as_secs()),
            other => ConversionError::FfmpegError(other.message().to_string()),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!("FFmpeg audio extraction error: {}", stderr);
            return Err(ConversionError::FfmpegError(stderr.to_string()));
        }

        let audio = LocalAudioFile::adopt(guard.keep()).await?;
        log::info!("✅ Audio extracted: {} ({} bytes)", audio.path().display(), audio.size());
        Ok(audio)
    }
}
