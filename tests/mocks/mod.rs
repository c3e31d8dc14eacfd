//! Test doubles for the delivery pipeline
//!
//! A recording transport plus fake yt-dlp, ffmpeg and recognizer
//! implementations, so pipeline tests run without Telegram or external tools.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use trackdrop::conversion::{AudioExtractor, ConversionError, ConversionResult};
use trackdrop::download::{LocalAudioFile, MediaDownloader};
use trackdrop::recognition::{RecognitionError, RecognitionResult, TrackRecognizer};
use trackdrop::telegram::{AudioMeta, ReplyTarget, Transport};
use trackdrop::{AppError, AppResult};

/// One outbound message captured by [`RecordingTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Text(String),
    Audio {
        file_name: String,
        size: u64,
        meta: AudioMeta,
    },
}

/// Records everything the pipeline sends.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
    attachment: Vec<u8>,
    fail_audio: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written by `download_attachment`
    pub fn with_attachment(mut self, bytes: Vec<u8>) -> Self {
        self.attachment = bytes;
        self
    }

    /// Makes every `send_audio` call fail
    pub fn failing_audio(mut self) -> Self {
        self.fail_audio = true;
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text(t) => Some(t),
                Sent::Audio { .. } => None,
            })
            .collect()
    }

    pub fn audios(&self) -> Vec<(String, u64, AudioMeta)> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Audio { file_name, size, meta } => Some((file_name, size, meta)),
                Sent::Text(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_text(&self, _target: ReplyTarget, text: &str) -> AppResult<()> {
        self.sent.lock().unwrap().push(Sent::Text(text.to_string()));
        Ok(())
    }

    async fn send_audio(&self, _target: ReplyTarget, audio: &Path, meta: &AudioMeta) -> AppResult<()> {
        if self.fail_audio {
            return Err(AppError::Validation("upload rejected".to_string()));
        }
        // The file must still exist while it is being sent
        let size = std::fs::metadata(audio)?.len();
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.sent.lock().unwrap().push(Sent::Audio {
            file_name,
            size,
            meta: meta.clone(),
        });
        Ok(())
    }

    async fn download_attachment(&self, _file_id: &str, destination: &Path) -> AppResult<u64> {
        tokio::fs::write(destination, &self.attachment).await?;
        Ok(self.attachment.len() as u64)
    }
}

/// Stands in for yt-dlp: writes `<title>.mp3` of `size` bytes into the target dir
pub struct FakeMediaDownloader {
    pub title: String,
    pub size: usize,
    pub fail: bool,
}

impl FakeMediaDownloader {
    pub fn new(title: &str, size: usize) -> Self {
        Self {
            title: title.to_string(),
            size,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            title: String::new(),
            size: 0,
            fail: true,
        }
    }
}

#[async_trait]
impl MediaDownloader for FakeMediaDownloader {
    async fn download_audio(&self, _source_url: &str, dest_dir: &Path) -> Result<LocalAudioFile, AppError> {
        if self.fail {
            return Err(AppError::Validation("video unavailable".to_string()));
        }
        let path = dest_dir.join(format!("{}.mp3", self.title));
        tokio::fs::write(&path, vec![0u8; self.size]).await?;
        Ok(LocalAudioFile::adopt(path).await?)
    }
}

/// Stands in for ffmpeg: writes `size` bytes to the destination
pub struct FakeAudioExtractor {
    pub size: usize,
    pub fail: bool,
}

impl FakeAudioExtractor {
    pub fn new(size: usize) -> Self {
        Self { size, fail: false }
    }

    pub fn failing() -> Self {
        Self { size: 0, fail: true }
    }
}

#[async_trait]
impl AudioExtractor for FakeAudioExtractor {
    async fn extract_audio(&self, video: &Path, destination: &Path) -> ConversionResult<LocalAudioFile> {
        if !video.exists() {
            return Err(ConversionError::InputNotFound(video.display().to_string()));
        }
        if self.fail {
            return Err(ConversionError::FfmpegError("Invalid data found when processing input".to_string()));
        }
        tokio::fs::write(destination, vec![1u8; self.size]).await?;
        Ok(LocalAudioFile::adopt(destination).await?)
    }
}

/// Returns a fixed recognition outcome
pub struct FakeRecognizer {
    outcome: Result<RecognitionResult, String>,
}

impl FakeRecognizer {
    pub fn matching(artist: &str, title: &str) -> Self {
        Self {
            outcome: Ok(RecognitionResult {
                status_code: 0,
                status_msg: "Success".to_string(),
                artist: Some(artist.to_string()),
                title: Some(title.to_string()),
            }),
        }
    }

    pub fn no_match() -> Self {
        Self {
            outcome: Ok(RecognitionResult {
                status_code: 1001,
                status_msg: "No result".to_string(),
                artist: None,
                title: None,
            }),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            outcome: Err("connection refused".to_string()),
        }
    }
}

#[async_trait]
impl TrackRecognizer for FakeRecognizer {
    async fn recognize(&self, audio_path: &Path) -> Result<RecognitionResult, RecognitionError> {
        assert!(audio_path.exists(), "recognizer got a missing file");
        self.outcome.clone().map_err(RecognitionError::Unavailable)
    }
}

/// Regular files left in `dir` (empty when the directory is gone)
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect()
        })
        .unwrap_or_default()
}
