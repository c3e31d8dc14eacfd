//! Track acquisition and delivery pipeline.
//!
//! One entry point, [`DeliveryPipeline::handle`], runs a single user request:
//!   per-user dir → acknowledge → classify source → acquire audio file(s)
//!   → size check → send → cleanup
//!
//! Every [`LocalAudioFile`] is dropped (and therefore deleted) before `handle`
//! returns. Errors never escape: they become one reply to the user and an
//! entry in the returned [`DeliveryReport`].

use std::path::Path;
use std::sync::Arc;

use url::Url;
use uuid::Uuid;

use crate::conversion::{AudioExtractor, FfmpegExtractor};
use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::utils::sanitize_display_name;
use crate::download::fetch::TrackFetcher;
use crate::download::page::{ExtractorRegistry, ScrapeOutcome};
use crate::download::workdir::{create_unique_file, LocalAudioFile, ScopedFile, WorkDir};
use crate::download::ytdlp::{is_video_hosting_url, MediaDownloader, YtDlpDownloader};
use crate::recognition::{AcrCloudRecognizer, RecognizerConfig, TrackRecognizer};
use crate::telegram::transport::{AudioMeta, ReplyTarget, Transport};

/// User-facing texts sent by the pipeline
pub mod messages {
    use crate::core::utils::format_display_name;

    pub const STARTED: &str = "⏳ Загрузка началась...";
    pub const DONE: &str = "🎉 Готово! Вот твой трек. Если нужно ещё, просто отправь следующую ссылку!";
    pub const NOTHING_FOUND: &str = "❌ Не удалось найти аудиофайлы на странице.";
    pub const NOT_RECOGNIZED: &str = "🔍 Не удалось распознать трек.";

    pub fn recognized(artist: &str, title: &str) -> String {
        format!("🎵 Распознано: {}", format_display_name(artist, title))
    }

    pub fn track_failed(name: &str, reason: &str) -> String {
        if name.is_empty() {
            reason.to_string()
        } else {
            format!("{} ({})", reason, name)
        }
    }
}

/// Where the audio comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestSource {
    /// Video-hosting link or a music page
    Url(String),
    /// Uploaded video (video message or `video/*` document)
    Video {
        file_id: String,
        file_name: Option<String>,
        mime_type: Option<String>,
    },
}

/// One inbound user request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub user_id: i64,
    pub chat_id: i64,
    /// Message to reply to
    pub message_id: Option<i32>,
    pub source: RequestSource,
}

impl Request {
    pub fn url(user_id: i64, chat_id: i64, url: impl Into<String>) -> Self {
        Self {
            user_id,
            chat_id,
            message_id: None,
            source: RequestSource::Url(url.into()),
        }
    }

    pub fn reply_target(&self) -> ReplyTarget {
        ReplyTarget::new(self.chat_id, self.message_id)
    }
}

/// What happened to a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Audio files handed to the transport
    pub delivered: usize,
    /// Files skipped for exceeding the size ceiling
    pub oversized: usize,
    /// Tracks that could not be fetched or sent
    pub failed: usize,
    /// The page had no track items
    pub nothing_found: bool,
    /// Request-level error, if the run was aborted
    pub error: Option<String>,
}

/// Orchestrates acquisition and delivery for every request.
///
/// Collaborators are injected so each source path can be exercised without the
/// real tools; recognition is optional and only used for uploaded videos.
pub struct DeliveryPipeline {
    workdir: WorkDir,
    extractors: ExtractorRegistry,
    fetcher: TrackFetcher,
    media: Arc<dyn MediaDownloader>,
    audio_extractor: Arc<dyn AudioExtractor>,
    recognizer: Option<Arc<dyn TrackRecognizer>>,
    max_audio_bytes: u64,
}

impl DeliveryPipeline {
    pub fn new(workdir: WorkDir, fetcher: TrackFetcher) -> Self {
        Self {
            workdir,
            extractors: ExtractorRegistry::default_registry(),
            fetcher,
            media: Arc::new(YtDlpDownloader::new()),
            audio_extractor: Arc::new(FfmpegExtractor::new()),
            recognizer: None,
            max_audio_bytes: config::limits::MAX_AUDIO_BYTES,
        }
    }

    /// Pipeline wired from environment configuration.
    ///
    /// Recognition is enabled only when all ACRCloud credentials are set.
    pub fn from_config() -> AppResult<Self> {
        let mut pipeline = Self::new(WorkDir::from_config(), TrackFetcher::new()?);
        if let Some(recognizer_config) = RecognizerConfig::from_env() {
            let recognizer = AcrCloudRecognizer::new(recognizer_config)?;
            log::info!("🎵 Audio recognition enabled ({})", recognizer.host());
            pipeline = pipeline.with_recognizer(Arc::new(recognizer));
        } else {
            log::info!("🎵 Audio recognition disabled (ACR_* not set)");
        }
        Ok(pipeline)
    }

    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn with_media_downloader(mut self, media: Arc<dyn MediaDownloader>) -> Self {
        self.media = media;
        self
    }

    pub fn with_audio_extractor(mut self, extractor: Arc<dyn AudioExtractor>) -> Self {
        self.audio_extractor = extractor;
        self
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn TrackRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_max_audio_bytes(mut self, limit: u64) -> Self {
        self.max_audio_bytes = limit;
        self
    }

    pub fn workdir(&self) -> &WorkDir {
        &self.workdir
    }

    /// Largest deliverable file, inclusive
    pub fn max_audio_bytes(&self) -> u64 {
        self.max_audio_bytes
    }

    pub fn has_recognizer(&self) -> bool {
        self.recognizer.is_some()
    }

    /// Runs one request to completion. Never fails: errors are reported to the
    /// user and recorded in the returned report.
    pub async fn handle(&self, transport: &dyn Transport, request: &Request) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        if let Err(e) = self.run(transport, request, &mut report).await {
            log::error!(
                "❌ Request from user {} failed [{}]: {}",
                request.user_id,
                e.category(),
                e
            );
            notify(transport, request.reply_target(), &e.user_message()).await;
            report.error = Some(e.to_string());
        }

        log::info!(
            "📊 User {}: delivered={} oversized={} failed={} nothing_found={}",
            request.user_id,
            report.delivered,
            report.oversized,
            report.failed,
            report.nothing_found
        );
        report
    }

    async fn run(&self, transport: &dyn Transport, request: &Request, report: &mut DeliveryReport) -> AppResult<()> {
        let target = request.reply_target();
        let dir = self.workdir.ensure_user_dir(request.user_id).await?;

        notify(transport, target, messages::STARTED).await;

        match &request.source {
            RequestSource::Url(raw) => {
                let raw = raw.trim();
                let url = Url::parse(raw)?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(AppError::Validation(format!("unsupported scheme: {}", url.scheme())));
                }

                if is_video_hosting_url(raw) {
                    let audio = self.media.download_audio(raw, &dir).await?;
                    let meta = AudioMeta::titled(audio.stem());
                    self.deliver(transport, target, audio, meta, report).await;
                } else {
                    self.scrape_and_deliver(transport, target, &url, &dir, report).await?;
                }
            }
            RequestSource::Video {
                file_id,
                file_name,
                mime_type,
            } => {
                self.extract_and_deliver(
                    transport,
                    target,
                    file_id,
                    file_name.as_deref(),
                    mime_type.as_deref(),
                    &dir,
                    report,
                )
                .await?;
            }
        }

        Ok(())
    }

    async fn scrape_and_deliver(
        &self,
        transport: &dyn Transport,
        target: ReplyTarget,
        page_url: &Url,
        dir: &Path,
        report: &mut DeliveryReport,
    ) -> AppResult<()> {
        let extractor = self
            .extractors
            .resolve(page_url)
            .ok_or_else(|| AppError::Validation(format!("no page extractor for {}", page_url)))?;

        let markup = self.fetcher.fetch_page(page_url).await?;

        let tracks = match extractor.scrape(&markup, page_url) {
            ScrapeOutcome::Empty => {
                log::info!("🔍 No tracks on {} ({})", page_url, extractor.name());
                report.nothing_found = true;
                notify(transport, target, messages::NOTHING_FOUND).await;
                return Ok(());
            }
            ScrapeOutcome::Found(tracks) => tracks,
        };

        log::info!("🎶 {} track(s) on {} ({})", tracks.len(), page_url, extractor.name());

        for track in tracks {
            match self.fetcher.fetch(&track.url, &track.display_name, dir).await {
                Ok(audio) => {
                    let meta = if track.display_name.is_empty() {
                        AudioMeta::titled(audio.stem())
                    } else {
                        AudioMeta::from_display_name(&track.display_name)
                    };
                    self.deliver(transport, target, audio, meta, report).await;
                }
                Err(e) => {
                    log::warn!("⚠️ Track {} failed [{}]: {}", track.url, e.category(), e);
                    report.failed += 1;
                    notify(
                        transport,
                        target,
                        &messages::track_failed(&track.display_name, &e.user_message()),
                    )
                    .await;
                }
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn extract_and_deliver(
        &self,
        transport: &dyn Transport,
        target: ReplyTarget,
        file_id: &str,
        file_name: Option<&str>,
        mime_type: Option<&str>,
        dir: &Path,
        report: &mut DeliveryReport,
    ) -> AppResult<()> {
        let upload = ScopedFile::new(dir.join(format!(
            "upload-{}.{}",
            Uuid::new_v4(),
            video_extension(file_name, mime_type)
        )));
        transport.download_attachment(file_id, upload.path()).await?;

        let stem = audio_stem_for_upload(file_name);
        let (reserved, _) = create_unique_file(dir, &stem, config::audio::EXTENSION).await?;

        let audio = self.audio_extractor.extract_audio(upload.path(), reserved.path()).await?;
        // `audio` owns the destination now
        reserved.keep();
        drop(upload);

        let meta = self.recognize(transport, target, &audio).await;
        self.deliver(transport, target, audio, meta, report).await;
        Ok(())
    }

    /// Title/performer for an extracted file, from recognition when available.
    ///
    /// Recognition problems are reported but never stop delivery.
    async fn recognize(&self, transport: &dyn Transport, target: ReplyTarget, audio: &LocalAudioFile) -> AudioMeta {
        let fallback = AudioMeta::titled(audio.stem());
        let Some(recognizer) = &self.recognizer else {
            return fallback;
        };

        match recognizer.recognize(audio.path()).await {
            Ok(result) => match result.track() {
                Some((artist, title)) => {
                    notify(transport, target, &messages::recognized(artist, title)).await;
                    AudioMeta {
                        title: (!title.is_empty()).then(|| title.to_string()).or(fallback.title),
                        performer: (!artist.is_empty()).then(|| artist.to_string()),
                    }
                }
                None => {
                    notify(transport, target, messages::NOT_RECOGNIZED).await;
                    fallback
                }
            },
            Err(e) => {
                let e = AppError::from(e);
                log::warn!("⚠️ Recognition failed [{}]: {}", e.category(), e);
                notify(transport, target, &e.user_message()).await;
                fallback
            }
        }
    }

    /// Size check, send, cleanup. The file is deleted when `audio` goes out of scope.
    async fn deliver(
        &self,
        transport: &dyn Transport,
        target: ReplyTarget,
        audio: LocalAudioFile,
        meta: AudioMeta,
        report: &mut DeliveryReport,
    ) {
        if audio.exceeds(self.max_audio_bytes) {
            let e = AppError::SizeLimitExceeded {
                size: audio.size(),
                limit: self.max_audio_bytes,
            };
            log::warn!("⚠️ Skipping {}: {}", audio.path().display(), e);
            report.oversized += 1;
            notify(transport, target, &e.user_message()).await;
            return;
        }

        match transport.send_audio(target, audio.path(), &meta).await {
            Ok(()) => {
                report.delivered += 1;
                notify(transport, target, messages::DONE).await;
            }
            Err(e) => {
                log::error!("❌ Failed to send {} [{}]: {}", audio.path().display(), e.category(), e);
                report.failed += 1;
                notify(transport, target, &e.user_message()).await;
            }
        }
    }
}

async fn notify(transport: &dyn Transport, target: ReplyTarget, text: &str) {
    if let Err(e) = transport.send_text(target, text).await {
        log::warn!("⚠️ Failed to send message to chat {}: {}", target.chat_id, e);
    }
}

/// Extension for the saved upload: from the file name, then the mime type, else `mp4`
fn video_extension(file_name: Option<&str>, mime_type: Option<&str>) -> String {
    let from_name = file_name
        .and_then(|n| Path::new(n).extension())
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()));
    if let Some(ext) = from_name {
        return ext;
    }

    match mime_type.map(|m| m.to_ascii_lowercase()).as_deref() {
        Some("video/quicktime") => "mov",
        Some("video/webm") => "webm",
        Some("video/x-matroska") => "mkv",
        Some("video/x-msvideo") => "avi",
        _ => "mp4",
    }
    .to_string()
}

fn audio_stem_for_upload(file_name: Option<&str>) -> String {
    let stem = file_name
        .and_then(|n| Path::new(n).file_stem())
        .map(|s| sanitize_display_name(&s.to_string_lossy()))
        .unwrap_or_default();
    if stem.is_empty() {
        "audio".to_string()
    } else {
        stem
    }
}
