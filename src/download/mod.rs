//! Audio acquisition and delivery

pub mod error;
pub mod fetch;
pub mod page;
pub mod pipeline;
pub mod workdir;
pub mod ytdlp;

// Re-exports for convenience
pub use fetch::TrackFetcher;
pub use page::{ExtractorRegistry, PageLinkExtractor, PlayListExtractor, ScrapeOutcome, TrackReference};
pub use pipeline::{DeliveryPipeline, DeliveryReport, Request, RequestSource};
pub use workdir::{LocalAudioFile, ScopedFile, WorkDir};
pub use ytdlp::{is_video_hosting_url, MediaDownloader, YtDlpDownloader};
