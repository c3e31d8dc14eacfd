use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot
/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// ffmpeg binary path
/// Read from FFMPEG_BIN environment variable, defaults to "ffmpeg"
pub static FFMPEG_BIN: Lazy<String> = Lazy::new(|| env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()));

/// Root of the per-user working directories
/// Read from TEMP_ROOT environment variable
/// Default: temp (relative to the working directory, one subdirectory per user id)
/// Supports tilde (~) expansion for home directory
pub static TEMP_ROOT: Lazy<String> = Lazy::new(|| env::var("TEMP_ROOT").unwrap_or_else(|_| "temp".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Custom Bot API server URL (local telegram-bot-api), if any
pub static BOT_API_URL: Lazy<Option<String>> = Lazy::new(|| env::var("BOT_API_URL").ok());

/// Audio recognition (ACRCloud) settings.
///
/// Recognition is enabled only when host, access key and access secret are all set.
pub mod recognition {
    use super::*;

    /// ACRCloud project host, e.g. `identify-eu-west-1.acrcloud.com`
    pub static HOST: Lazy<Option<String>> = Lazy::new(|| non_empty_var("ACR_HOST"));

    pub static ACCESS_KEY: Lazy<Option<String>> = Lazy::new(|| non_empty_var("ACR_ACCESS_KEY"));

    pub static ACCESS_SECRET: Lazy<Option<String>> = Lazy::new(|| non_empty_var("ACR_ACCESS_SECRET"));

    /// Request timeout in seconds (ACR_TIMEOUT_SECS, default 10)
    pub static TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| {
        env::var("ACR_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(10)
    });

    /// Upper bound for the sample uploaded to the service (5 MiB)
    pub const MAX_SAMPLE_BYTES: usize = 5 * 1024 * 1024;

    pub fn timeout() -> Duration {
        Duration::from_secs(*TIMEOUT_SECS)
    }

    /// Whether all credentials are present
    pub fn is_configured() -> bool {
        HOST.is_some() && ACCESS_KEY.is_some() && ACCESS_SECRET.is_some()
    }

    fn non_empty_var(name: &str) -> Option<String> {
        env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    }
}

/// Delivery limits
pub mod limits {
    /// Largest audio file the bot hands to Telegram (20 MiB)
    pub const MAX_AUDIO_BYTES: u64 = 20 * 1024 * 1024;
}

/// Target audio format for every delivered file
pub mod audio {
    /// File extension (and yt-dlp `--audio-format`)
    pub const EXTENSION: &str = "mp3";

    /// yt-dlp `--audio-quality` value
    pub const YTDLP_QUALITY: &str = "192K";

    /// ffmpeg `-b:a` value
    pub const FFMPEG_BITRATE: &str = "192k";
}

/// External tool configuration
pub mod tools {
    use super::Duration;

    /// Timeout for yt-dlp commands (in seconds)
    pub const YTDLP_TIMEOUT_SECS: u64 = 240;

    /// Timeout for ffmpeg audio extraction (in seconds)
    pub const FFMPEG_TIMEOUT_SECS: u64 = 120;

    /// Timeout for `--version` probes (in seconds)
    pub const VERSION_PROBE_TIMEOUT_SECS: u64 = 10;

    pub fn ytdlp_timeout() -> Duration {
        Duration::from_secs(YTDLP_TIMEOUT_SECS)
    }

    pub fn ffmpeg_timeout() -> Duration {
        Duration::from_secs(FFMPEG_TIMEOUT_SECS)
    }

    pub fn version_probe_timeout() -> Duration {
        Duration::from_secs(VERSION_PROBE_TIMEOUT_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Browser-like User-Agent for page and track fetches.
    /// The music pages reject requests without one.
    pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

    /// Connect timeout for page/track fetches (in seconds)
    pub const CONNECT_TIMEOUT_SECS: u64 = 30;

    /// Request timeout for Bot API calls (in seconds)
    /// Uploading a 20 MiB audio file over a slow link takes a while
    pub const BOT_REQUEST_TIMEOUT_SECS: u64 = 300;

    pub fn connect_timeout() -> Duration {
        Duration::from_secs(CONNECT_TIMEOUT_SECS)
    }

    pub fn bot_timeout() -> Duration {
        Duration::from_secs(BOT_REQUEST_TIMEOUT_SECS)
    }
}
