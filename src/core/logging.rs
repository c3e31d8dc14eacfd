//! Logging initialization and configuration checking
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - External tool detection (yt-dlp, ffmpeg)
//! - Startup diagnostics

use anyhow::Result;
use simplelog::*;
use std::fs::File;
use std::path::Path;

use crate::conversion::ffmpeg_version;
use crate::core::config;
use crate::download::ytdlp::ytdlp_version;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file (parent directories are created)
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to create the file or a logger is already set
pub fn init_logger(log_file_path: &str) -> Result<()> {
    if let Some(parent) = Path::new(log_file_path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| anyhow::anyhow!("Failed to create log directory: {}", e))?;
    }
    let log_file = File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    let term_config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(LevelFilter::Info, term_config, TerminalMode::Mixed, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Debug, Config::default(), log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Versions of the external tools, `None` when a tool is missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolStatus {
    pub ytdlp: Option<String>,
    pub ffmpeg: Option<String>,
}

impl ToolStatus {
    pub async fn detect() -> Self {
        let (ytdlp, ffmpeg) = tokio::join!(ytdlp_version(), ffmpeg_version());
        Self { ytdlp, ffmpeg }
    }

    pub fn all_available(&self) -> bool {
        self.ytdlp.is_some() && self.ffmpeg.is_some()
    }
}

/// Logs the effective configuration at startup.
///
/// Never prints the recognition secret or the bot token.
pub async fn log_startup_configuration() -> ToolStatus {
    log::info!("{}", RULE);
    log::info!("🔧 Configuration Check");
    log::info!("{}", RULE);

    let tools = ToolStatus::detect().await;

    match &tools.ytdlp {
        Some(version) => log::info!("✅ yt-dlp: {} ({})", config::YTDL_BIN.as_str(), version),
        None => {
            log::error!("❌ yt-dlp: {} (NOT FOUND)", config::YTDL_BIN.as_str());
            log::error!("   Video links will FAIL. Install yt-dlp or set YTDL_BIN.");
        }
    }

    match &tools.ffmpeg {
        Some(version) => log::info!("✅ ffmpeg: {} ({})", config::FFMPEG_BIN.as_str(), version),
        None => {
            log::error!("❌ ffmpeg: {} (NOT FOUND)", config::FFMPEG_BIN.as_str());
            log::error!("   Uploaded videos and yt-dlp mp3 conversion will FAIL. Set FFMPEG_BIN.");
        }
    }

    log::info!(
        "📁 TEMP_ROOT: {}",
        shellexpand::tilde(config::TEMP_ROOT.as_str())
    );
    log::info!(
        "📏 Max audio size: {} bytes",
        config::limits::MAX_AUDIO_BYTES
    );

    if config::recognition::is_configured() {
        log::info!(
            "🎵 Recognition: {} (key set, timeout {}s)",
            config::recognition::HOST.as_deref().unwrap_or_default(),
            *config::recognition::TIMEOUT_SECS
        );
    } else {
        log::warn!("⚠️  Recognition: disabled (set ACR_HOST, ACR_ACCESS_KEY, ACR_ACCESS_SECRET)");
    }

    log::info!("{}", RULE);
    tools
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_status_all_available() {
        let status = ToolStatus {
            ytdlp: Some("2024.08.06".into()),
            ffmpeg: None,
        };
        assert!(!status.all_available());

        let status = ToolStatus {
            ytdlp: Some("2024.08.06".into()),
            ffmpeg: Some("ffmpeg version 6.1".into()),
        };
        assert!(status.all_available());
    }
}
