use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use teloxide::prelude::*;
use url::Url;

use trackdrop::cli::{Cli, Commands};
use trackdrop::core::logging::ToolStatus;
use trackdrop::core::{config, init_logger, log_startup_configuration};
use trackdrop::download::{ExtractorRegistry, ScrapeOutcome, TrackFetcher};
use trackdrop::recognition::{AcrCloudRecognizer, RecognizerConfig, TrackRecognizer};
use trackdrop::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};
use trackdrop::DeliveryPipeline;

/// Main entry point
///
/// Parses CLI arguments and dispatches to the subcommand; without one the bot runs.
///
/// # Errors
/// Returns an error if initialization fails (logging, bot creation) or the
/// subcommand fails.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present, before any config is read
    let _ = dotenv();

    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run) => run_bot().await,
        Some(Commands::Scrape { url }) => run_scrape(&url).await,
        Some(Commands::Recognize { file }) => run_recognize(&file).await,
        Some(Commands::CheckTools) => run_check_tools().await,
        None => {
            log::info!("No command specified, running bot in default mode");
            run_bot().await
        }
    }
}

async fn run_bot() -> Result<()> {
    log::info!("🚀 Starting trackdrop");
    log_startup_configuration().await;

    let bot = create_bot()?;
    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let pipeline = DeliveryPipeline::from_config()?;
    log::info!("📁 Working directory: {}", pipeline.workdir().root().display());
    let deps = HandlerDeps::new(Arc::new(pipeline));

    let listener = teloxide::update_listeners::Polling::builder(bot.clone())
        .drop_pending_updates()
        .build();

    Dispatcher::builder(bot, schema(deps))
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}

async fn run_scrape(raw_url: &str) -> Result<()> {
    let url = Url::parse(raw_url)?;
    let registry = ExtractorRegistry::default_registry();
    let extractor = registry
        .resolve(&url)
        .ok_or_else(|| anyhow!("No page extractor for {}", url))?;

    let fetcher = TrackFetcher::new()?;
    let markup = fetcher.fetch_page(&url).await?;

    match extractor.scrape(&markup, &url) {
        ScrapeOutcome::Empty => println!("No tracks found on {}", url),
        ScrapeOutcome::Found(tracks) => {
            for (i, track) in tracks.iter().enumerate() {
                let name = if track.display_name.is_empty() {
                    "(no name)"
                } else {
                    track.display_name.as_str()
                };
                println!("{:>3}. {}\n     {}", i + 1, name, track.url);
            }
        }
    }
    Ok(())
}

async fn run_recognize(file: &Path) -> Result<()> {
    let recognizer_config = RecognizerConfig::from_env()
        .ok_or_else(|| anyhow!("Recognition is not configured: set ACR_HOST, ACR_ACCESS_KEY, ACR_ACCESS_SECRET"))?;
    let recognizer = AcrCloudRecognizer::new(recognizer_config)?;

    let result = recognizer.recognize(file).await?;
    match result.display_name() {
        Some(name) => println!("{}", name),
        None => println!("No match (status {}: {})", result.status_code, result.status_msg),
    }
    Ok(())
}

async fn run_check_tools() -> Result<()> {
    let status = ToolStatus::detect().await;
    println!(
        "yt-dlp ({}): {}",
        config::YTDL_BIN.as_str(),
        status.ytdlp.as_deref().unwrap_or("NOT FOUND")
    );
    println!(
        "ffmpeg ({}): {}",
        config::FFMPEG_BIN.as_str(),
        status.ffmpeg.as_deref().unwrap_or("NOT FOUND")
    );

    if status.all_available() {
        Ok(())
    } else {
        Err(anyhow!("Required tools are missing"))
    }
}
