use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "trackdrop")]
#[command(author, version, about = "Telegram bot that pulls audio tracks out of pages, video links and videos", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot (long polling)
    Run,

    /// Print the tracks found on a page without downloading them
    Scrape {
        /// Page URL
        url: String,
    },

    /// Identify the track in a local audio file (needs ACR_* variables)
    Recognize {
        /// Path to an audio file
        file: PathBuf,
    },

    /// Check that yt-dlp and ffmpeg are installed
    CheckTools,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
