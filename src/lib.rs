//! Trackdrop - Telegram bot that turns links and videos into audio tracks
//!
//! A user sends a music page, a video-hosting link or a video file; the bot
//! replies with the audio.
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, subprocess helpers
//! - `download`: page scraping, HTTP fetching, yt-dlp, working dirs, the delivery pipeline
//! - `conversion`: audio extraction from video (ffmpeg)
//! - `recognition`: ACRCloud track identification
//! - `telegram`: bot setup, dispatcher schema, message transport

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod cli;
pub mod conversion;
pub mod core;
pub mod download;
pub mod recognition;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, AppResult};
pub use download::{DeliveryPipeline, DeliveryReport, Request, RequestSource};
pub use telegram::{create_bot, schema, HandlerDeps};
