//! Telegram bot handler tree configuration
//!
//! This module provides the main dispatcher schema for the Telegram bot.
//! Handlers only turn messages into pipeline requests; all the work happens in
//! [`crate::download::pipeline::DeliveryPipeline`].

mod schema;
mod types;

pub use schema::schema;
pub use types::{
    extract_url, is_video_mime, request_from_message, url_source, video_source, HandlerDeps, HandlerError,
};
