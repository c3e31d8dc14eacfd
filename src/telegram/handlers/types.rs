//! Handler types, dependencies, and request builders

use std::sync::Arc;

use teloxide::types::Message;
use url::Url;

use crate::download::pipeline::{DeliveryPipeline, Request, RequestSource};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub pipeline: Arc<DeliveryPipeline>,
}

impl HandlerDeps {
    pub fn new(pipeline: Arc<DeliveryPipeline>) -> Self {
        Self { pipeline }
    }
}

/// First http(s) link in a message text
pub fn extract_url(text: &str) -> Option<String> {
    text.split_whitespace()
        .map(|token| token.trim_matches(|c: char| matches!(c, '<' | '>' | '(' | ')' | '"' | '\'')))
        .filter(|token| token.starts_with("http://") || token.starts_with("https://"))
        .find_map(|token| Url::parse(token).ok())
        .map(|url| url.to_string())
}

/// Documents count as videos only with a `video/*` mime type
pub fn is_video_mime(mime: Option<&str>) -> bool {
    mime.map(|m| m.trim().to_ascii_lowercase().starts_with("video/"))
        .unwrap_or(false)
}

/// Uploaded video in the message (video, video note, or `video/*` document)
pub fn video_source(msg: &Message) -> Option<RequestSource> {
    if let Some(video) = msg.video() {
        return Some(RequestSource::Video {
            file_id: video.file.id.0.clone(),
            file_name: video.file_name.clone(),
            mime_type: video.mime_type.as_ref().map(|m| m.essence_str().to_string()),
        });
    }

    if let Some(note) = msg.video_note() {
        return Some(RequestSource::Video {
            file_id: note.file.id.0.clone(),
            file_name: None,
            mime_type: None,
        });
    }

    let document = msg.document()?;
    let mime = document.mime_type.as_ref().map(|m| m.essence_str().to_string());
    if !is_video_mime(mime.as_deref()) {
        return None;
    }
    Some(RequestSource::Video {
        file_id: document.file.id.0.clone(),
        file_name: document.file_name.clone(),
        mime_type: mime,
    })
}

/// Link in the message text, if any
pub fn url_source(msg: &Message) -> Option<RequestSource> {
    msg.text().and_then(extract_url).map(RequestSource::Url)
}

/// Pipeline request for a message; the sender id falls back to the chat id
pub fn request_from_message(msg: &Message, source: RequestSource) -> Request {
    let chat_id = msg.chat.id.0;
    let user_id = msg
        .from
        .as_ref()
        .and_then(|u| i64::try_from(u.id.0).ok())
        .unwrap_or(chat_id);

    Request {
        user_id,
        chat_id,
        message_id: Some(msg.id.0),
        source,
    }
}
