//! Messaging seam between the delivery pipeline and Telegram
//!
//! The pipeline only talks to [`Transport`]; [`TelegramTransport`] is the
//! production implementation over a teloxide `Bot`.

use std::path::Path;

use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, InputFile, MessageId, ReplyParameters};

use crate::core::error::AppResult;
use crate::telegram::Bot;

/// Where a reply goes: the chat and, optionally, the message being answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTarget {
    pub chat_id: i64,
    pub reply_to: Option<i32>,
}

impl ReplyTarget {
    pub fn new(chat_id: i64, reply_to: Option<i32>) -> Self {
        Self { chat_id, reply_to }
    }
}

/// Audio message fields shown by the client
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioMeta {
    pub title: Option<String>,
    pub performer: Option<String>,
}

impl AudioMeta {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            performer: None,
        }
    }

    /// Splits "Artist - Title" on the first separator; anything else becomes the title
    pub fn from_display_name(name: &str) -> Self {
        match name.split_once(" - ") {
            Some((artist, title)) if !artist.trim().is_empty() && !title.trim().is_empty() => Self {
                title: Some(title.trim().to_string()),
                performer: Some(artist.trim().to_string()),
            },
            _ => Self::titled(name.trim()),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, target: ReplyTarget, text: &str) -> AppResult<()>;

    async fn send_audio(&self, target: ReplyTarget, audio: &Path, meta: &AudioMeta) -> AppResult<()>;

    /// Saves an uploaded attachment to `destination`, returns the byte count
    async fn download_attachment(&self, file_id: &str, destination: &Path) -> AppResult<u64>;
}

#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn reply_parameters(target: ReplyTarget) -> Option<ReplyParameters> {
    target
        .reply_to
        .map(|id| ReplyParameters::new(MessageId(id)).allow_sending_without_reply())
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send_text(&self, target: ReplyTarget, text: &str) -> AppResult<()> {
        let mut request = self.bot.send_message(ChatId(target.chat_id), text);
        if let Some(params) = reply_parameters(target) {
            request = request.reply_parameters(params);
        }
        request.await?;
        Ok(())
    }

    async fn send_audio(&self, target: ReplyTarget, audio: &Path, meta: &AudioMeta) -> AppResult<()> {
        log::info!("📤 Sending audio to chat {}: {}", target.chat_id, audio.display());

        let mut request = self
            .bot
            .send_audio(ChatId(target.chat_id), InputFile::file(audio.to_path_buf()));
        if let Some(title) = &meta.title {
            request = request.title(title.clone());
        }
        if let Some(performer) = &meta.performer {
            request = request.performer(performer.clone());
        }
        if let Some(params) = reply_parameters(target) {
            request = request.reply_parameters(params);
        }
        request.await?;
        Ok(())
    }

    async fn download_attachment(&self, file_id: &str, destination: &Path) -> AppResult<u64> {
        log::info!("📥 Downloading attachment {}", file_id);

        let file = self.bot.get_file(FileId(file_id.to_string())).await?;
        let mut dst = tokio::fs::File::create(destination).await?;
        self.bot.download_file(&file.path, &mut dst).await?;
        dst.sync_all().await?;

        let size = tokio::fs::metadata(destination).await?.len();
        log::info!("✅ Attachment saved: {} ({} bytes)", destination.display(), size);
        Ok(size)
    }
}
