//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::types::{request_from_message, url_source, video_source, HandlerDeps, HandlerError};
use crate::download::pipeline::RequestSource;
use crate::telegram::bot::{Command, WELCOME_TEXT};
use crate::telegram::transport::TelegramTransport;
use crate::telegram::Bot;

const SEND_LINK_HINT: &str = "🔗 Пришли ссылку на страницу с треками, видео YouTube или сам видеофайл.";

/// Creates the main dispatcher schema for the Telegram bot.
///
/// Order matters: commands first, then uploaded videos, then links, then a
/// hint for any other text.
///
/// # Arguments
/// * `deps` - Handler dependencies (delivery pipeline)
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(command_handler())
        .branch(video_handler(deps.clone()))
        .branch(url_handler(deps))
        .branch(text_fallback_handler())
}

fn command_handler() -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        |bot: Bot, msg: Message, cmd: Command| async move {
            log::info!("🎯 Received command: {:?} from chat {}", cmd, msg.chat.id);
            match cmd {
                Command::Start => {
                    bot.send_message(msg.chat.id, WELCOME_TEXT).await?;
                }
            }
            Ok(())
        },
    ))
}

/// Video messages, video notes and `video/*` documents
fn video_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_map(|msg: Message| video_source(&msg))
        .endpoint(move |bot: Bot, msg: Message, source: RequestSource| {
            let deps = deps.clone();
            async move {
                log::info!("🎬 Video upload from chat {}", msg.chat.id);
                run_pipeline(bot, &msg, source, &deps).await;
                Ok(())
            }
        })
}

/// Text messages carrying an http(s) link
fn url_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_map(|msg: Message| url_source(&msg))
        .endpoint(move |bot: Bot, msg: Message, source: RequestSource| {
            let deps = deps.clone();
            async move {
                log::info!("🔗 Link from chat {}: {:?}", msg.chat.id, source);
                run_pipeline(bot, &msg, source, &deps).await;
                Ok(())
            }
        })
}

fn text_fallback_handler() -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(|bot: Bot, msg: Message| async move {
            bot.send_message(msg.chat.id, SEND_LINK_HINT).await?;
            Ok(())
        })
}

async fn run_pipeline(bot: Bot, msg: &Message, source: RequestSource, deps: &HandlerDeps) {
    let request = request_from_message(msg, source);
    let transport = TelegramTransport::new(bot);
    let report = deps.pipeline.handle(&transport, &request).await;
    if let Some(error) = report.error {
        log::warn!("Request from user {} ended with error: {}", request.user_id, error);
    }
}
