use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use tracing::{info, warn};

use crate::platform::{ConversationTarget, IncomingMessage, MessageKind, Sender, Transport};
use crate::router::Router;

/// Sends replies through the Telegram Bot API
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(&self, target: &ConversationTarget, text: &str) -> Result<()> {
        let chat_id: i64 = target
            .0
            .parse()
            .with_context(|| format!("Invalid Telegram chat id: {}", target))?;
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .with_context(|| format!("Telegram send to {} failed", target))?;
        Ok(())
    }
}

/// Map Telegram media onto the bot's message kinds
fn message_kind(msg: &Message) -> MessageKind {
    if msg.text().is_some() {
        MessageKind::Text
    } else if msg.photo().is_some() {
        MessageKind::Image
    } else if msg.video().is_some() || msg.video_note().is_some() || msg.animation().is_some() {
        MessageKind::Video
    } else if msg.voice().is_some() || msg.audio().is_some() {
        MessageKind::Audio
    } else if msg.sticker().is_some() {
        MessageKind::Emoticon
    } else if msg.location().is_some() || msg.venue().is_some() {
        MessageKind::Location
    } else if msg.contact().is_some() {
        MessageKind::Contact
    } else if msg.document().is_some() {
        MessageKind::Attachment
    } else {
        MessageKind::Unknown
    }
}

/// Message text, falling back to the media caption. `None` when both are blank
/// (polls, service messages, uncaptioned media).
fn message_text<'a>(text: Option<&'a str>, caption: Option<&'a str>) -> Option<&'a str> {
    text.or(caption).filter(|t| !t.trim().is_empty())
}

fn to_incoming(msg: &Message, bot_id: UserId) -> Option<IncomingMessage> {
    let user = msg.from.as_ref()?;
    let text = message_text(msg.text(), msg.caption())?;
    let chat_id = msg.chat.id.0.to_string();

    Some(IncomingMessage {
        sender: Sender {
            id: user.id.0.to_string(),
            display_name: user.full_name(),
            is_self: user.id == bot_id,
        },
        conversation: (!msg.chat.is_private()).then(|| chat_id.clone()),
        reply_to: ConversationTarget(chat_id),
        text: text.to_string(),
        kind: message_kind(msg),
    })
}

/// Establish the bot identity, then dispatch Telegram updates to the router
pub async fn run(router: Arc<Router>, bot: Bot) -> Result<()> {
    let me = bot.get_me().await.context("Failed to fetch bot identity")?;
    let bot_id = me.id;

    info!("Logged in to Telegram as @{}", me.username());
    router.on_identity_established(me.username()).await;

    info!("Starting Telegram platform...");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![router, bot_id])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_message(msg: Message, router: Arc<Router>, bot_id: UserId) -> ResponseResult<()> {
    let Some(incoming) = to_incoming(&msg, bot_id) else {
        return Ok(());
    };

    // Handle on a separate task so a slow completion never stalls the dispatcher
    tokio::spawn(async move {
        router.handle(incoming).await;
    });

    Ok(())
}
