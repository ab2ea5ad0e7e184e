//! # Telegram Service Adapter
//!
//! Implements the `ChatProvider` trait for the Telegram Bot API using `teloxide`.
//! Messages go out as HTML with an optional inline keyboard.

use crate::domain::message::{Button, Keyboard, OutgoingMessage};
use crate::domain::traits::ChatProvider;
use crate::domain::types::{ChatId, MessageId};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Url;
use teloxide::ApiError;
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId as TgMessageId,
    ParseMode,
};

#[derive(Clone)]
pub struct TelegramService {
    bot: Bot,
}

impl TelegramService {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Converts the domain keyboard. URL buttons with an unparseable address are dropped.
pub fn to_markup(keyboard: &Keyboard) -> InlineKeyboardMarkup {
    let rows = keyboard.rows.iter().map(|row| {
        row.iter()
            .filter_map(|button| match button {
                Button::Callback { text, data } => {
                    Some(InlineKeyboardButton::callback(text.clone(), data.clone()))
                }
                Button::Url { text, url } => match Url::parse(url) {
                    Ok(url) => Some(InlineKeyboardButton::url(text.clone(), url)),
                    Err(e) => {
                        tracing::warn!("Dropping button {:?} with invalid url: {}", text, e);
                        None
                    }
                },
            })
            .collect::<Vec<_>>()
    });
    InlineKeyboardMarkup::new(rows)
}

/// Telegram refuses edits that leave a message unchanged; that is not a failure here.
fn ignore_not_modified(result: Result<Message, RequestError>) -> Result<()> {
    match result {
        Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ChatProvider for TelegramService {
    async fn send_message(&self, chat_id: ChatId, message: &OutgoingMessage) -> Result<MessageId> {
        tracing::debug!("Bot sending message to {}", chat_id);
        let mut request = self
            .bot
            .send_message(teloxide::types::ChatId(chat_id), message.text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = &message.keyboard {
            request = request.reply_markup(to_markup(keyboard));
        }
        let sent = request.await?;
        Ok(sent.id.0)
    }

    async fn edit_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        message: &OutgoingMessage,
    ) -> Result<()> {
        let mut request = self
            .bot
            .edit_message_text(
                teloxide::types::ChatId(chat_id),
                TgMessageId(message_id),
                message.text.clone(),
            )
            .parse_mode(ParseMode::Html);
        if let Some(keyboard) = &message.keyboard {
            request = request.reply_markup(to_markup(keyboard));
        }
        ignore_not_modified(request.await)
    }

    async fn edit_keyboard(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        keyboard: &Keyboard,
    ) -> Result<()> {
        let request = self
            .bot
            .edit_message_reply_markup(teloxide::types::ChatId(chat_id), TgMessageId(message_id))
            .reply_markup(to_markup(keyboard));
        ignore_not_modified(request.await)
    }

    async fn answer_callback(&self, query_id: &str, text: Option<&str>) -> Result<()> {
        let mut request = self
            .bot
            .answer_callback_query(CallbackQueryId(query_id.to_string()));
        if let Some(text) = text {
            request = request.text(text);
        }
        request.await?;
        Ok(())
    }
}
