//! # Help Command
//!
//! Handles `/start`.
//! Displays the main help menu to the user.

use crate::domain::message::OutgoingMessage;
use crate::domain::traits::ChatProvider;
use crate::domain::types::ChatId;
use anyhow::Result;

pub async fn handle_help(chat: &impl ChatProvider, chat_id: ChatId) -> Result<()> {
    chat.send_message(chat_id, &OutgoingMessage::text(crate::strings::help::MAIN))
        .await
        .map(|_| ())
}

pub async fn handle_unavailable(chat: &impl ChatProvider, chat_id: ChatId) -> Result<()> {
    chat.send_message(
        chat_id,
        &OutgoingMessage::text(crate::strings::messages::FEATURE_UNAVAILABLE),
    )
    .await
    .map(|_| ())
}
