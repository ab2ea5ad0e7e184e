//! # Update Router
//!
//! Routes incoming chat messages and inline-button presses to the flow engine or
//! to the appropriate command handler (in `interface/commands`).
//! Commands are matched on the first word, with an optional `@botname` suffix.

use anyhow::Result;
use std::sync::Arc;

use crate::application::callback::{CallbackAction, CallbackPayload};
use crate::application::flow::{FlowEngine, FlowInput};
use crate::application::lookup::TrainLookup;
use crate::application::registry::SubscriptionRegistry;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{ChatId, MessageId};
use crate::interface::commands::{self, train_info::Delivery};
use crate::strings::{help, messages};

/// An inline-button press.
#[derive(Debug, Clone, Copy)]
pub struct CallbackQuery<'a> {
    pub query_id: &'a str,
    pub chat_id: ChatId,
    /// Message carrying the pressed button.
    pub message_id: MessageId,
    pub data: &'a str,
}

pub struct UpdateRouter {
    flow: FlowEngine,
    lookup: Arc<TrainLookup>,
    registry: Arc<SubscriptionRegistry>,
}

impl UpdateRouter {
    pub fn new(flow: FlowEngine, lookup: Arc<TrainLookup>, registry: Arc<SubscriptionRegistry>) -> Self {
        Self {
            flow,
            lookup,
            registry,
        }
    }

    pub async fn route_message(&self, chat: &impl ChatProvider, chat_id: ChatId, text: &str) -> Result<()> {
        let msg = text.trim();
        let (cmd, args) = split_command(msg);
        tracing::debug!("Router dispatching cmd='{}' args='{}' chat={}", cmd, args, chat_id);

        let input = match cmd {
            help::START_COMMAND => return commands::help::handle_help(chat, chat_id).await,
            help::UNSUBSCRIBE_ALL_COMMAND => {
                return commands::subscription::handle_unsubscribe_all(
                    &self.lookup,
                    &self.registry,
                    chat,
                    chat_id,
                )
                .await;
            }
            help::STATION_INFO_COMMAND | help::ROUTE_COMMAND => {
                return commands::help::handle_unavailable(chat, chat_id).await;
            }
            help::TRAIN_INFO_COMMAND => FlowInput::TrainInfo(args),
            help::CANCEL_COMMAND => FlowInput::Cancel,
            _ => FlowInput::Text(msg),
        };

        let outcome = self.flow.handle(chat_id, input)?;
        commands::train_info::handle_outcome(&self.lookup, &self.registry, chat, chat_id, outcome).await
    }

    /// Handles the press and always answers the query, even when handling failed.
    pub async fn route_callback(&self, chat: &impl ChatProvider, query: CallbackQuery<'_>) -> Result<()> {
        let answer = match self.dispatch_callback(chat, &query).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Callback {:?} in chat {} failed: {:#}", query.data, query.chat_id, e);
                Some(messages::SUBSCRIPTION_FAILED).filter(|_| is_subscription_tag(query.data))
            }
        };
        chat.answer_callback(query.query_id, answer).await
    }

    async fn dispatch_callback(
        &self,
        chat: &impl ChatProvider,
        query: &CallbackQuery<'_>,
    ) -> Result<Option<&'static str>> {
        let payload = match CallbackPayload::decode(query.data) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Ignoring callback from chat {}: {}", query.chat_id, e);
                return Ok(None);
            }
        };
        tracing::debug!("Callback {:?} from chat {}", payload.action, query.chat_id);

        match payload.action {
            CallbackAction::ChooseDate => {
                let request = self.flow.choose_date(query.chat_id, &payload)?;
                commands::train_info::handle_lookup(
                    &self.lookup,
                    &self.registry,
                    chat,
                    query.chat_id,
                    &request,
                    Delivery::Progress,
                )
                .await
            }
            CallbackAction::ChooseGroup => {
                let request = self.flow.choose_group(&payload)?;
                commands::train_info::handle_lookup(
                    &self.lookup,
                    &self.registry,
                    chat,
                    query.chat_id,
                    &request,
                    Delivery::InPlace(query.message_id),
                )
                .await
            }
            CallbackAction::Subscribe => commands::subscription::handle_subscribe(
                &self.lookup,
                &self.registry,
                chat,
                query.chat_id,
                query.message_id,
                &payload,
            )
            .await
            .map(Some),
            CallbackAction::Unsubscribe => commands::subscription::handle_unsubscribe(
                &self.lookup,
                &self.registry,
                chat,
                query.chat_id,
                query.message_id,
                &payload,
            )
            .await
            .map(Some),
        }
    }
}

/// Splits `/command@bot rest` into (`/command`, `rest`). Plain text yields an empty command.
fn split_command(msg: &str) -> (&str, &str) {
    if !msg.starts_with('/') {
        return ("", msg);
    }
    let (head, args) = match msg.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (msg, ""),
    };
    let cmd = head.split_once('@').map_or(head, |(cmd, _)| cmd);
    (cmd, args)
}

fn is_subscription_tag(data: &str) -> bool {
    [CallbackAction::Subscribe, CallbackAction::Unsubscribe]
        .iter()
        .any(|action| data.split(crate::application::callback::SEPARATOR).next() == Some(action.tag()))
}
