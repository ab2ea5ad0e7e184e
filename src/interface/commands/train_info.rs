//! # Train Info Command
//!
//! Realizes flow outcomes and runs interactive lookups. A lookup started from a
//! message or a date pick is reported through a "Please wait..." message that is
//! edited with the result; a group pick edits the pressed message in place.

use anyhow::Result;

use crate::application::flow::FlowOutcome;
use crate::application::lookup::{LookupRequest, TrainLookup};
use crate::application::registry::SubscriptionRegistry;
use crate::domain::message::OutgoingMessage;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{ChatId, MessageId};
use crate::strings::messages;

/// Where the result of an interactive lookup goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Send a progress message first, then edit it.
    Progress,
    /// Edit an existing message.
    InPlace(MessageId),
}

pub async fn handle_outcome(
    lookup: &TrainLookup,
    registry: &SubscriptionRegistry,
    chat: &impl ChatProvider,
    chat_id: ChatId,
    outcome: FlowOutcome,
) -> Result<()> {
    match outcome {
        FlowOutcome::Reply(message) => chat.send_message(chat_id, &message).await.map(|_| ()),
        FlowOutcome::Lookup(request) => {
            handle_lookup(lookup, registry, chat, chat_id, &request, Delivery::Progress)
                .await
                .map(|_| ())
        }
        FlowOutcome::Silent => Ok(()),
    }
}

/// Returns a short notice for the caller to show when nothing could be edited.
pub async fn handle_lookup(
    lookup: &TrainLookup,
    registry: &SubscriptionRegistry,
    chat: &impl ChatProvider,
    chat_id: ChatId,
    request: &LookupRequest,
    delivery: Delivery,
) -> Result<Option<&'static str>> {
    tracing::info!(
        "Looking up train {} on {} (group {}) for chat {}",
        request.train_number,
        request.date,
        request.group_index,
        chat_id
    );

    let (target, is_subscribed) = match delivery {
        Delivery::Progress => {
            let progress = chat
                .send_message(chat_id, &OutgoingMessage::text(messages::PLEASE_WAIT))
                .await;
            match progress {
                Ok(message_id) => (Some(message_id), false),
                Err(e) => {
                    tracing::warn!("Failed to send progress message to {}: {}", chat_id, e);
                    (None, false)
                }
            }
        }
        Delivery::InPlace(message_id) => {
            (Some(message_id), registry.contains(chat_id, message_id).await)
        }
    };

    let message = match lookup.lookup(request, is_subscribed).await {
        Ok(outcome) => outcome.message,
        Err(e) => {
            tracing::warn!("Train service unreachable: {}", e);
            if let Delivery::InPlace(_) = delivery {
                // Keep the pressed message as it was.
                return Ok(Some(messages::SERVICE_UNREACHABLE));
            }
            OutgoingMessage::text(messages::SERVICE_UNREACHABLE)
        }
    };

    match target {
        Some(message_id) => chat.edit_message(chat_id, message_id, &message).await?,
        None => {
            chat.send_message(chat_id, &message).await?;
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::LookupError;
    use crate::domain::types::UNDETERMINED_GROUP;
    use crate::infrastructure::store::JsonStore;
    use crate::testing::{ChatEvent, FakeTrainProvider, RecordingChat, at, clock_at, two_group_train};
    use std::sync::Arc;

    fn setup(provider: FakeTrainProvider) -> (TrainLookup, SubscriptionRegistry) {
        let lookup = TrainLookup::new(
            Arc::new(provider),
            clock_at("2024-03-15T09:00:00+02:00"),
            "https://example.org/view-train.html",
        );
        let registry = SubscriptionRegistry::hydrate(Arc::new(JsonStore::in_memory())).unwrap();
        (lookup, registry)
    }

    fn request() -> LookupRequest {
        LookupRequest::new("1538", at("2024-03-15T12:00:00+02:00"), UNDETERMINED_GROUP)
    }

    #[tokio::test]
    async fn test_progress_message_is_edited() {
        let (lookup, registry) = setup(FakeTrainProvider::default().with_train("1538", two_group_train()));
        let chat = RecordingChat::default();

        handle_lookup(&lookup, &registry, &chat, 7, &request(), Delivery::Progress)
            .await
            .unwrap();

        let events = chat.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            ChatEvent::Sent { message_id: 100, message, .. } if message.text == messages::PLEASE_WAIT
        ));
        let ChatEvent::Edited { message_id, message, .. } = &events[1] else {
            panic!("expected edit, got {:?}", events[1]);
        };
        assert_eq!(*message_id, 100);
        assert!(message.text.contains("multiple groups"));
    }

    #[tokio::test]
    async fn test_failed_progress_falls_back_to_send() {
        let (lookup, registry) = setup(FakeTrainProvider::default());
        let chat = RecordingChat::refusing_sends(1);

        handle_lookup(&lookup, &registry, &chat, 7, &request(), Delivery::Progress)
            .await
            .unwrap();

        let events = chat.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ChatEvent::Sent { message, .. } if message.text.contains("was not found")
        ));
    }

    #[tokio::test]
    async fn test_transport_error_is_reported() {
        let provider = FakeTrainProvider::default().with_error(
            "1538",
            LookupError::Transport {
                train: "1538".to_string(),
                message: "timed out".to_string(),
            },
        );
        let (lookup, registry) = setup(provider);
        let chat = RecordingChat::default();

        let notice = handle_lookup(&lookup, &registry, &chat, 7, &request(), Delivery::Progress)
            .await
            .unwrap();
        assert_eq!(notice, None);
        assert!(matches!(
            chat.events().last(),
            Some(ChatEvent::Edited { message, .. }) if message.text == messages::SERVICE_UNREACHABLE
        ));

        let notice = handle_lookup(&lookup, &registry, &chat, 7, &request(), Delivery::InPlace(55))
            .await
            .unwrap();
        assert_eq!(notice, Some(messages::SERVICE_UNREACHABLE));
        assert!(
            !chat
                .events()
                .iter()
                .any(|e| matches!(e, ChatEvent::Edited { message_id: 55, .. }))
        );
    }

    #[tokio::test]
    async fn test_outcome_reply_is_sent() {
        let (lookup, registry) = setup(FakeTrainProvider::default());
        let chat = RecordingChat::default();

        let outcome = FlowOutcome::Reply(OutgoingMessage::text(messages::COMMAND_CANCELLED));
        handle_outcome(&lookup, &registry, &chat, 3, outcome).await.unwrap();
        handle_outcome(&lookup, &registry, &chat, 3, FlowOutcome::Silent).await.unwrap();

        assert_eq!(chat.events().len(), 1);
    }
}
