//! # Subscription Commands
//!
//! Subscribe / unsubscribe buttons under a status message and `/unsubscribe_all`.

use anyhow::Result;

use crate::application::callback::CallbackPayload;
use crate::application::keyboards::{self, SubscriptionButton};
use crate::application::lookup::TrainLookup;
use crate::application::registry::SubscriptionRegistry;
use crate::domain::errors::RegistryError;
use crate::domain::message::OutgoingMessage;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{ChatId, MessageId, Subscription, UNDETERMINED_GROUP};
use crate::strings::messages;

/// Registers the pressed message for live updates. Pressing twice is harmless.
pub async fn handle_subscribe(
    lookup: &TrainLookup,
    registry: &SubscriptionRegistry,
    chat: &impl ChatProvider,
    chat_id: ChatId,
    message_id: MessageId,
    payload: &CallbackPayload,
) -> Result<&'static str> {
    let subscription = Subscription {
        chat_id,
        message_id,
        train_number: payload.train_number.clone(),
        date: payload.date(&lookup.clock().zone())?,
        group_index: payload.group_index.unwrap_or(UNDETERMINED_GROUP),
    };

    let answer = if registry.insert_if_absent(chat_id, subscription.clone()).await? {
        tracing::info!(
            "Chat {} subscribed to train {} ({}), message {}",
            chat_id,
            subscription.train_number,
            subscription.date,
            message_id
        );
        messages::SUBSCRIBED
    } else {
        messages::ALREADY_SUBSCRIBED
    };

    swap_button(lookup, chat, &subscription, SubscriptionButton::OfferUnsubscribe).await;
    Ok(answer)
}

pub async fn handle_unsubscribe(
    lookup: &TrainLookup,
    registry: &SubscriptionRegistry,
    chat: &impl ChatProvider,
    chat_id: ChatId,
    message_id: MessageId,
    payload: &CallbackPayload,
) -> Result<&'static str> {
    let answer = match registry.delete_subscription(chat_id, message_id).await {
        Ok(removed) => {
            tracing::info!(
                "Chat {} unsubscribed from train {}, message {}",
                chat_id,
                removed.train_number,
                message_id
            );
            messages::UNSUBSCRIBED
        }
        Err(RegistryError::NotFound { .. }) => messages::NOT_SUBSCRIBED,
        Err(e) => return Err(e.into()),
    };

    let shown = Subscription {
        chat_id,
        message_id,
        train_number: payload.train_number.clone(),
        date: payload.date(&lookup.clock().zone())?,
        group_index: payload.group_index.unwrap_or(UNDETERMINED_GROUP),
    };
    swap_button(lookup, chat, &shown, SubscriptionButton::OfferSubscribe).await;
    Ok(answer)
}

/// Drops every subscription of the chat and restores their subscribe buttons.
pub async fn handle_unsubscribe_all(
    lookup: &TrainLookup,
    registry: &SubscriptionRegistry,
    chat: &impl ChatProvider,
    chat_id: ChatId,
) -> Result<()> {
    let removed = registry.delete_chat(chat_id).await?;
    tracing::info!("Chat {} dropped {} subscription(s)", chat_id, removed.len());

    for subscription in &removed {
        swap_button(lookup, chat, subscription, SubscriptionButton::OfferSubscribe).await;
    }
    chat.send_message(chat_id, &OutgoingMessage::text(messages::ALL_UNSUBSCRIBED))
        .await?;
    Ok(())
}

async fn swap_button(
    lookup: &TrainLookup,
    chat: &impl ChatProvider,
    subscription: &Subscription,
    button: SubscriptionButton,
) {
    let keyboard = keyboards::status_keyboard(
        &subscription.train_number,
        subscription.date,
        subscription.group_index,
        button,
        lookup.web_app_url(),
    );
    if let Err(e) = chat
        .edit_keyboard(subscription.chat_id, subscription.message_id, &keyboard)
        .await
    {
        tracing::warn!(
            "Failed to update buttons of message {}: {}",
            subscription.message_id,
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::callback::CallbackAction;
    use crate::domain::message::Button;
    use crate::infrastructure::store::JsonStore;
    use crate::testing::{ChatEvent, FakeTrainProvider, RecordingChat, at, clock_at, subscription};
    use std::sync::Arc;

    fn setup() -> (TrainLookup, SubscriptionRegistry) {
        let lookup = TrainLookup::new(
            Arc::new(FakeTrainProvider::default()),
            clock_at("2024-03-15T09:00:00+02:00"),
            "https://example.org/view-train.html",
        );
        let registry = SubscriptionRegistry::hydrate(Arc::new(JsonStore::in_memory())).unwrap();
        (lookup, registry)
    }

    fn payload(action: CallbackAction) -> CallbackPayload {
        CallbackPayload::new(action, "1538", at("2024-03-15T07:10:00+02:00"), Some(0))
    }

    fn first_button_text(event: &ChatEvent) -> String {
        let ChatEvent::KeyboardEdited { keyboard, .. } = event else {
            panic!("expected keyboard edit, got {:?}", event);
        };
        keyboard.buttons().next().map(Button::text).unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let (lookup, registry) = setup();
        let chat = RecordingChat::default();
        let sub = payload(CallbackAction::Subscribe);

        let answer = handle_subscribe(&lookup, &registry, &chat, 1, 10, &sub).await.unwrap();
        assert_eq!(answer, messages::SUBSCRIBED);
        let answer = handle_subscribe(&lookup, &registry, &chat, 1, 10, &sub).await.unwrap();
        assert_eq!(answer, messages::ALREADY_SUBSCRIBED);

        assert_eq!(registry.chat_subscriptions(1).await, vec![subscription(1, 10)]);
        let events = chat.events();
        assert_eq!(events.len(), 2);
        assert_eq!(first_button_text(&events[0]), messages::UNSUBSCRIBE_BUTTON);
    }

    #[tokio::test]
    async fn test_unsubscribe_restores_subscribe_button() {
        let (lookup, registry) = setup();
        let chat = RecordingChat::default();
        registry.insert(1, subscription(1, 10)).await.unwrap();

        let unsub = payload(CallbackAction::Unsubscribe);
        let answer = handle_unsubscribe(&lookup, &registry, &chat, 1, 10, &unsub).await.unwrap();
        assert_eq!(answer, messages::UNSUBSCRIBED);
        assert_eq!(registry.len().await, 0);

        let answer = handle_unsubscribe(&lookup, &registry, &chat, 1, 10, &unsub).await.unwrap();
        assert_eq!(answer, messages::NOT_SUBSCRIBED);

        for event in chat.events() {
            assert_eq!(first_button_text(&event), messages::SUBSCRIBE_BUTTON);
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_all() {
        let (lookup, registry) = setup();
        let chat = RecordingChat::default();
        registry.insert(1, subscription(1, 10)).await.unwrap();
        registry.insert(1, subscription(1, 11)).await.unwrap();
        registry.insert(2, subscription(2, 20)).await.unwrap();

        handle_unsubscribe_all(&lookup, &registry, &chat, 1).await.unwrap();

        assert_eq!(registry.len().await, 1);
        let events = chat.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events.last(),
            Some(ChatEvent::Sent { chat_id: 1, message, .. }) if message.text == messages::ALL_UNSUBSCRIBED
        ));
    }

    #[tokio::test]
    async fn test_unsubscribe_all_racing_subscribe_restores_every_removed_button() {
        let (lookup, registry) = setup();
        let chat = RecordingChat::default();

        let subscribe = async {
            for message_id in 10..30 {
                registry.insert(1, subscription(1, message_id)).await.unwrap();
                tokio::task::yield_now().await;
            }
        };
        let unsubscribe = async {
            tokio::task::yield_now().await;
            handle_unsubscribe_all(&lookup, &registry, &chat, 1).await.unwrap();
        };
        tokio::join!(subscribe, unsubscribe);

        let remaining: Vec<MessageId> = registry
            .chat_subscriptions(1)
            .await
            .iter()
            .map(|s| s.message_id)
            .collect();
        let restored: Vec<MessageId> = chat
            .events()
            .iter()
            .filter_map(|e| match e {
                ChatEvent::KeyboardEdited { message_id, .. } => Some(*message_id),
                _ => None,
            })
            .collect();
        for message_id in 10..30 {
            assert!(
                remaining.contains(&message_id) ^ restored.contains(&message_id),
                "message {message_id} is neither live nor restored"
            );
        }
    }
}
