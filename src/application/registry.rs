//! # Subscription Registry
//!
//! In-memory index `chat -> subscriptions` mirrored to a [`SubscriptionStore`].
//! Every mutation holds the write lock for the whole read-modify-persist sequence;
//! storage is written first and memory only changes if that write succeeded.
//! Poll cycles take the read lock through [`SubscriptionRegistry::snapshot`].

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard};

use crate::domain::errors::{RegistryError, StoreError};
use crate::domain::traits::SubscriptionStore;
use crate::domain::types::{ChatId, MessageId, Subscription};

type Buckets = HashMap<ChatId, Vec<Subscription>>;

pub struct SubscriptionRegistry {
    buckets: RwLock<Buckets>,
    store: Arc<dyn SubscriptionStore>,
}

/// Point-in-time view of all subscriptions. Writers are blocked while it is alive.
pub struct Snapshot<'a> {
    _guard: RwLockReadGuard<'a, Buckets>,
    items: Vec<Subscription>,
}

impl Snapshot<'_> {
    pub fn items(&self) -> &[Subscription] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl SubscriptionRegistry {
    /// Builds the registry from everything currently persisted.
    pub fn hydrate(store: Arc<dyn SubscriptionStore>) -> Result<Self, StoreError> {
        let mut buckets = Buckets::new();
        for subscription in store.load_all()? {
            buckets
                .entry(subscription.chat_id)
                .or_default()
                .push(subscription);
        }
        Ok(Self {
            buckets: RwLock::new(buckets),
            store,
        })
    }

    /// Swaps the chat's whole collection. Rejected without any change if an item
    /// belongs to another chat.
    pub async fn replace(&self, chat_id: ChatId, items: Vec<Subscription>) -> Result<(), RegistryError> {
        if let Some(foreign) = items.iter().find(|s| s.chat_id != chat_id) {
            return Err(RegistryError::ChatMismatch {
                expected: chat_id,
                found: foreign.chat_id,
            });
        }
        let mut buckets = self.buckets.write().await;
        self.store.replace_chat(chat_id, &items)?;
        if items.is_empty() {
            buckets.remove(&chat_id);
        } else {
            buckets.insert(chat_id, items);
        }
        Ok(())
    }

    pub async fn insert(&self, chat_id: ChatId, item: Subscription) -> Result<(), RegistryError> {
        if item.chat_id != chat_id {
            return Err(RegistryError::ChatMismatch {
                expected: chat_id,
                found: item.chat_id,
            });
        }
        let mut buckets = self.buckets.write().await;
        self.store.insert(&item)?;
        buckets.entry(chat_id).or_default().push(item);
        Ok(())
    }

    /// Inserts unless the chat already has a subscription on the same message.
    /// Returns whether the item was added.
    pub async fn insert_if_absent(&self, chat_id: ChatId, item: Subscription) -> Result<bool, RegistryError> {
        if item.chat_id != chat_id {
            return Err(RegistryError::ChatMismatch {
                expected: chat_id,
                found: item.chat_id,
            });
        }
        let mut buckets = self.buckets.write().await;
        let exists = buckets
            .get(&chat_id)
            .is_some_and(|b| b.iter().any(|s| s.message_id == item.message_id));
        if exists {
            return Ok(false);
        }
        self.store.insert(&item)?;
        buckets.entry(chat_id).or_default().push(item);
        Ok(true)
    }

    /// Drops every subscription of the chat and returns what was removed.
    pub async fn delete_chat(&self, chat_id: ChatId) -> Result<Vec<Subscription>, RegistryError> {
        let mut buckets = self.buckets.write().await;
        self.store.delete_chat(chat_id)?;
        Ok(buckets.remove(&chat_id).unwrap_or_default())
    }

    /// Removes the subscription of one message and returns it. Order inside the
    /// chat's collection is not preserved.
    pub async fn delete_subscription(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> Result<Subscription, RegistryError> {
        let mut buckets = self.buckets.write().await;
        let not_found = RegistryError::NotFound { chat_id, message_id };

        let bucket = buckets.get_mut(&chat_id).ok_or(not_found)?;
        let index = bucket
            .iter()
            .position(|s| s.message_id == message_id)
            .ok_or(RegistryError::NotFound { chat_id, message_id })?;

        self.store.delete(chat_id, message_id)?;
        let removed = bucket.swap_remove(index);
        if bucket.is_empty() {
            buckets.remove(&chat_id);
        }
        Ok(removed)
    }

    pub async fn contains(&self, chat_id: ChatId, message_id: MessageId) -> bool {
        self.buckets
            .read()
            .await
            .get(&chat_id)
            .is_some_and(|b| b.iter().any(|s| s.message_id == message_id))
    }

    pub async fn chat_subscriptions(&self, chat_id: ChatId) -> Vec<Subscription> {
        self.buckets
            .read()
            .await
            .get(&chat_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn len(&self) -> usize {
        self.buckets.read().await.values().map(Vec::len).sum()
    }

    /// Takes the shared lock and copies every subscription out. The lock is held
    /// until the snapshot is dropped.
    pub async fn snapshot(&self) -> Snapshot<'_> {
        let guard = self.buckets.read().await;
        let items = guard.values().flatten().cloned().collect();
        Snapshot {
            _guard: guard,
            items,
        }
    }
}
