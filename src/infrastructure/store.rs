//! # JSON State Store
//!
//! Persistent state of the bot: per-chat flow state and subscription records,
//! saved to a single JSON file (`data/state.json` by default). Every mutation is
//! written through immediately. An in-memory variant (no file) backs the tests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::domain::errors::StoreError;
use crate::domain::traits::{FlowStore, SubscriptionStore};
use crate::domain::types::{ChatFlowState, ChatId, MessageId, Subscription};

/// A subscription row with its generated identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub id: u64,
    #[serde(flatten)]
    pub subscription: Subscription,
}

/// Everything persisted, mapping chat ids to flow states plus the subscription table.
#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct BotState {
    #[serde(default)]
    pub chats: HashMap<ChatId, ChatFlowState>,
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionRecord>,
    #[serde(default)]
    pub next_subscription_id: u64,
}

impl BotState {
    fn push_subscription(&mut self, subscription: Subscription) {
        self.next_subscription_id += 1;
        self.subscriptions.push(SubscriptionRecord {
            id: self.next_subscription_id,
            subscription,
        });
    }
}

pub struct JsonStore {
    path: Option<PathBuf>,
    state: Mutex<BotState>,
}

impl JsonStore {
    /// Loads the state from `path`, or starts empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BotState::default()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            BotState::default()
        };
        Ok(Self {
            path: Some(path),
            state: Mutex::new(state),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(BotState::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BotState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Applies `change` to a copy, persists it, and only then commits it in memory.
    fn mutate<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut BotState),
    {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        change(&mut next);
        if let Some(path) = &self.path {
            write_atomically(path, &serde_json::to_string_pretty(&next)?)?;
        }
        *guard = next;
        Ok(())
    }
}

/// Writes to a sibling temp file and renames it over `path`.
fn write_atomically(path: &Path, content: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl FlowStore for JsonStore {
    fn load_or_init(&self, chat_id: ChatId) -> Result<ChatFlowState, StoreError> {
        if let Some(state) = self.lock()?.chats.get(&chat_id) {
            tracing::debug!(
                "Chat found in store: {}, type {:?}, stage {:?}",
                chat_id,
                state.flow_type,
                state.stage
            );
            return Ok(state.clone());
        }
        tracing::debug!("Chat not found in store: {}", chat_id);
        let state = ChatFlowState::new(chat_id);
        let created = state.clone();
        self.mutate(move |s| {
            s.chats.entry(chat_id).or_insert(created);
        })?;
        Ok(state)
    }

    fn save(&self, state: &ChatFlowState) -> Result<(), StoreError> {
        let state = state.clone();
        self.mutate(move |s| {
            s.chats.insert(state.chat_id, state);
        })
    }
}

impl SubscriptionStore for JsonStore {
    fn load_all(&self) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .lock()?
            .subscriptions
            .iter()
            .map(|r| r.subscription.clone())
            .collect())
    }

    fn insert(&self, subscription: &Subscription) -> Result<(), StoreError> {
        let subscription = subscription.clone();
        self.mutate(move |s| s.push_subscription(subscription))
    }

    fn delete(&self, chat_id: ChatId, message_id: MessageId) -> Result<(), StoreError> {
        self.mutate(|s| {
            s.subscriptions
                .retain(|r| !r.subscription.same_message(chat_id, message_id))
        })
    }

    fn delete_chat(&self, chat_id: ChatId) -> Result<(), StoreError> {
        self.mutate(|s| s.subscriptions.retain(|r| r.subscription.chat_id != chat_id))
    }

    fn replace_chat(&self, chat_id: ChatId, items: &[Subscription]) -> Result<(), StoreError> {
        let items = items.to_vec();
        self.mutate(move |s| {
            s.subscriptions.retain(|r| r.subscription.chat_id != chat_id);
            for item in items {
                s.push_subscription(item);
            }
        })
    }
}
