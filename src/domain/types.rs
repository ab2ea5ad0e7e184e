//! # Domain Types
//!
//! Conversation flow state and subscription records shared by the flow engine,
//! the registry and the stores.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

pub type ChatId = i64;
pub type MessageId = i32;

/// Group index meaning "not chosen yet" (show every group / ask the user).
pub const UNDETERMINED_GROUP: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowType {
    #[default]
    Initial,
    TrainInfo,
    StationInfo,
    Route,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowStage {
    #[default]
    None,
    AwaitingTrainNumber,
    AwaitingDate,
}

/// Persisted conversation state for one chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatFlowState {
    pub chat_id: ChatId,
    #[serde(default)]
    pub flow_type: FlowType,
    #[serde(default)]
    pub stage: FlowStage,
    #[serde(default)]
    pub pending_data: String,
}

impl ChatFlowState {
    pub fn new(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            flow_type: FlowType::Initial,
            stage: FlowStage::None,
            pending_data: String::new(),
        }
    }

    pub fn set(&mut self, flow_type: FlowType, stage: FlowStage, pending_data: impl Into<String>) {
        self.flow_type = flow_type;
        self.stage = stage;
        self.pending_data = pending_data.into();
    }

    pub fn is_initial(&self) -> bool {
        self.flow_type == FlowType::Initial
    }
}

/// A status message kept live by the poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub train_number: String,
    pub date: DateTime<FixedOffset>,
    pub group_index: i32,
}

impl Subscription {
    pub fn same_message(&self, chat_id: ChatId, message_id: MessageId) -> bool {
        self.chat_id == chat_id && self.message_id == message_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_back_to_initial() {
        let mut state = ChatFlowState::new(7);
        state.set(FlowType::TrainInfo, FlowStage::AwaitingDate, "IR 1538");
        assert!(!state.is_initial());

        state.set(FlowType::Initial, FlowStage::None, "");
        assert_eq!(state, ChatFlowState::new(7));
    }

    #[test]
    fn test_flow_state_serializes_camel_case() {
        let mut state = ChatFlowState::new(1);
        state.set(FlowType::TrainInfo, FlowStage::AwaitingTrainNumber, "");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["flowType"], "trainInfo");
        assert_eq!(json["stage"], "awaitingTrainNumber");
    }
}
