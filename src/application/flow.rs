//! # Conversation Flow
//!
//! Per-chat state machine over `(flow type, stage)` that turns commands and free
//! text into a prompt or a lookup request. Inline-button callbacks do not go through
//! the stored state: their payload carries the whole request.

use std::sync::Arc;

use crate::application::callback::{CallbackPayload, MAX_TRAIN_NUMBER_BYTES};
use crate::application::clock::ServiceClock;
use crate::application::dates::parse_date;
use crate::application::keyboards;
use crate::application::lookup::LookupRequest;
use crate::domain::errors::{CallbackError, StoreError};
use crate::domain::message::OutgoingMessage;
use crate::domain::traits::FlowStore;
use crate::domain::types::{ChatFlowState, ChatId, FlowStage, FlowType, UNDETERMINED_GROUP};
use crate::strings::{help, messages};

/// Interactive input, already classified by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowInput<'a> {
    /// `/train_info` with everything after the command.
    TrainInfo(&'a str),
    Cancel,
    Text(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Prompt or final answer, sent as a new message.
    Reply(OutgoingMessage),
    /// Run the lookup and report its result.
    Lookup(LookupRequest),
    /// Nothing to send.
    Silent,
}

pub struct FlowEngine {
    store: Arc<dyn FlowStore>,
    clock: ServiceClock,
}

impl FlowEngine {
    pub fn new(store: Arc<dyn FlowStore>, clock: ServiceClock) -> Self {
        Self { store, clock }
    }

    pub fn handle(&self, chat_id: ChatId, input: FlowInput<'_>) -> Result<FlowOutcome, StoreError> {
        let mut state = self.store.load_or_init(chat_id)?;

        match input {
            FlowInput::Cancel => {
                self.transition(&mut state, FlowType::Initial, FlowStage::None, "")?;
                Ok(FlowOutcome::Reply(OutgoingMessage::text(messages::COMMAND_CANCELLED)))
            }
            // A new train command always starts over, whatever was in progress.
            FlowInput::TrainInfo(args) => {
                if !state.is_initial() {
                    tracing::debug!("Restarting train info flow for chat {}", chat_id);
                }
                self.train_command(&mut state, args)
            }
            FlowInput::Text(text) => self.continue_flow(&mut state, text),
        }
    }

    /// A date picked from the inline picker. Resets the flow unconditionally.
    pub fn choose_date(
        &self,
        chat_id: ChatId,
        payload: &CallbackPayload,
    ) -> Result<LookupRequest, FlowCallbackError> {
        let date = payload.date(&self.clock.zone())?;
        let mut state = self.store.load_or_init(chat_id)?;
        self.transition(&mut state, FlowType::Initial, FlowStage::None, "")?;
        Ok(LookupRequest::new(
            payload.train_number.clone(),
            date,
            UNDETERMINED_GROUP,
        ))
    }

    /// A group picked under a disambiguation message. Leaves the flow untouched.
    pub fn choose_group(&self, payload: &CallbackPayload) -> Result<LookupRequest, CallbackError> {
        let date = payload.date(&self.clock.zone())?;
        Ok(LookupRequest::new(
            payload.train_number.clone(),
            date,
            payload.group_index.unwrap_or(UNDETERMINED_GROUP),
        ))
    }

    fn train_command(&self, state: &mut ChatFlowState, args: &str) -> Result<FlowOutcome, StoreError> {
        let params: Vec<&str> = args.split_whitespace().collect();
        match params.as_slice() {
            [] => {
                self.transition(state, FlowType::TrainInfo, FlowStage::AwaitingTrainNumber, "")?;
                Ok(FlowOutcome::Reply(OutgoingMessage::text(
                    messages::WAITING_FOR_TRAIN_NUMBER,
                )))
            }
            [train_number] if is_too_long(train_number) => {
                self.transition(state, FlowType::TrainInfo, FlowStage::AwaitingTrainNumber, "")?;
                Ok(FlowOutcome::Reply(OutgoingMessage::text(messages::TRAIN_NUMBER_TOO_LONG)))
            }
            [train_number] => {
                self.transition(state, FlowType::TrainInfo, FlowStage::AwaitingDate, *train_number)?;
                Ok(self.choose_date_prompt(train_number))
            }
            [train_number, date, rest @ ..] => {
                self.transition(state, FlowType::Initial, FlowStage::None, "")?;
                if is_too_long(train_number) {
                    return Ok(FlowOutcome::Reply(OutgoingMessage::text(
                        messages::TRAIN_NUMBER_TOO_LONG,
                    )));
                }
                let Ok(date) = parse_date(date, &self.clock.now()) else {
                    return Ok(FlowOutcome::Reply(OutgoingMessage::text(messages::INVALID_DATE)));
                };
                let group_index = rest
                    .first()
                    .and_then(|g| g.parse().ok())
                    .unwrap_or(UNDETERMINED_GROUP);
                Ok(FlowOutcome::Lookup(LookupRequest::new(*train_number, date, group_index)))
            }
        }
    }

    fn continue_flow(&self, state: &mut ChatFlowState, text: &str) -> Result<FlowOutcome, StoreError> {
        match (state.flow_type, state.stage) {
            (FlowType::Initial, FlowStage::None) => {
                Ok(FlowOutcome::Reply(OutgoingMessage::text(help::MAIN)))
            }
            (FlowType::TrainInfo, FlowStage::AwaitingTrainNumber) => {
                let train_number = text.trim();
                if is_too_long(train_number) {
                    return Ok(FlowOutcome::Reply(OutgoingMessage::text(
                        messages::TRAIN_NUMBER_TOO_LONG,
                    )));
                }
                self.transition(state, FlowType::TrainInfo, FlowStage::AwaitingDate, train_number)?;
                Ok(self.choose_date_prompt(train_number))
            }
            (FlowType::TrainInfo, FlowStage::AwaitingDate) => {
                match parse_date(text, &self.clock.now()) {
                    Ok(date) => {
                        let train_number = state.pending_data.clone();
                        self.transition(state, FlowType::Initial, FlowStage::None, "")?;
                        Ok(FlowOutcome::Lookup(LookupRequest::new(
                            train_number,
                            date,
                            UNDETERMINED_GROUP,
                        )))
                    }
                    Err(err) => {
                        tracing::debug!("Chat {}: {}", state.chat_id, err);
                        Ok(FlowOutcome::Reply(OutgoingMessage::text(messages::INVALID_DATE)))
                    }
                }
            }
            (flow_type, stage) => {
                tracing::error!(
                    "Chat {} is in an unhandled flow state {:?}/{:?}",
                    state.chat_id,
                    flow_type,
                    stage
                );
                Ok(FlowOutcome::Silent)
            }
        }
    }

    fn choose_date_prompt(&self, train_number: &str) -> FlowOutcome {
        let keyboard = keyboards::date_picker(train_number, self.clock.now());
        FlowOutcome::Reply(OutgoingMessage::text(messages::CHOOSE_DATE).with_keyboard(keyboard))
    }

    fn transition(
        &self,
        state: &mut ChatFlowState,
        flow_type: FlowType,
        stage: FlowStage,
        pending_data: &str,
    ) -> Result<(), StoreError> {
        state.set(flow_type, stage, pending_data);
        self.store.save(state)?;
        tracing::debug!(
            "Chat {} flow set to type {:?}, stage {:?}",
            state.chat_id,
            flow_type,
            stage
        );
        Ok(())
    }
}

/// Train numbers travel inside callback data, which Telegram caps at 64 bytes.
fn is_too_long(train_number: &str) -> bool {
    train_number.len() > MAX_TRAIN_NUMBER_BYTES
}

#[derive(Debug, thiserror::Error)]
pub enum FlowCallbackError {
    #[error(transparent)]
    Callback(#[from] CallbackError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::callback::CallbackAction;
    use crate::infrastructure::store::JsonStore;
    use crate::testing::{at, clock_at};

    fn engine() -> (FlowEngine, Arc<JsonStore>) {
        let store = Arc::new(JsonStore::in_memory());
        let clock = clock_at("2024-03-15T09:00:00+02:00");
        (FlowEngine::new(store.clone(), clock), store)
    }

    fn stage_of(store: &JsonStore, chat_id: ChatId) -> (FlowType, FlowStage, String) {
        let state = store.load_or_init(chat_id).unwrap();
        (state.flow_type, state.stage, state.pending_data)
    }

    #[test]
    fn test_bare_command_asks_for_train_number() {
        let (engine, store) = engine();
        let outcome = engine.handle(1, FlowInput::TrainInfo("")).unwrap();
        assert_eq!(
            outcome,
            FlowOutcome::Reply(OutgoingMessage::text(messages::WAITING_FOR_TRAIN_NUMBER))
        );
        assert_eq!(
            stage_of(&store, 1),
            (FlowType::TrainInfo, FlowStage::AwaitingTrainNumber, String::new())
        );

        let outcome = engine.handle(1, FlowInput::Text(" 1538 ")).unwrap();
        let FlowOutcome::Reply(prompt) = outcome else {
            panic!("expected date prompt");
        };
        assert_eq!(prompt.text, messages::CHOOSE_DATE);
        assert!(prompt.keyboard.is_some());
        assert_eq!(
            stage_of(&store, 1),
            (FlowType::TrainInfo, FlowStage::AwaitingDate, "1538".to_string())
        );
    }

    #[test]
    fn test_overlong_train_number_is_refused() {
        let (engine, store) = engine();
        let long = "1".repeat(MAX_TRAIN_NUMBER_BYTES + 1);
        let refused = FlowOutcome::Reply(OutgoingMessage::text(messages::TRAIN_NUMBER_TOO_LONG));

        engine.handle(1, FlowInput::TrainInfo("")).unwrap();
        assert_eq!(engine.handle(1, FlowInput::Text(&long)).unwrap(), refused);
        assert_eq!(
            stage_of(&store, 1),
            (FlowType::TrainInfo, FlowStage::AwaitingTrainNumber, String::new())
        );

        assert_eq!(engine.handle(2, FlowInput::TrainInfo(&long)).unwrap(), refused);
        assert_eq!(
            stage_of(&store, 2),
            (FlowType::TrainInfo, FlowStage::AwaitingTrainNumber, String::new())
        );

        let one_shot = format!("{long} 15.03.2024");
        assert_eq!(engine.handle(3, FlowInput::TrainInfo(&one_shot)).unwrap(), refused);
        assert_eq!(stage_of(&store, 3), (FlowType::Initial, FlowStage::None, String::new()));

        let fits = "1".repeat(MAX_TRAIN_NUMBER_BYTES);
        let FlowOutcome::Reply(prompt) = engine.handle(1, FlowInput::Text(&fits)).unwrap() else {
            panic!("expected date prompt");
        };
        assert_eq!(prompt.text, messages::CHOOSE_DATE);
    }

    #[test]
    fn test_two_step_equals_one_shot() {
        let (engine, store) = engine();

        engine.handle(1, FlowInput::TrainInfo("1538")).unwrap();
        let two_step = engine.handle(1, FlowInput::Text("15.03.2024")).unwrap();
        assert_eq!(stage_of(&store, 1), (FlowType::Initial, FlowStage::None, String::new()));

        let one_shot = engine.handle(2, FlowInput::TrainInfo("1538 15.03.2024")).unwrap();
        assert_eq!(stage_of(&store, 2), (FlowType::Initial, FlowStage::None, String::new()));

        assert_eq!(two_step, one_shot);
        assert_eq!(
            one_shot,
            FlowOutcome::Lookup(LookupRequest::new(
                "1538",
                at("2024-03-15T12:00:00+02:00"),
                UNDETERMINED_GROUP
            ))
        );
    }

    #[test]
    fn test_one_shot_with_group() {
        let (engine, _) = engine();
        let outcome = engine.handle(1, FlowInput::TrainInfo("1538 2024-03-15 1")).unwrap();
        assert_eq!(
            outcome,
            FlowOutcome::Lookup(LookupRequest::new("1538", at("2024-03-15T12:00:00+02:00"), 1))
        );

        let outcome = engine.handle(1, FlowInput::TrainInfo("1538 2024-03-15 x")).unwrap();
        let FlowOutcome::Lookup(request) = outcome else {
            panic!("expected lookup");
        };
        assert_eq!(request.group_index, UNDETERMINED_GROUP);
    }

    #[test]
    fn test_invalid_date_keeps_stage() {
        let (engine, store) = engine();
        engine.handle(1, FlowInput::TrainInfo("1538")).unwrap();

        let outcome = engine.handle(1, FlowInput::Text("next friday")).unwrap();
        assert_eq!(outcome, FlowOutcome::Reply(OutgoingMessage::text(messages::INVALID_DATE)));
        assert_eq!(
            stage_of(&store, 1),
            (FlowType::TrainInfo, FlowStage::AwaitingDate, "1538".to_string())
        );

        let outcome = engine.handle(1, FlowInput::TrainInfo("1538 someday")).unwrap();
        assert_eq!(outcome, FlowOutcome::Reply(OutgoingMessage::text(messages::INVALID_DATE)));
        assert_eq!(stage_of(&store, 1), (FlowType::Initial, FlowStage::None, String::new()));
    }

    #[test]
    fn test_command_mid_flow_restarts() {
        let (engine, store) = engine();
        engine.handle(1, FlowInput::TrainInfo("")).unwrap();

        let outcome = engine.handle(1, FlowInput::TrainInfo("1538")).unwrap();
        assert!(matches!(outcome, FlowOutcome::Reply(ref m) if m.text == messages::CHOOSE_DATE));
        assert_eq!(
            stage_of(&store, 1),
            (FlowType::TrainInfo, FlowStage::AwaitingDate, "1538".to_string())
        );
    }

    #[test]
    fn test_cancel_resets_from_any_state() {
        let (engine, store) = engine();
        engine.handle(1, FlowInput::TrainInfo("1538")).unwrap();

        let outcome = engine.handle(1, FlowInput::Cancel).unwrap();
        assert_eq!(
            outcome,
            FlowOutcome::Reply(OutgoingMessage::text(messages::COMMAND_CANCELLED))
        );
        assert_eq!(stage_of(&store, 1), (FlowType::Initial, FlowStage::None, String::new()));

        let outcome = engine.handle(1, FlowInput::Cancel).unwrap();
        assert!(matches!(outcome, FlowOutcome::Reply(_)));
    }

    #[test]
    fn test_free_text_when_idle_shows_help() {
        let (engine, _) = engine();
        let outcome = engine.handle(1, FlowInput::Text("hello")).unwrap();
        assert_eq!(outcome, FlowOutcome::Reply(OutgoingMessage::text(help::MAIN)));
    }

    #[test]
    fn test_unhandled_state_is_silent() {
        let (engine, store) = engine();
        let mut state = ChatFlowState::new(1);
        state.set(FlowType::StationInfo, FlowStage::AwaitingDate, "");
        store.save(&state).unwrap();

        assert_eq!(engine.handle(1, FlowInput::Text("x")).unwrap(), FlowOutcome::Silent);
    }

    #[test]
    fn test_date_callback_resets_stale_flow() {
        let (engine, store) = engine();
        engine.handle(1, FlowInput::TrainInfo("")).unwrap();

        let date = at("2024-03-16T09:00:00+02:00");
        let payload = CallbackPayload::new(CallbackAction::ChooseDate, "1538", date, None);
        let request = engine.choose_date(1, &payload).unwrap();

        assert_eq!(request, LookupRequest::new("1538", date, UNDETERMINED_GROUP));
        assert_eq!(stage_of(&store, 1), (FlowType::Initial, FlowStage::None, String::new()));
    }

    #[test]
    fn test_group_callback_leaves_flow_alone() {
        let (engine, store) = engine();
        engine.handle(1, FlowInput::TrainInfo("999")).unwrap();

        let date = at("2024-03-15T07:10:00+02:00");
        let payload = CallbackPayload::new(CallbackAction::ChooseGroup, "1538", date, Some(1));
        let request = engine.choose_group(&payload).unwrap();

        assert_eq!(request, LookupRequest::new("1538", date, 1));
        assert_eq!(
            stage_of(&store, 1),
            (FlowType::TrainInfo, FlowStage::AwaitingDate, "999".to_string())
        );
    }
}
