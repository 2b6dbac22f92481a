//! Structured conversation flow over a state store
//!
//! Wraps the pure transition function with the fetch/persist steps.

use super::traits::{ProfileReader, StateStore, StoreError};
use crate::state_machine::{transition, ConversationState, Signals};
use crate::templates::{generate_from_template, TemplateError, INITIAL};
use chrono::Utc;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Failed to fetch conversation state: {0}")]
    StateFetch(StoreError),
    #[error("Failed to persist conversation state: {0}")]
    StateWrite(StoreError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Drives the phase machine for one twin at a time.
///
/// Callers serialize turns per twin; concurrent turns are last-write-wins.
pub struct ConversationFlow<S> {
    store: S,
}

impl<S: StateStore> ConversationFlow<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch the state, creating it in `INITIAL` form if the twin has none
    pub async fn get_conversation_state(
        &self,
        twin_id: &str,
    ) -> Result<ConversationState, FlowError> {
        if let Some(state) = self.store.get(twin_id).await.map_err(FlowError::StateFetch)? {
            return Ok(state);
        }

        let state = ConversationState::initial(twin_id, Utc::now());
        self.store.create(&state).await.map_err(|e| {
            tracing::error!(twin_id = %twin_id, error = %e, "Failed to create initial conversation state");
            FlowError::StateWrite(e)
        })?;
        tracing::debug!(twin_id = %twin_id, "Created initial conversation state");
        Ok(state)
    }

    /// Advance the state for one inbound message and persist it.
    ///
    /// `current` skips the fetch when the caller already holds the state.
    pub async fn update_conversation_state(
        &self,
        twin_id: &str,
        user_message: &str,
        current: Option<ConversationState>,
    ) -> Result<ConversationState, FlowError> {
        let current = match current {
            Some(state) => state,
            None => self.get_conversation_state(twin_id).await?,
        };

        let signals = Signals::from_message(user_message);
        let update = transition(&current, signals, Utc::now());

        if let Err(e) = self.store.update(twin_id, &update).await {
            tracing::error!(twin_id = %twin_id, error = %e, "Failed to persist conversation state");
            return Err(FlowError::StateWrite(e));
        }

        tracing::info!(
            twin_id = %twin_id,
            from = %current.current_phase,
            to = %update.current_phase,
            response_type = %update.last_response_type,
            parent_mentioned = update.parent_mentioned,
            "Conversation phase advanced"
        );

        Ok(current.apply(&update))
    }

    /// Delete any state and recreate it as `INITIAL`
    pub async fn reset_conversation_state(
        &self,
        twin_id: &str,
    ) -> Result<ConversationState, FlowError> {
        self.store.delete(twin_id).await.map_err(|e| {
            tracing::error!(twin_id = %twin_id, error = %e, "Failed to delete conversation state");
            FlowError::StateWrite(e)
        })?;

        let state = ConversationState::initial(twin_id, Utc::now());
        self.store.create(&state).await.map_err(|e| {
            tracing::error!(twin_id = %twin_id, error = %e, "Failed to recreate conversation state");
            FlowError::StateWrite(e)
        })?;

        tracing::info!(twin_id = %twin_id, "Conversation state reset");
        Ok(state)
    }

    /// Reset the conversation and render the opening message
    pub async fn generate_first_message<P: ProfileReader + ?Sized>(
        &self,
        profiles: &P,
        twin_id: &str,
    ) -> Result<String, FlowError> {
        self.reset_conversation_state(twin_id).await?;

        let mut variables = HashMap::new();
        match profiles.get_profile(twin_id).await {
            Ok(profile) => {
                variables.insert("name".to_string(), profile.name);
                variables.insert("personalitySummary".to_string(), profile.personality.summary);
            }
            Err(e) => {
                tracing::warn!(twin_id = %twin_id, error = %e, "Profile unavailable for first message");
            }
        }

        Ok(generate_from_template(INITIAL, &variables)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{test_profile, MockStorage};
    use crate::state_machine::{Phase, ResponseType};
    use std::sync::atomic::Ordering;

    fn flow() -> ConversationFlow<MockStorage> {
        ConversationFlow::new(MockStorage::new())
    }

    #[tokio::test]
    async fn test_get_lazily_creates_initial_state() {
        let flow = flow();
        let state = flow.get_conversation_state("t1").await.unwrap();

        assert_eq!(state.current_phase, Phase::Initial);
        assert_eq!(state.last_response_type, ResponseType::None);
        assert!(state.insights.is_empty());
        assert!(!state.parent_mentioned);
        assert_eq!(flow.store().state("t1"), Some(state));
    }

    #[tokio::test]
    async fn test_get_failure_is_state_fetch() {
        let flow = flow();
        MockStorage::fail(&flow.store().fail_get);

        let err = flow.get_conversation_state("t1").await.unwrap_err();
        assert!(matches!(err, FlowError::StateFetch(_)));
    }

    #[tokio::test]
    async fn test_yes_at_initial_persists_yes_response() {
        let flow = flow();
        let state = flow
            .update_conversation_state("t1", "Yeah, that's totally me", None)
            .await
            .unwrap();

        assert_eq!(state.current_phase, Phase::YesResponse);
        assert_eq!(state.last_response_type, ResponseType::Yes);

        let stored = flow.store().state("t1").unwrap();
        assert_eq!(stored.current_phase, Phase::YesResponse);
        assert_eq!(stored.last_response_type, ResponseType::Yes);
    }

    #[tokio::test]
    async fn test_full_walk_to_closure() {
        let flow = flow();
        let messages = [
            ("hmm, maybe", Phase::NoResponse),
            ("tell me more", Phase::DiggingDeeper),
            ("I guess so", Phase::DiggingDeeper),
            ("my mom always said that", Phase::ParentMention),
            ("ok", Phase::Closure),
            ("bye", Phase::Closure),
        ];

        for (message, expected) in messages {
            let state = flow.update_conversation_state("t1", message, None).await.unwrap();
            assert_eq!(state.current_phase, expected, "after {message:?}");
        }
        assert_eq!(flow.store().updates.load(Ordering::SeqCst), messages.len());
    }

    #[tokio::test]
    async fn test_parent_mention_is_sticky() {
        let flow = flow();
        flow.update_conversation_state("t1", "my dad agrees", None).await.unwrap();
        let state = flow.update_conversation_state("t1", "whatever", None).await.unwrap();

        assert!(state.parent_mentioned);
        // Sticky flag carried into DIGGING_DEEPER jumps straight to PARENT_MENTION
        let state = flow.update_conversation_state("t1", "sure", None).await.unwrap();
        assert_eq!(state.current_phase, Phase::ParentMention);
    }

    #[tokio::test]
    async fn test_supplied_state_skips_fetch() {
        let flow = flow();
        let current = flow.get_conversation_state("t1").await.unwrap();
        MockStorage::fail(&flow.store().fail_get);

        let state = flow
            .update_conversation_state("t1", "no", Some(current))
            .await
            .unwrap();
        assert_eq!(state.current_phase, Phase::NoResponse);
    }

    #[tokio::test]
    async fn test_update_failure_is_state_write() {
        let flow = flow();
        flow.get_conversation_state("t1").await.unwrap();
        MockStorage::fail(&flow.store().fail_update);

        let err = flow.update_conversation_state("t1", "yes", None).await.unwrap_err();
        assert!(matches!(err, FlowError::StateWrite(_)));
        assert_eq!(flow.store().updates.load(Ordering::SeqCst), 0);
        assert_eq!(flow.store().state("t1").unwrap().current_phase, Phase::Initial);
    }

    #[tokio::test]
    async fn test_unrecognized_phase_resets_to_initial() {
        let mut corrupted = ConversationState::initial("t1", Utc::now());
        corrupted.current_phase = Phase::Unrecognized;
        let flow = ConversationFlow::new(MockStorage::new().with_state(corrupted));

        let state = flow.update_conversation_state("t1", "yes", None).await.unwrap();
        assert_eq!(state.current_phase, Phase::Initial);
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let flow = flow();
        flow.update_conversation_state("t1", "my mother", None).await.unwrap();

        let first = flow.reset_conversation_state("t1").await.unwrap();
        let second = flow.reset_conversation_state("t1").await.unwrap();

        for state in [&first, &second] {
            assert_eq!(state.current_phase, Phase::Initial);
            assert_eq!(state.last_response_type, ResponseType::None);
            assert!(state.insights.is_empty());
            assert!(!state.parent_mentioned);
        }
        let stored = flow.store().state("t1").unwrap();
        assert_eq!(stored.current_phase, Phase::Initial);
        assert!(!stored.parent_mentioned);
    }

    #[tokio::test]
    async fn test_reset_failure_is_state_write() {
        let flow = flow();
        MockStorage::fail(&flow.store().fail_delete);
        assert!(matches!(
            flow.reset_conversation_state("t1").await,
            Err(FlowError::StateWrite(_))
        ));

        let flow = self::flow();
        MockStorage::fail(&flow.store().fail_create);
        assert!(matches!(
            flow.reset_conversation_state("t1").await,
            Err(FlowError::StateWrite(_))
        ));
    }

    #[tokio::test]
    async fn test_first_message_renders_profile() {
        let flow = ConversationFlow::new(MockStorage::new().with_profile(test_profile("t1")));
        flow.update_conversation_state("t1", "yes", None).await.unwrap();

        let message = flow.generate_first_message(flow.store(), "t1").await.unwrap();
        assert!(message.contains("Ada"));
        assert!(message.contains("funnier than you let on"));
        assert_eq!(flow.store().state("t1").unwrap().current_phase, Phase::Initial);
    }

    #[tokio::test]
    async fn test_first_message_without_profile_shows_markers() {
        let flow = flow();
        let message = flow.generate_first_message(flow.store(), "t1").await.unwrap();
        assert!(message.contains("[missing name]"));
    }
}
