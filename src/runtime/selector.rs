//! Reply selection: structured template flow with an LLM default flow
//!
//! Nothing here fails past the selector boundary. Store failures fall back
//! to the default flow, and LLM failures fall back to a fixed reply.

use super::flow::{ConversationFlow, FlowError};
use super::traits::{Storage, StoreError};
use crate::db::{Message, TwinProfile};
use crate::llm::{collect_text, LlmService};
use crate::persona;
use crate::state_machine::{ConversationState, Phase};
use crate::templates::{self, generate_from_template};
use std::collections::HashMap;

/// Reply used whenever the default flow cannot produce text
pub const FALLBACK_REPLY: &str = "I'm not sure how to respond to that right now.";

/// `DIG_DEEPER` values used when the profile has none
pub const FALLBACK_EMOTIONAL_PATTERN: &str = "keeping people at arm's length";
pub const FALLBACK_HIDDEN_TRAIT: &str = "a softer side you rarely show";

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Which path produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    Template(Phase),
    Llm,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
    /// State after this turn; `None` when the store was unavailable
    pub state: Option<ConversationState>,
}

/// One persisted chat turn
#[derive(Debug, Clone)]
pub struct Turn {
    pub user_message: Message,
    pub reply_message: Message,
    pub source: ReplySource,
    pub state: Option<ConversationState>,
}

pub struct ResponseSelector<S, L> {
    storage: S,
    flow: ConversationFlow<S>,
    llm: L,
    history_limit: usize,
}

impl<S, L> ResponseSelector<S, L>
where
    S: Storage + Clone,
    L: LlmService,
{
    pub fn new(storage: S, llm: L) -> Self {
        Self {
            flow: ConversationFlow::new(storage.clone()),
            storage,
            llm,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    pub fn flow(&self) -> &ConversationFlow<S> {
        &self.flow
    }

    /// Produce the reply text for one inbound message. Never empty.
    pub async fn respond(&self, twin_id: &str, user_message: &str) -> String {
        self.select(twin_id, user_message).await.text
    }

    /// Produce a reply along with how it was produced
    pub async fn select(&self, twin_id: &str, user_message: &str) -> Reply {
        let state = match self.advance(twin_id, user_message).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(twin_id = %twin_id, error = %e, "Structured flow unavailable, falling back to default flow");
                return self.default_flow(twin_id, user_message, None).await;
            }
        };

        let phase = state.current_phase;
        let (template_type, variables) = match phase {
            Phase::YesResponse => (templates::YES_RESPONSE, HashMap::new()),
            Phase::NoResponse => (templates::NO_RESPONSE, HashMap::new()),
            Phase::DiggingDeeper => (templates::DIG_DEEPER, self.dig_deeper_variables(twin_id).await),
            Phase::ParentMention => (templates::PARENT_MENTION, HashMap::new()),
            Phase::Closure => (templates::CLOSURE, HashMap::new()),
            Phase::Initial | Phase::Unrecognized => {
                tracing::debug!(twin_id = %twin_id, phase = %phase, "No template for phase");
                return self.default_flow(twin_id, user_message, Some(state)).await;
            }
        };

        match generate_from_template(template_type, &variables) {
            Ok(text) => Reply {
                text,
                source: ReplySource::Template(phase),
                state: Some(state),
            },
            Err(e) => {
                tracing::error!(twin_id = %twin_id, phase = %phase, error = %e, "Template lookup failed");
                self.default_flow(twin_id, user_message, Some(state)).await
            }
        }
    }

    /// Fetch (or lazily create) the state, then advance it
    async fn advance(
        &self,
        twin_id: &str,
        user_message: &str,
    ) -> Result<ConversationState, FlowError> {
        let current = self.flow.get_conversation_state(twin_id).await?;
        self.flow
            .update_conversation_state(twin_id, user_message, Some(current))
            .await
    }

    async fn dig_deeper_variables(&self, twin_id: &str) -> HashMap<String, String> {
        let (pattern, hidden) = match self.storage.get_profile(twin_id).await {
            Ok(profile) => {
                let personality = profile.personality;
                (
                    personality.emotional_patterns.into_iter().next(),
                    personality.hidden_traits.into_iter().next(),
                )
            }
            Err(e) => {
                tracing::warn!(twin_id = %twin_id, error = %e, "Profile unavailable, using fallback traits");
                (None, None)
            }
        };

        HashMap::from([
            (
                "emotionalPattern".to_string(),
                pattern.unwrap_or_else(|| FALLBACK_EMOTIONAL_PATTERN.to_string()),
            ),
            (
                "hiddenTrait".to_string(),
                hidden.unwrap_or_else(|| FALLBACK_HIDDEN_TRAIT.to_string()),
            ),
        ])
    }

    /// Free-form reply from the LLM, or the fixed fallback
    async fn default_flow(
        &self,
        twin_id: &str,
        user_message: &str,
        state: Option<ConversationState>,
    ) -> Reply {
        let fallback = |state| Reply {
            text: FALLBACK_REPLY.to_string(),
            source: ReplySource::Fallback,
            state,
        };

        let profile = match self.storage.get_profile(twin_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(twin_id = %twin_id, error = %e, "Profile unavailable for default flow");
                return fallback(state);
            }
        };

        let history = self.history(twin_id).await;
        match self.complete(&profile, &history, user_message).await {
            Some(text) => Reply {
                text,
                source: ReplySource::Llm,
                state,
            },
            None => fallback(state),
        }
    }

    async fn history(&self, twin_id: &str) -> Vec<Message> {
        self.storage
            .recent_messages(twin_id, self.history_limit)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(twin_id = %twin_id, error = %e, "History unavailable, sending message alone");
                Vec::new()
            })
    }

    async fn complete(
        &self,
        profile: &TwinProfile,
        history: &[Message],
        user_message: &str,
    ) -> Option<String> {
        let request = persona::build_request(profile, history, user_message);
        match collect_text(&self.llm, &request).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(
                    twin_id = %profile.id,
                    model = %self.llm.model_id(),
                    kind = ?e.kind,
                    error = %e,
                    "Completion failed, using fallback reply"
                );
                None
            }
        }
    }

    /// Run a full chat turn: select a reply, then persist both messages.
    ///
    /// The reply is selected before the user message is stored so history
    /// excludes it. The two messages are stored as one unit, but the phase
    /// has already advanced by then: a failed write leaves the state one
    /// step ahead of the stored chat.
    pub async fn handle_turn(&self, twin_id: &str, user_message: &str) -> Result<Turn, StoreError> {
        let reply = self.select(twin_id, user_message).await;

        let (user_message, reply_message) = self
            .storage
            .add_exchange(twin_id, user_message, &reply.text)
            .await?;

        Ok(Turn {
            user_message,
            reply_message,
            source: reply.source,
            state: reply.state,
        })
    }

    /// Delete every message and reset the conversation
    pub async fn clear_chat(&self, twin_id: &str) -> Result<ConversationState, FlowError> {
        let deleted = self
            .storage
            .clear_messages(twin_id)
            .await
            .map_err(FlowError::StateWrite)?;
        tracing::info!(twin_id = %twin_id, deleted, "Chat cleared");
        self.flow.reset_conversation_state(twin_id).await
    }

    /// Reset the conversation and store the opening message from the twin
    pub async fn first_message(&self, twin_id: &str) -> Result<Message, FlowError> {
        let text = self.flow.generate_first_message(&self.storage, twin_id).await?;
        self.storage
            .add_message(twin_id, &text, false)
            .await
            .map_err(FlowError::StateWrite)
    }
}
