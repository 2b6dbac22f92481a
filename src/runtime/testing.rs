//! Mock implementations for testing
//!
//! These mocks enable testing the flow and selector without real I/O.

use super::traits::*;
use crate::db::{Message, Personality, TwinProfile};
use crate::llm::{LlmError, LlmErrorKind, LlmRequest, LlmService, TextStream};
use crate::state_machine::{ConversationState, StateUpdate};
use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// Mock Storage
// ============================================================================

/// In-memory storage with switchable failures
#[allow(dead_code)]
#[derive(Default)]
pub struct MockStorage {
    states: Mutex<HashMap<String, ConversationState>>,
    profiles: Mutex<HashMap<String, TwinProfile>>,
    messages: Mutex<Vec<Message>>,
    pub fail_get: AtomicBool,
    pub fail_create: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_profile: AtomicBool,
    pub fail_messages: AtomicBool,
    /// Number of successful `update` calls
    pub updates: AtomicUsize,
}

#[allow(dead_code)]
impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(self, profile: TwinProfile) -> Self {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.id.clone(), profile);
        self
    }

    pub fn with_state(self, state: ConversationState) -> Self {
        self.states
            .lock()
            .unwrap()
            .insert(state.twin_id.clone(), state);
        self
    }

    pub fn state(&self, twin_id: &str) -> Option<ConversationState> {
        self.states.lock().unwrap().get(twin_id).cloned()
    }

    pub fn messages(&self, twin_id: &str) -> Vec<Message> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.twin_id == twin_id)
            .cloned()
            .collect()
    }

    pub fn fail(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Backend(format!("injected {what} failure")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StateStore for MockStorage {
    async fn get(&self, twin_id: &str) -> Result<Option<ConversationState>, StoreError> {
        Self::check(&self.fail_get, "get")?;
        Ok(self.state(twin_id))
    }

    async fn create(&self, state: &ConversationState) -> Result<(), StoreError> {
        Self::check(&self.fail_create, "create")?;
        let mut states = self.states.lock().unwrap();
        if states.contains_key(&state.twin_id) {
            return Err(StoreError::Backend(format!("duplicate state for {}", state.twin_id)));
        }
        states.insert(state.twin_id.clone(), state.clone());
        Ok(())
    }

    async fn update(&self, twin_id: &str, update: &StateUpdate) -> Result<(), StoreError> {
        Self::check(&self.fail_update, "update")?;
        let mut states = self.states.lock().unwrap();
        let current = states
            .remove(twin_id)
            .ok_or_else(|| StoreError::NotFound(twin_id.to_string()))?;
        states.insert(twin_id.to_string(), current.apply(update));
        self.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, twin_id: &str) -> Result<(), StoreError> {
        Self::check(&self.fail_delete, "delete")?;
        self.states.lock().unwrap().remove(twin_id);
        Ok(())
    }
}

#[async_trait]
impl ProfileReader for MockStorage {
    async fn get_profile(&self, twin_id: &str) -> Result<TwinProfile, StoreError> {
        Self::check(&self.fail_profile, "profile")?;
        self.profiles
            .lock()
            .unwrap()
            .get(twin_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(twin_id.to_string()))
    }
}

#[async_trait]
impl MessageStore for MockStorage {
    async fn add_message(
        &self,
        twin_id: &str,
        content: &str,
        is_user: bool,
    ) -> Result<Message, StoreError> {
        Self::check(&self.fail_messages, "add_message")?;
        let mut messages = self.messages.lock().unwrap();
        Ok(push_message(&mut messages, twin_id, content, is_user))
    }

    async fn add_exchange(
        &self,
        twin_id: &str,
        user_message: &str,
        reply: &str,
    ) -> Result<(Message, Message), StoreError> {
        Self::check(&self.fail_messages, "add_exchange")?;
        let mut messages = self.messages.lock().unwrap();
        let user = push_message(&mut messages, twin_id, user_message, true);
        let reply = push_message(&mut messages, twin_id, reply, false);
        Ok((user, reply))
    }

    async fn recent_messages(&self, twin_id: &str, limit: usize) -> Result<Vec<Message>, StoreError> {
        let all = self.messages(twin_id);
        let skip = all.len().saturating_sub(limit);
        Ok(all.into_iter().skip(skip).collect())
    }

    async fn clear_messages(&self, twin_id: &str) -> Result<usize, StoreError> {
        let mut messages = self.messages.lock().unwrap();
        let before = messages.len();
        messages.retain(|m| m.twin_id != twin_id);
        Ok(before - messages.len())
    }
}

fn push_message(messages: &mut Vec<Message>, twin_id: &str, content: &str, is_user: bool) -> Message {
    let sequence_id = i64::try_from(messages.iter().filter(|m| m.twin_id == twin_id).count())
        .unwrap()
        + 1;
    let message = Message {
        id: uuid::Uuid::new_v4().to_string(),
        twin_id: twin_id.to_string(),
        sequence_id,
        content: content.to_string(),
        is_user,
        created_at: Utc::now(),
    };
    messages.push(message.clone());
    message
}

/// A twin with one emotional pattern and one hidden trait
#[allow(dead_code)]
pub fn test_profile(twin_id: &str) -> TwinProfile {
    TwinProfile {
        id: twin_id.to_string(),
        name: "Ada".to_string(),
        bio: "Engineer who spends weekends at jazz clubs.".to_string(),
        personality: Personality {
            summary: "You're curious, a little guarded, and funnier than you let on.".to_string(),
            traits: vec!["analytical".to_string()],
            interests: vec!["jazz".to_string()],
            style: "dry".to_string(),
            emotional_patterns: vec!["guarded".to_string(), "restless".to_string()],
            hidden_traits: vec!["avoids conflict".to_string()],
        },
        music_summary: Some("Late-night jazz".to_string()),
        film_summary: None,
        created_at: Utc::now(),
    }
}

// ============================================================================
// Mock LLM
// ============================================================================

#[derive(Debug, Clone)]
enum Script {
    Deltas(Vec<String>),
    StreamError(Vec<String>, LlmErrorKind, String),
    OpenError(LlmErrorKind, String),
}

/// Mock LLM that replays the same scripted stream on every call
#[allow(dead_code)]
pub struct MockLlm {
    script: Script,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

#[allow(dead_code)]
impl MockLlm {
    fn new(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_deltas(deltas: &[&str]) -> Self {
        Self::new(Script::Deltas(deltas.iter().map(ToString::to_string).collect()))
    }

    /// Yields `deltas`, then fails mid-stream
    pub fn with_stream_error(deltas: &[&str], error: LlmError) -> Self {
        Self::new(Script::StreamError(
            deltas.iter().map(ToString::to_string).collect(),
            error.kind,
            error.message,
        ))
    }

    /// Fails before any text is produced
    pub fn failing(error: LlmError) -> Self {
        Self::new(Script::OpenError(error.kind, error.message))
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlm {
    async fn stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError> {
        self.requests.lock().unwrap().push(request.clone());

        let items: Vec<Result<String, LlmError>> = match &self.script {
            Script::Deltas(deltas) => deltas.iter().cloned().map(Ok).collect(),
            Script::StreamError(deltas, kind, message) => deltas
                .iter()
                .cloned()
                .map(Ok)
                .chain(std::iter::once(Err(LlmError::new(*kind, message.clone()))))
                .collect(),
            Script::OpenError(kind, message) => return Err(LlmError::new(*kind, message.clone())),
        };
        Ok(futures::stream::iter(items).boxed())
    }

    fn model_id(&self) -> &'static str {
        "mock-model"
    }
}
