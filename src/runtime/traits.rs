//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the flow and selector with mock implementations.

use crate::db::{Database, DbError, Message, TwinProfile};
use crate::state_machine::{ConversationState, StateUpdate};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by any storage collaborator
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::TwinNotFound(id) => StoreError::NotFound(format!("twin {id}")),
            DbError::StateNotFound(id) => StoreError::NotFound(format!("conversation state for {id}")),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Durable per-twin conversation state. Last write wins.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch the state; `Ok(None)` when the twin has none yet
    async fn get(&self, twin_id: &str) -> Result<Option<ConversationState>, StoreError>;

    async fn create(&self, state: &ConversationState) -> Result<(), StoreError>;

    /// Write the transition fields; `insights` is untouched
    async fn update(&self, twin_id: &str, update: &StateUpdate) -> Result<(), StoreError>;

    /// Remove the state. Removing a missing state succeeds.
    async fn delete(&self, twin_id: &str) -> Result<(), StoreError>;
}

/// Read access to twin personality data
#[async_trait]
pub trait ProfileReader: Send + Sync {
    async fn get_profile(&self, twin_id: &str) -> Result<TwinProfile, StoreError>;
}

/// Storage for chat messages
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn add_message(
        &self,
        twin_id: &str,
        content: &str,
        is_user: bool,
    ) -> Result<Message, StoreError>;

    /// Store a user message and the twin's reply as one unit
    async fn add_exchange(
        &self,
        twin_id: &str,
        user_message: &str,
        reply: &str,
    ) -> Result<(Message, Message), StoreError>;

    /// The last `limit` messages, oldest first
    async fn recent_messages(&self, twin_id: &str, limit: usize) -> Result<Vec<Message>, StoreError>;

    async fn clear_messages(&self, twin_id: &str) -> Result<usize, StoreError>;
}

/// Combined storage trait for convenience
pub trait Storage: StateStore + ProfileReader + MessageStore {}
impl<T: StateStore + ProfileReader + MessageStore> Storage for T {}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: StateStore + ?Sized> StateStore for Arc<T> {
    async fn get(&self, twin_id: &str) -> Result<Option<ConversationState>, StoreError> {
        (**self).get(twin_id).await
    }

    async fn create(&self, state: &ConversationState) -> Result<(), StoreError> {
        (**self).create(state).await
    }

    async fn update(&self, twin_id: &str, update: &StateUpdate) -> Result<(), StoreError> {
        (**self).update(twin_id, update).await
    }

    async fn delete(&self, twin_id: &str) -> Result<(), StoreError> {
        (**self).delete(twin_id).await
    }
}

#[async_trait]
impl<T: ProfileReader + ?Sized> ProfileReader for Arc<T> {
    async fn get_profile(&self, twin_id: &str) -> Result<TwinProfile, StoreError> {
        (**self).get_profile(twin_id).await
    }
}

#[async_trait]
impl<T: MessageStore + ?Sized> MessageStore for Arc<T> {
    async fn add_message(
        &self,
        twin_id: &str,
        content: &str,
        is_user: bool,
    ) -> Result<Message, StoreError> {
        (**self).add_message(twin_id, content, is_user).await
    }

    async fn add_exchange(
        &self,
        twin_id: &str,
        user_message: &str,
        reply: &str,
    ) -> Result<(Message, Message), StoreError> {
        (**self).add_exchange(twin_id, user_message, reply).await
    }

    async fn recent_messages(&self, twin_id: &str, limit: usize) -> Result<Vec<Message>, StoreError> {
        (**self).recent_messages(twin_id, limit).await
    }

    async fn clear_messages(&self, twin_id: &str) -> Result<usize, StoreError> {
        (**self).clear_messages(twin_id).await
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

/// Adapter to use Database as Storage
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StateStore for DatabaseStorage {
    async fn get(&self, twin_id: &str) -> Result<Option<ConversationState>, StoreError> {
        Ok(self.db.get_conversation_state(twin_id)?)
    }

    async fn create(&self, state: &ConversationState) -> Result<(), StoreError> {
        Ok(self.db.insert_conversation_state(state)?)
    }

    async fn update(&self, twin_id: &str, update: &StateUpdate) -> Result<(), StoreError> {
        Ok(self.db.update_conversation_state(twin_id, update)?)
    }

    async fn delete(&self, twin_id: &str) -> Result<(), StoreError> {
        self.db.delete_conversation_state(twin_id)?;
        Ok(())
    }
}

#[async_trait]
impl ProfileReader for DatabaseStorage {
    async fn get_profile(&self, twin_id: &str) -> Result<TwinProfile, StoreError> {
        Ok(self.db.get_twin(twin_id)?)
    }
}

#[async_trait]
impl MessageStore for DatabaseStorage {
    async fn add_message(
        &self,
        twin_id: &str,
        content: &str,
        is_user: bool,
    ) -> Result<Message, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        Ok(self.db.add_message(&id, twin_id, content, is_user)?)
    }

    async fn add_exchange(
        &self,
        twin_id: &str,
        user_message: &str,
        reply: &str,
    ) -> Result<(Message, Message), StoreError> {
        let user_id = uuid::Uuid::new_v4().to_string();
        let reply_id = uuid::Uuid::new_v4().to_string();
        Ok(self
            .db
            .add_exchange(twin_id, (&user_id, user_message), (&reply_id, reply))?)
    }

    async fn recent_messages(&self, twin_id: &str, limit: usize) -> Result<Vec<Message>, StoreError> {
        Ok(self.db.get_recent_messages(twin_id, limit)?)
    }

    async fn clear_messages(&self, twin_id: &str) -> Result<usize, StoreError> {
        Ok(self.db.delete_messages(twin_id)?)
    }
}
