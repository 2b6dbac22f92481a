//! API request and response types

use crate::db::{Message, Personality, TwinProfile};
use crate::state_machine::ConversationState;
use serde::{Deserialize, Serialize};

/// Request to create a new twin
#[derive(Debug, Deserialize)]
pub struct CreateTwinRequest {
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub personality: Personality,
    pub music_summary: Option<String>,
    pub film_summary: Option<String>,
}

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Response with a single twin
#[derive(Debug, Serialize)]
pub struct TwinResponse {
    pub twin: TwinProfile,
}

/// Response with a twin's messages
#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

/// Response with the current conversation state
#[derive(Debug, Serialize)]
pub struct ConversationStateResponse {
    pub state: ConversationState,
}

/// Response for a chat turn
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: Message,
    /// `None` when the structured flow was unavailable for this turn
    pub state: Option<ConversationState>,
}

/// Response for the opening message
#[derive(Debug, Serialize)]
pub struct FirstMessageResponse {
    pub message: Message,
}

/// Response for clearing a chat
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub state: ConversationState,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
