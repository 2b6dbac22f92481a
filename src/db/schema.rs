//! Database schema and types

pub use crate::state_machine::{ConversationState, Phase, ResponseType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS twins (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    bio TEXT NOT NULL,
    personality TEXT NOT NULL DEFAULT '{}',
    music_summary TEXT,
    film_summary TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    twin_id TEXT NOT NULL,
    sequence_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    is_user BOOLEAN NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (twin_id) REFERENCES twins(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_twin ON messages(twin_id, sequence_id);

CREATE TABLE IF NOT EXISTS conversation_states (
    twin_id TEXT PRIMARY KEY,
    current_phase TEXT NOT NULL DEFAULT 'INITIAL',
    last_response_type TEXT NOT NULL DEFAULT 'NONE',
    insights TEXT NOT NULL DEFAULT '[]',
    parent_mentioned BOOLEAN NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL,

    FOREIGN KEY (twin_id) REFERENCES twins(id) ON DELETE CASCADE
);
";

/// Personality read derived from the user's bio and media taste
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Personality {
    pub summary: String,
    pub traits: Vec<String>,
    pub interests: Vec<String>,
    pub style: String,
    pub emotional_patterns: Vec<String>,
    pub hidden_traits: Vec<String>,
}

/// Twin record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwinProfile {
    pub id: String,
    pub name: String,
    pub bio: String,
    pub personality: Personality,
    pub music_summary: Option<String>,
    pub film_summary: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Chat message record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub twin_id: String,
    pub sequence_id: i64,
    pub content: String,
    pub is_user: bool,
    pub created_at: DateTime<Utc>,
}
