//! Conversation state types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Phase
// ============================================================================

/// Stage of the structured conversation for one twin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Twin has introduced itself and asked whether its read is accurate
    #[default]
    Initial,
    YesResponse,
    NoResponse,
    /// Loops here until the user mentions family
    DiggingDeeper,
    ParentMention,
    /// Terminal
    Closure,
    /// Persisted value named no known phase (corrupted row)
    Unrecognized,
}

impl Phase {
    /// All phases the flow can legitimately produce
    pub const STRUCTURED: [Phase; 6] = [
        Phase::Initial,
        Phase::YesResponse,
        Phase::NoResponse,
        Phase::DiggingDeeper,
        Phase::ParentMention,
        Phase::Closure,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Initial => "INITIAL",
            Phase::YesResponse => "YES_RESPONSE",
            Phase::NoResponse => "NO_RESPONSE",
            Phase::DiggingDeeper => "DIGGING_DEEPER",
            Phase::ParentMention => "PARENT_MENTION",
            Phase::Closure => "CLOSURE",
            Phase::Unrecognized => "UNRECOGNIZED",
        }
    }

    /// Parse a stored phase name. Anything unknown becomes [`Phase::Unrecognized`].
    pub fn from_stored(s: &str) -> Self {
        Self::STRUCTURED
            .into_iter()
            .find(|p| p.as_str() == s)
            .unwrap_or(Phase::Unrecognized)
    }

    pub fn is_structured(self) -> bool {
        !matches!(self, Phase::Unrecognized)
    }

    #[cfg(test)]
    /// Position along the fixed path. The yes/no branches share a rank.
    pub fn rank(self) -> u8 {
        match self {
            Phase::Initial | Phase::Unrecognized => 0,
            Phase::YesResponse | Phase::NoResponse => 1,
            Phase::DiggingDeeper => 2,
            Phase::ParentMention => 3,
            Phase::Closure => 4,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Response type
// ============================================================================

/// Classification of the most recent user reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseType {
    Yes,
    No,
    Unknown,
    /// No reply classified yet
    #[default]
    None,
}

impl ResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::Yes => "YES",
            ResponseType::No => "NO",
            ResponseType::Unknown => "UNKNOWN",
            ResponseType::None => "NONE",
        }
    }

    pub fn from_stored(s: &str) -> Self {
        match s {
            "YES" => ResponseType::Yes,
            "NO" => ResponseType::No,
            "UNKNOWN" => ResponseType::Unknown,
            _ => ResponseType::None,
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Conversation State
// ============================================================================

/// Per-twin record of where the structured conversation stands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub twin_id: String,
    pub current_phase: Phase,
    pub last_response_type: ResponseType,
    /// Reserved; carried through unchanged by every transition
    pub insights: Vec<String>,
    /// Sticky: only a reset clears it
    pub parent_mentioned: bool,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// Fresh state used on first access and after a reset
    pub fn initial(twin_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            twin_id: twin_id.into(),
            current_phase: Phase::Initial,
            last_response_type: ResponseType::None,
            insights: Vec::new(),
            parent_mentioned: false,
            updated_at: now,
        }
    }

    /// Apply a partial update. `insights` is never touched.
    #[must_use]
    pub fn apply(mut self, update: &StateUpdate) -> Self {
        self.current_phase = update.current_phase;
        self.last_response_type = update.last_response_type;
        self.parent_mentioned = update.parent_mentioned;
        self.updated_at = update.updated_at;
        self
    }
}

/// The fields a transition writes back to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateUpdate {
    pub current_phase: Phase,
    pub last_response_type: ResponseType,
    pub parent_mentioned: bool,
    pub updated_at: DateTime<Utc>,
}
