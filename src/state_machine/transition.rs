//! Pure state transition function
//!
//! Given the current state and the signals extracted from a user message,
//! compute the fields to write back. No I/O happens here.

use super::{ConversationState, Phase, ResponseType, StateUpdate};
use crate::classifier::{detect_parent_mention, detect_response};
use chrono::{DateTime, Utc};

/// What the classifier extracted from one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signals {
    pub response_type: ResponseType,
    pub parent_mentioned: bool,
}

impl Signals {
    pub fn from_message(message: &str) -> Self {
        Self {
            response_type: detect_response(message),
            parent_mentioned: detect_parent_mention(message),
        }
    }
}

/// Fixed transition table.
///
/// `parent_mentioned` is the already-merged sticky flag, not just this
/// message's signal.
pub fn next_phase(current: Phase, response_type: ResponseType, parent_mentioned: bool) -> Phase {
    match current {
        // UNKNOWN is folded into the NO branch
        Phase::Initial if response_type == ResponseType::Yes => Phase::YesResponse,
        Phase::Initial => Phase::NoResponse,

        Phase::YesResponse | Phase::NoResponse => Phase::DiggingDeeper,

        Phase::DiggingDeeper if parent_mentioned => Phase::ParentMention,
        Phase::DiggingDeeper => Phase::DiggingDeeper,

        Phase::ParentMention | Phase::Closure => Phase::Closure,

        Phase::Unrecognized => Phase::Initial,
    }
}

/// Compute the update for one inbound message
pub fn transition(state: &ConversationState, signals: Signals, now: DateTime<Utc>) -> StateUpdate {
    let parent_mentioned = signals.parent_mentioned || state.parent_mentioned;

    StateUpdate {
        current_phase: next_phase(state.current_phase, signals.response_type, parent_mentioned),
        last_response_type: signals.response_type,
        parent_mentioned,
        updated_at: now,
    }
}
