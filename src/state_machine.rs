//! Structured conversation state machine
//!
//! Pure phase transitions; persistence lives in the runtime.

pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use state::{ConversationState, Phase, ResponseType, StateUpdate};
#[allow(unused_imports)] // Public API re-exports
pub use transition::{next_phase, transition, Signals};
