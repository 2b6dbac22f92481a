//! Runtime for structured conversations
//!
//! Connects the pure state machine to storage and the LLM.

mod flow;
mod selector;
pub mod traits;

#[cfg(test)]
pub mod testing;

#[allow(unused_imports)] // Public API re-exports
pub use flow::{ConversationFlow, FlowError};
#[allow(unused_imports)] // Public API re-exports
pub use selector::{
    Reply, ReplySource, ResponseSelector, Turn, DEFAULT_HISTORY_LIMIT, FALLBACK_REPLY,
};
pub use traits::*;

use crate::llm::LlmService;
use std::sync::Arc;

/// Type alias for the production selector with concrete implementations
pub type ProductionSelector = ResponseSelector<DatabaseStorage, Arc<dyn LlmService>>;
