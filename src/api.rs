//! HTTP API for twin chat

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::db::Database;
use crate::llm::LlmService;
use crate::runtime::{DatabaseStorage, ProductionSelector, ResponseSelector};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub selector: Arc<ProductionSelector>,
}

impl AppState {
    pub fn new(db: Database, llm: Arc<dyn LlmService>, history_limit: usize) -> Self {
        let selector = ResponseSelector::new(DatabaseStorage::new(db.clone()), llm)
            .with_history_limit(history_limit);
        Self {
            db,
            selector: Arc::new(selector),
        }
    }
}
