//! Twin chat - structured conversations with a digital twin
//!
//! A Rust backend that walks each twin through a fixed conversation
//! flow of canned replies, falling back to free-form LLM replies.

mod api;
mod classifier;
mod db;
mod llm;
mod persona;
mod runtime;
mod state_machine;
mod templates;

use api::{create_router, AppState};
use db::Database;
use llm::{LlmConfig, LlmService, LoggingService, OpenAIService, Unconfigured};
use runtime::DEFAULT_HISTORY_LIMIT;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "twin_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let db_path = std::env::var("TWIN_DB_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        format!("{home}/.twin-chat/twin.db")
    });

    let port: u16 = std::env::var("TWIN_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let history_limit: usize = std::env::var("TWIN_HISTORY_LIMIT")
        .ok()
        .and_then(|n| n.parse().ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT);

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %db_path, "Opening database");
    let db = Database::open(&db_path)?;

    // Initialize LLM
    let llm_config = LlmConfig::from_env();
    let provider: Arc<dyn LlmService> = match OpenAIService::from_config(&llm_config) {
        Some(service) => {
            let service = service?;
            tracing::info!(
                model = %service.model_id(),
                gateway = ?llm_config.gateway,
                "LLM provider initialized"
            );
            Arc::new(service)
        }
        None => {
            tracing::warn!("No LLM API key configured. Set OPENAI_API_KEY or LLM_GATEWAY.");
            Arc::new(Unconfigured)
        }
    };
    let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(provider));

    // Create application state
    let state = AppState::new(db, llm, history_limit);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state).layer(cors).layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(history_limit, "Twin chat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
