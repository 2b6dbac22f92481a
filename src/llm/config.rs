//! LLM provider configuration

/// Model used when `DEFAULT_MODEL` is unset
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for the completion provider
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub openai_api_key: Option<String>,
    /// Base URL of an OpenAI-compatible gateway
    pub gateway: Option<String>,
    pub default_model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty()),
            gateway: std::env::var("LLM_GATEWAY").ok().filter(|g| !g.is_empty()),
            default_model: std::env::var("DEFAULT_MODEL").ok().filter(|m| !m.is_empty()),
        }
    }

    pub fn model(&self) -> &str {
        self.default_model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    /// Whether a provider can be constructed at all. A gateway handles auth itself.
    pub fn is_configured(&self) -> bool {
        self.openai_api_key.is_some() || self.gateway.is_some()
    }
}
