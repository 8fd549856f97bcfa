//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use crate::config::LlmConfig;
use crate::error::{GeoQueryError, Result};
use crate::llm::gemini::DEFAULT_GEMINI_MODEL;
use crate::llm::openai::DEFAULT_OPENAI_MODEL;
use crate::llm::{
    GeminiClient, GeminiConfig, LlmClient, LlmProvider, MockLlmClient, OpenAiClient, OpenAiConfig,
};

/// Creates an LLM client for the given provider.
///
/// The API key is read from `GEMINI_API_KEY` or `OPENAI_API_KEY`. The model
/// is resolved in order:
/// 1. `model` in the `[llm]` config section
/// 2. Environment variable (`GEMINI_MODEL` or `OPENAI_MODEL`)
/// 3. The provider default
pub fn create_client(provider: LlmProvider, config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    create_client_with(provider, config, |key| std::env::var(key).ok())
}

/// Creates an LLM client, resolving keys and models through `lookup`.
pub fn create_client_with(
    provider: LlmProvider,
    config: &LlmConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Box<dyn LlmClient>> {
    let model = |env_var: &str, default: &str| {
        config
            .model
            .clone()
            .or_else(|| lookup(env_var))
            .unwrap_or_else(|| default.to_string())
    };

    match provider {
        LlmProvider::Gemini => {
            let key = require_key(&lookup, "GEMINI_API_KEY")?;
            let config = GeminiConfig::new(key, model("GEMINI_MODEL", DEFAULT_GEMINI_MODEL))
                .with_timeout(config.timeout_secs);
            Ok(Box::new(GeminiClient::new(config)?))
        }
        LlmProvider::OpenAi => {
            let key = require_key(&lookup, "OPENAI_API_KEY")?;
            let config = OpenAiConfig::new(key, model("OPENAI_MODEL", DEFAULT_OPENAI_MODEL))
                .with_timeout(config.timeout_secs);
            Ok(Box::new(OpenAiClient::new(config)?))
        }
        LlmProvider::Mock => Ok(Box::new(MockLlmClient::new())),
    }
}

fn require_key(lookup: &impl Fn(&str) -> Option<String>, env_var: &str) -> Result<String> {
    lookup(env_var)
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| GeoQueryError::config(format!("No API key configured. Set {env_var}.")))
}
