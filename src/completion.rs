//! The text-completion capability consumed by the pipeline.
//!
//! The core never talks to an HTTP client directly. Everything that needs a
//! model goes through [`TextCompletion`]: prompt in, text out. Two
//! implementations ship with the crate:
//!
//! * [`LlmCompletion`]: adapts any `edgequake-llm` provider (OpenAI,
//!   Anthropic, Gemini, Ollama, …) with the sampling options from
//!   [`MindMapConfig`].
//! * [`FnCompletion`]: wraps a plain closure; handy for stubs in tests and
//!   for callers that already own a client.

use crate::config::MindMapConfig;
use crate::error::{CompletionError, MindMapError};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tracing::debug;

/// Default model when a provider is named without one.
pub const DEFAULT_MODEL: &str = "gpt-4.1-nano";

/// A single blocking-from-the-caller's-view completion call.
///
/// Implementations must be safe to call concurrently: the pipeline issues
/// one call per chunk and may run several chunks at once.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

#[async_trait]
impl<T: TextCompletion + ?Sized> TextCompletion for Arc<T> {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        (**self).complete(prompt).await
    }
}

// ── Closure adapter ──────────────────────────────────────────────────────────

/// Adapts a synchronous `Fn(&str) -> Result<String, CompletionError>`.
pub struct FnCompletion<F> {
    f: F,
}

impl<F> FnCompletion<F>
where
    F: Fn(&str) -> Result<String, CompletionError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> TextCompletion for FnCompletion<F>
where
    F: Fn(&str) -> Result<String, CompletionError> + Send + Sync,
{
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        (self.f)(prompt)
    }
}

// ── edgequake-llm adapter ────────────────────────────────────────────────────

/// Sends each prompt as a single user message to an `edgequake-llm` provider.
pub struct LlmCompletion {
    provider: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
}

impl LlmCompletion {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &MindMapConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// Resolve the provider from `config` and wrap it.
    pub fn from_config(config: &MindMapConfig) -> Result<Self, MindMapError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl TextCompletion for LlmCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let messages = vec![ChatMessage::user(prompt)];
        let options = self.options();

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| CompletionError::new(e.to_string()))?;

        debug!(
            "completion: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        Ok(response.content)
    }
}

// ── Provider resolution ──────────────────────────────────────────────────────

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`): used as-is.
/// 2. **Named provider + model** (`config.provider_name`): the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **`OPENAI_API_KEY`** present: OpenAI with the configured or default model.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &MindMapConfig) -> Result<Arc<dyn LLMProvider>, MindMapError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| MindMapError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, GEMINI_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, MindMapError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        MindMapError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}
