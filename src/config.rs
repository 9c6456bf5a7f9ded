//! Configuration types for course customisation and mind-map generation.
//!
//! All run behaviour is controlled through [`MindMapConfig`], built via its
//! [`MindMapConfigBuilder`]. Keeping every knob in one value means provider
//! selection, credentials and limits are threaded explicitly into the
//! completion adapter instead of living in ambient state.

use crate::error::MindMapError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for a mind-map run.
///
/// Built via [`MindMapConfig::builder()`] or using
/// [`MindMapConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_mindmap::{MindMapConfig, SegmentStrategy};
///
/// let config = MindMapConfig::builder()
///     .segmentation(SegmentStrategy::FixedWidth { words_per_chunk: 800 })
///     .concurrency(2)
///     .model("gpt-4.1-nano")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct MindMapConfig {
    /// How the course text is cut into chunks. Default: `Auto { 1500 }`.
    pub segmentation: SegmentStrategy,

    /// Characters of each chunk forwarded to the model. Default: 3000.
    ///
    /// The cut is positional, not sentence-aware: a chunk longer than this
    /// loses its tail for mind-map purposes (the full text is still kept in
    /// the output).
    pub max_prompt_chars: usize,

    /// Number of chunks extracted concurrently. Default: 4.
    ///
    /// `1` reproduces strictly sequential processing. Results are returned
    /// in chunk order regardless.
    pub concurrency: usize,

    /// LLM model identifier, e.g. "gpt-4.1-nano", "gemini-2.0-flash".
    /// If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "gemini", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens the model may generate per call. Default: 4096.
    pub max_tokens: usize,

    /// Retries per completion call on upstream failure. Default: 3.
    ///
    /// Only transport-level failures are retried. A reply that arrives but
    /// carries no usable JSON is reported as-is.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (doubles per attempt). Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-completion-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Free-form learner profile. When set, the source text is first
    /// rewritten for this profile into "Module N" sections.
    pub user_profile: Option<String>,

    /// Produce a short course summary after mind-mapping. Default: false.
    pub summarize: bool,

    /// What to do with duplicate node ids and dangling edges. Default: Strict.
    pub reference_policy: ReferencePolicy,

    /// Optional per-chunk progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for MindMapConfig {
    fn default() -> Self {
        Self {
            segmentation: SegmentStrategy::default(),
            max_prompt_chars: 3000,
            concurrency: 4,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            download_timeout_secs: 120,
            password: None,
            user_profile: None,
            summarize: false,
            reference_policy: ReferencePolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for MindMapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MindMapConfig")
            .field("segmentation", &self.segmentation)
            .field("max_prompt_chars", &self.max_prompt_chars)
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("user_profile", &self.user_profile)
            .field("summarize", &self.summarize)
            .field("reference_policy", &self.reference_policy)
            .finish()
    }
}

impl MindMapConfig {
    /// Create a new builder for `MindMapConfig`.
    pub fn builder() -> MindMapConfigBuilder {
        MindMapConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }
}

/// Builder for [`MindMapConfig`].
pub struct MindMapConfigBuilder {
    config: MindMapConfig,
}

impl fmt::Debug for MindMapConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MindMapConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl MindMapConfigBuilder {
    pub fn segmentation(mut self, strategy: SegmentStrategy) -> Self {
        self.config.segmentation = strategy;
        self
    }

    pub fn max_prompt_chars(mut self, n: usize) -> Self {
        self.config.max_prompt_chars = n;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn user_profile(mut self, profile: impl Into<String>) -> Self {
        self.config.user_profile = Some(profile.into());
        self
    }

    pub fn summarize(mut self, v: bool) -> Self {
        self.config.summarize = v;
        self
    }

    pub fn reference_policy(mut self, policy: ReferencePolicy) -> Self {
        self.config.reference_policy = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<MindMapConfig, MindMapError> {
        let c = &self.config;
        match c.segmentation {
            SegmentStrategy::FixedWidth { words_per_chunk }
            | SegmentStrategy::Auto { words_per_chunk }
                if words_per_chunk == 0 =>
            {
                return Err(MindMapError::InvalidConfig(
                    "words_per_chunk must be ≥ 1".into(),
                ));
            }
            _ => {}
        }
        if c.max_prompt_chars == 0 {
            return Err(MindMapError::InvalidConfig(
                "max_prompt_chars must be ≥ 1".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(MindMapError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(MindMapError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        if c.user_profile.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(MindMapError::InvalidConfig(
                "user_profile must not be blank".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How course text is cut into chunks.
///
/// | Strategy | Use case |
/// |----------|----------|
/// | `FixedWidth` | Raw extracted text with no reliable headings |
/// | `Markers` | Customised output that was prompted to emit "Module N" headings |
/// | `Auto` | Markers when any are present, otherwise fixed-width (default) |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentStrategy {
    /// Windows of `words_per_chunk` whitespace-separated words.
    FixedWidth { words_per_chunk: usize },
    /// One chunk per "Module N" marker.
    Markers,
    /// Markers if the text has any, else fixed-width windows.
    Auto { words_per_chunk: usize },
}

impl Default for SegmentStrategy {
    fn default() -> Self {
        SegmentStrategy::Auto {
            words_per_chunk: 1500,
        }
    }
}

/// Treatment of duplicate node ids and edges that reference unknown nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePolicy {
    /// Reject such graphs with `InvalidGraphReferences`. (default)
    #[default]
    Strict,
    /// Pass them through untouched; the renderer copes with orphan edges.
    Lenient,
}
