//! Configuration types for question extraction and the proxy server.
//!
//! Client-side behaviour is controlled through [`ExtractionConfig`], built via
//! [`ExtractionConfigBuilder`]. Server-side behaviour (which provider backs
//! the proxy, retries, the prompt) lives in [`ServerConfig`]. The two are kept
//! apart because they usually run in different processes: the credentials
//! only ever exist on the server side.
//!
//! # Design choice: builder over constructor
//! Callers set only what they care about and rely on documented defaults for
//! the rest; `build()` is the single place constraints are checked.

use crate::catalog::DEFAULT_MODEL;
use crate::error::Pdf2QuizError;
use crate::pipeline::render::RENDER_SCALE;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Default base URL of the extraction proxy.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000";

/// Configuration for one extraction run.
///
/// # Example
/// ```rust
/// use edgequake_pdf2quiz::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .concurrency(4)
///     .model("anthropic/claude-3.5-sonnet")
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Render scale relative to the page's natural size. Range: 0.5–4.0. Default: 2.0.
    pub render_scale: f32,

    /// Maximum number of extraction requests in flight. Default: 10.
    ///
    /// Every page of a 300-page book at once is a burst the upstream provider
    /// will rate-limit; lower this if pages fail with `429`.
    pub concurrency: usize,

    /// Model identifier forwarded to the proxy. Default: `openai/gpt-4o`.
    pub model: String,

    /// Base URL of the extraction proxy (`/api/...` is appended).
    pub endpoint: String,

    /// Per-request timeout in seconds; `None` waits indefinitely. Default: 120.
    ///
    /// Vision models regularly take 20–60 s on dense pages, so the default is
    /// generous. A timed-out request fails only its own page.
    pub request_timeout_secs: Option<u64>,

    /// PDF user password for encrypted documents.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            render_scale: RENDER_SCALE,
            concurrency: 10,
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: Some(120),
            password: None,
            download_timeout_secs: 120,
        }
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn render_scale(mut self, scale: f32) -> Self {
        self.config.render_scale = scale;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Pdf2QuizError> {
        let c = &self.config;
        if !(0.5..=4.0).contains(&c.render_scale) {
            return Err(Pdf2QuizError::InvalidConfig(format!(
                "Render scale must be 0.5–4.0, got {}",
                c.render_scale
            )));
        }
        if c.concurrency == 0 {
            return Err(Pdf2QuizError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.model.trim().is_empty() {
            return Err(Pdf2QuizError::InvalidConfig("Model must not be empty".into()));
        }
        if !crate::pipeline::input::is_url(&c.endpoint) {
            return Err(Pdf2QuizError::InvalidConfig(format!(
                "Endpoint must be an http(s) URL, got '{}'",
                c.endpoint
            )));
        }
        Ok(self.config)
    }
}

// ── Server ───────────────────────────────────────────────────────────────

/// Configuration for the extraction proxy server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on. Default: `127.0.0.1:3000`.
    pub bind: SocketAddr,

    /// `edgequake-llm` provider used for vision calls. Default: `openrouter`.
    ///
    /// Model ids in requests are namespaced (`openai/gpt-4o`), which is the
    /// OpenRouter convention; other providers need plain model names.
    pub provider_name: String,

    /// Provider model listing. Default: OpenRouter's `/api/v1/models`.
    pub catalog_url: String,

    /// Sampling temperature. `None` leaves the provider default.
    pub temperature: Option<f32>,

    /// Maximum tokens the model may generate per page. Default: 4000.
    pub max_tokens: usize,

    /// Retries on an upstream failure. Default: 0.
    ///
    /// The client reports a failed page and the user re-runs; retrying here
    /// multiplies cost on pages the model consistently rejects.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    pub retry_backoff_ms: u64,

    /// Custom extraction prompt. If None, uses [`crate::prompts::EXTRACTION_PROMPT`].
    pub prompt: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            provider_name: "openrouter".to_string(),
            catalog_url: crate::catalog::OPENROUTER_MODELS_URL.to_string(),
            temperature: None,
            max_tokens: 4000,
            max_retries: 0,
            retry_backoff_ms: 500,
            prompt: None,
        }
    }
}

impl ServerConfig {
    /// The prompt actually sent to the model.
    pub fn effective_prompt(&self) -> &str {
        self.prompt
            .as_deref()
            .unwrap_or(crate::prompts::EXTRACTION_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.render_scale, 2.0);
        assert_eq!(c.concurrency, 10);
        assert_eq!(c.model, "openai/gpt-4o");
        assert_eq!(c.request_timeout_secs, Some(120));
    }

    #[test]
    fn builder_trims_endpoint() {
        let c = ExtractionConfig::builder()
            .concurrency(1)
            .endpoint("http://localhost:8080/")
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.endpoint, "http://localhost:8080");
    }

    #[test]
    fn builder_rejects_zero_concurrency() {
        let err = ExtractionConfig::builder().concurrency(0).build().unwrap_err();
        assert!(matches!(err, Pdf2QuizError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_bad_values() {
        assert!(ExtractionConfig::builder().render_scale(10.0).build().is_err());
        assert!(ExtractionConfig::builder().model("  ").build().is_err());
        assert!(ExtractionConfig::builder().endpoint("localhost:3000").build().is_err());
    }

    #[test]
    fn password_is_not_serialised() {
        let c = ExtractionConfig::builder().password("hunter2").build().unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn server_prompt_override() {
        let mut s = ServerConfig::default();
        assert!(s.effective_prompt().starts_with("Extract all questions"));
        s.prompt = Some("custom".into());
        assert_eq!(s.effective_prompt(), "custom");
        assert_eq!(s.max_tokens, 4000);
    }
}
