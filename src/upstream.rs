//! Upstream vision model: one prompt + one page image in, raw text out.
//!
//! [`VisionModel`] is the seam between the proxy's HTTP handlers and the
//! provider SDK. The production implementation, [`LlmVisionModel`], goes
//! through `edgequake-llm`; tests plug in canned replies.
//!
//! ## Retry Strategy
//!
//! Retries are off by default (`max_retries = 0`): a failed page is reported
//! to the client, which may re-run it. When enabled, the delay doubles per
//! attempt (`retry_backoff_ms * 2^attempt`) so concurrent pages that failed
//! together do not retry together.

use crate::config::ServerConfig;
use crate::prompts::PAGE_IMAGE_MIME;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use thiserror::Error;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// Failure calling the upstream model.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The provider could not be constructed (usually a missing API key).
    #[error("Provider '{provider}' is not configured: {hint}")]
    NotConfigured { provider: String, hint: String },

    /// The provider answered with an error after all retries.
    #[error("Upstream model call failed: {0}")]
    Api(String),
}

/// A vision-capable model reachable from the proxy.
pub trait VisionModel: Send + Sync {
    /// Send `prompt` and a base64 PNG to `model`; return the reply text.
    fn complete<'a>(
        &'a self,
        model: &'a str,
        prompt: &'a str,
        image_base64: &'a str,
    ) -> BoxFuture<'a, Result<String, UpstreamError>>;
}

/// [`VisionModel`] backed by an `edgequake-llm` provider.
///
/// Requests name their model per call, so one provider instance is created
/// per model id and reused.
pub struct LlmVisionModel {
    provider_name: String,
    temperature: Option<f32>,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
    providers: Mutex<HashMap<String, Arc<dyn LLMProvider>>>,
}

impl std::fmt::Debug for LlmVisionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmVisionModel")
            .field("provider_name", &self.provider_name)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl LlmVisionModel {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            provider_name: config.provider_name.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            providers: Mutex::new(HashMap::new()),
        }
    }

    fn provider_for(&self, model: &str) -> Result<Arc<dyn LLMProvider>, UpstreamError> {
        let mut cache = self
            .providers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(p) = cache.get(model) {
            return Ok(Arc::clone(p));
        }
        let provider = ProviderFactory::create_llm_provider(&self.provider_name, model).map_err(|e| {
            UpstreamError::NotConfigured {
                provider: self.provider_name.clone(),
                hint: format!("{e}"),
            }
        })?;
        cache.insert(model.to_string(), Arc::clone(&provider));
        Ok(provider)
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }

    async fn complete_with_retries(
        &self,
        model: &str,
        prompt: &str,
        image_base64: &str,
    ) -> Result<String, UpstreamError> {
        let provider = self.provider_for(model)?;
        let start = Instant::now();

        // The prompt and the image travel together in a single user turn.
        let image = ImageData::new(image_base64.to_string(), PAGE_IMAGE_MIME).with_detail("high");
        let messages = vec![ChatMessage::user_with_images(prompt, vec![image])];
        let options = self.options();

        let mut last_err: Option<String> = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "Model '{}': retry {}/{} after {}ms",
                    model, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match provider.chat(&messages, Some(&options)).await {
                Ok(response) => {
                    debug!(
                        "Model '{}': {} input tokens, {} output tokens, {:?}",
                        model,
                        response.prompt_tokens,
                        response.completion_tokens,
                        start.elapsed()
                    );
                    return Ok(response.content.trim().to_string());
                }
                Err(e) => {
                    let err_msg = format!("{}", e);
                    warn!("Model '{}': attempt {} failed: {}", model, attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
            }
        }

        Err(UpstreamError::Api(
            last_err.unwrap_or_else(|| "Unknown error".to_string()),
        ))
    }
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`, saturating.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

impl VisionModel for LlmVisionModel {
    fn complete<'a>(
        &'a self,
        model: &'a str,
        prompt: &'a str,
        image_base64: &'a str,
    ) -> BoxFuture<'a, Result<String, UpstreamError>> {
        Box::pin(self.complete_with_retries(model, prompt, image_base64))
    }
}
