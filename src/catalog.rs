//! Model catalog: which vision models can be picked, and what they cost.
//!
//! The provider listing (OpenRouter's `/api/v1/models`) returns hundreds of
//! models priced per token, as strings. [`CatalogClient`] keeps the
//! vision-capable families and converts prices to USD per 1 000 tokens, the
//! unit [`crate::cost::estimate`] works in.
//!
//! The catalog is advisory. Any failure (network, status, decode) is logged
//! and answered with [`fallback_models`], so callers never handle a catalog
//! error.

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "openai/gpt-4o";

/// Provider model listing.
pub const OPENROUTER_MODELS_URL: &str = "https://openrouter.ai/api/v1/models";

/// Substrings identifying vision-capable model families.
const VISION_FAMILIES: &[&str] = &["gpt-4", "claude", "gemini", "pixtral", "vision", "-vl"];

const CATALOG_TIMEOUT_SECS: u64 = 15;

/// Price of a model in USD per 1 000 tokens.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelPricing {
    #[serde(default, deserialize_with = "de_price")]
    pub prompt: Option<f64>,
    #[serde(default, deserialize_with = "de_price")]
    pub completion: Option<f64>,
}

impl ModelPricing {
    pub fn per_thousand(prompt: f64, completion: f64) -> Self {
        Self {
            prompt: Some(prompt),
            completion: Some(completion),
        }
    }
}

/// One selectable model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing: Option<ModelPricing>,
}

/// Why a catalog fetch failed. Only ever logged.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("catalog returned HTTP {0}")]
    Status(reqwest::StatusCode),
}

/// Provider listing wire format: `{data: [...]}`, prices per token.
#[derive(Debug, Deserialize)]
struct UpstreamListing {
    #[serde(default)]
    data: Vec<UpstreamModel>,
}

#[derive(Debug, Deserialize)]
struct UpstreamModel {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    context_length: Option<u64>,
    #[serde(default)]
    pricing: Option<ModelPricing>,
}

/// Proxy wire format: `{models: [...]}`, prices per 1K tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelList {
    pub models: Vec<ModelDescriptor>,
}

/// Where a [`CatalogClient`] reads its listing from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Listing {
    /// Provider listing (`{data: [...]}`, per-token prices).
    Provider(String),
    /// Extraction proxy `GET /api/models` (`{models: [...]}`).
    Proxy(String),
}

/// Fetches the model catalog over HTTP.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    listing: Listing,
}

impl CatalogClient {
    /// Client for the provider listing at `listing_url`.
    pub fn new(listing_url: impl Into<String>) -> Self {
        Self::with_listing(Listing::Provider(listing_url.into()))
    }

    /// Client for the models served by an extraction proxy at `endpoint`.
    pub fn proxy(endpoint: &str) -> Self {
        Self::with_listing(Listing::Proxy(format!(
            "{}/api/models",
            endpoint.trim_end_matches('/')
        )))
    }

    fn with_listing(listing: Listing) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(CATALOG_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();
        Self { http, listing }
    }

    /// URL the listing is fetched from.
    pub fn listing_url(&self) -> &str {
        match &self.listing {
            Listing::Provider(url) | Listing::Proxy(url) => url,
        }
    }

    /// Vision models from the listing, or the fallback list.
    pub async fn list_models(&self) -> Vec<ModelDescriptor> {
        match &self.listing {
            Listing::Provider(url) => self.list_provider_models(url).await,
            Listing::Proxy(url) => self.list_proxy_models(url).await,
        }
    }

    async fn list_provider_models(&self, url: &str) -> Vec<ModelDescriptor> {
        match self.fetch_upstream(url).await {
            Ok(models) if !models.is_empty() => models,
            Ok(_) => {
                warn!("Model catalog had no vision models; using fallback list");
                fallback_models()
            }
            Err(e) => {
                warn!("Model catalog unavailable ({}); using fallback list", e);
                fallback_models()
            }
        }
    }

    async fn list_proxy_models(&self, url: &str) -> Vec<ModelDescriptor> {
        match self.fetch_json::<ModelList>(url).await {
            Ok(list) if !list.models.is_empty() => list.models,
            Ok(_) => fallback_models(),
            Err(e) => {
                warn!("Model list from proxy unavailable ({}); using fallback list", e);
                fallback_models()
            }
        }
    }

    async fn fetch_upstream(&self, url: &str) -> Result<Vec<ModelDescriptor>, CatalogError> {
        let listing: UpstreamListing = self.fetch_json(url).await?;
        let total = listing.data.len();
        let models: Vec<ModelDescriptor> = listing
            .data
            .into_iter()
            .filter(|m| is_vision_model(&m.id))
            .map(ModelDescriptor::from)
            .collect();
        debug!("Model catalog: kept {} of {} models", models.len(), total);
        Ok(models)
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status()));
        }
        Ok(response.json::<T>().await?)
    }
}

impl From<UpstreamModel> for ModelDescriptor {
    fn from(m: UpstreamModel) -> Self {
        let pricing = m.pricing.map(|p| ModelPricing {
            prompt: p.prompt.map(|v| v * 1000.0),
            completion: p.completion.map(|v| v * 1000.0),
        });
        ModelDescriptor {
            provider: provider_of(&m.id),
            name: m.name.unwrap_or_else(|| m.id.clone()),
            id: m.id,
            context_length: m.context_length,
            pricing,
        }
    }
}

fn is_vision_model(id: &str) -> bool {
    let id = id.to_ascii_lowercase();
    VISION_FAMILIES.iter().any(|family| id.contains(family))
}

/// `openai/gpt-4o` → `openai`.
fn provider_of(id: &str) -> String {
    id.split_once('/')
        .map(|(p, _)| p.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Static catalog used whenever the live listing is unavailable.
pub fn fallback_models() -> Vec<ModelDescriptor> {
    let entry = |id: &str, name: &str, provider: &str, prompt: f64, completion: f64| ModelDescriptor {
        id: id.to_string(),
        name: name.to_string(),
        provider: provider.to_string(),
        context_length: None,
        pricing: Some(ModelPricing::per_thousand(prompt, completion)),
    };
    vec![
        entry("openai/gpt-4o", "GPT-4o", "openai", 0.0025, 0.01),
        entry("openai/gpt-4-turbo", "GPT-4 Turbo", "openai", 0.01, 0.03),
        entry("anthropic/claude-3.5-sonnet", "Claude 3.5 Sonnet", "anthropic", 0.003, 0.015),
        entry("google/gemini-pro-vision", "Gemini Pro Vision", "google", 0.00025, 0.0005),
    ]
}

/// Look a model up by id.
pub fn find_model<'a>(models: &'a [ModelDescriptor], id: &str) -> Option<&'a ModelDescriptor> {
    models.iter().find(|m| m.id == id)
}

/// Prices arrive as numbers or as decimal strings (`"0.0000025"`).
fn de_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }
    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Num(n)) => Some(n),
        Some(Raw::Str(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    }
    .filter(|v| v.is_finite() && *v >= 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_has_four_priced_models() {
        let models = fallback_models();
        assert_eq!(models.len(), 4);
        assert!(models.iter().all(|m| m.pricing.is_some()));
        let gpt4o = find_model(&models, DEFAULT_MODEL).unwrap();
        assert_eq!(gpt4o.pricing.unwrap().prompt, Some(0.0025));
    }

    #[test]
    fn upstream_listing_is_filtered_and_converted_to_per_thousand() {
        let body = r#"{"data":[
            {"id":"openai/gpt-4o","name":"OpenAI: GPT-4o","context_length":128000,
             "pricing":{"prompt":"0.0000025","completion":"0.00001"}},
            {"id":"meta-llama/llama-3-8b-instruct","name":"Llama 3 8B",
             "pricing":{"prompt":"0.0000001","completion":"0.0000001"}},
            {"id":"qwen/qwen2.5-vl-72b-instruct","pricing":{"prompt":"n/a"}}
        ]}"#;
        let listing: UpstreamListing = serde_json::from_str(body).unwrap();
        let models: Vec<ModelDescriptor> = listing
            .data
            .into_iter()
            .filter(|m| is_vision_model(&m.id))
            .map(ModelDescriptor::from)
            .collect();

        assert_eq!(models.len(), 2);
        assert_eq!(models[0].provider, "openai");
        assert_eq!(models[0].context_length, Some(128000));
        let p = models[0].pricing.unwrap();
        assert!((p.prompt.unwrap() - 0.0025).abs() < 1e-12);
        assert!((p.completion.unwrap() - 0.01).abs() < 1e-12);

        assert_eq!(models[1].name, "qwen/qwen2.5-vl-72b-instruct");
        assert_eq!(models[1].pricing.unwrap().prompt, None);
    }

    #[test]
    fn descriptor_serialises_camel_case() {
        let v = serde_json::to_value(&fallback_models()[0]).unwrap();
        assert_eq!(v["id"], "openai/gpt-4o");
        assert!(v.get("contextLength").is_none());
        assert_eq!(v["pricing"]["completion"], 0.01);
    }

    #[tokio::test]
    async fn unreachable_catalog_falls_back() {
        let client = CatalogClient::new("http://127.0.0.1:1/api/v1/models");
        let models = client.list_models().await;
        assert_eq!(models.len(), 4);
        assert!(models.iter().all(|m| m.pricing.is_some()));

        let via_proxy = CatalogClient::proxy("http://127.0.0.1:1").list_models().await;
        assert_eq!(via_proxy, fallback_models());
    }

    #[test]
    fn proxy_client_reads_the_models_route() {
        let client = CatalogClient::proxy("http://127.0.0.1:3000/");
        assert_eq!(client.listing_url(), "http://127.0.0.1:3000/api/models");
        assert_eq!(
            CatalogClient::new(OPENROUTER_MODELS_URL).listing_url(),
            OPENROUTER_MODELS_URL
        );
    }
}
