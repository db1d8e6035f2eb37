//! Extraction request client: send one page image to the proxy, get
//! questions back.
//!
//! The proxy (see [`crate::api`]) holds the provider credentials; this side
//! only ever sees `POST {endpoint}/api/extract-questions`. Whatever goes
//! wrong (connection refused, timeout, 5xx, a body that is not JSON) the
//! page resolves to a [`PageResult`] with zero questions and a
//! [`PageError`], never to an `Err`. One bad page must not abort a run.

use crate::error::PageError;
use crate::output::PageResult;
use crate::pipeline::encode::PageImage;
use crate::pipeline::parse::coerce_questions;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Path of the extraction route, relative to the proxy base URL.
pub const EXTRACT_PATH: &str = "/api/extract-questions";

/// Turns one page image into a settled [`PageResult`].
pub trait QuestionExtractor: Send + Sync {
    fn extract(&self, image: PageImage, model: &str) -> impl Future<Output = PageResult> + Send;
}

/// Request body of `POST /api/extract-questions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    #[serde(default)]
    pub page_image_base64: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub page_number: Option<usize>,
}

/// Response body of `POST /api/extract-questions`.
///
/// `questions` is kept as raw JSON so the client applies the same lenient
/// coercion as the server-side parser.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractResponse {
    /// `null` reads as an empty list.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub questions: Vec<Value>,
    /// Excerpt of model output that no recovery strategy could decode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unparsed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// [`QuestionExtractor`] backed by the HTTP proxy.
#[derive(Debug, Clone)]
pub struct HttpExtractionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpExtractionClient {
    /// Client for the proxy at `endpoint` (base URL, no path).
    pub fn new(endpoint: &str, timeout_secs: Option<u64>) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            http: builder.build()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, image: &PageImage, model: &str) -> Result<ExtractResponse, String> {
        let body = ExtractRequest {
            page_image_base64: image.image_base64.clone(),
            model: Some(model.to_string()),
            page_number: Some(image.page_num),
        };

        let response = self
            .http
            .post(format!("{}{}", self.endpoint, EXTRACT_PATH))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    format!("request timed out: {e}")
                } else {
                    e.to_string()
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            // The proxy reports `{error, questions: []}`; surface its message.
            let detail = response
                .json::<ExtractResponse>()
                .await
                .ok()
                .and_then(|r| r.error)
                .unwrap_or_else(|| "no error detail".to_string());
            return Err(format!("HTTP {status}: {detail}"));
        }

        response
            .json::<ExtractResponse>()
            .await
            .map_err(|e| format!("unreadable response body: {e}"))
    }
}

impl QuestionExtractor for HttpExtractionClient {
    async fn extract(&self, image: PageImage, model: &str) -> PageResult {
        let start = Instant::now();
        let page_num = image.page_num;
        let outcome = self.send(&image, model).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(body) => {
                let questions = coerce_questions(&Value::Array(body.questions));
                match body.unparsed {
                    Some(excerpt) if questions.is_empty() => {
                        warn!("Page {}: model output could not be parsed", page_num);
                        PageResult::failed(PageError::ParseFailed { page: page_num, excerpt }, duration_ms)
                    }
                    _ => {
                        debug!("Page {}: {} questions in {}ms", page_num, questions.len(), duration_ms);
                        PageResult::extracted(page_num, questions, duration_ms)
                    }
                }
            }
            Err(detail) => {
                warn!("Page {}: extraction request failed: {}", page_num, detail);
                PageResult::failed(PageError::RequestFailed { page: page_num, detail }, duration_ms)
            }
        }
    }
}
