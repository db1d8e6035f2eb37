//! Route handlers.

use crate::api::error::ApiError;
use crate::api::ApiContext;
use crate::catalog::{ModelList, DEFAULT_MODEL};
use crate::client::ExtractRequest;
use crate::pipeline::parse::{excerpt, try_parse_questions, EXCERPT_LEN};
use crate::question::Question;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

/// Success body of `POST /api/extract-questions`.
#[derive(Debug, Serialize)]
pub struct ExtractReply {
    pub questions: Vec<Question>,
    /// Start of the model output when no recovery strategy decoded it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unparsed: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

/// `POST /api/extract-questions`
pub async fn extract_questions(
    State(ctx): State<ApiContext>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractReply>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let image = strip_data_url(&req.page_image_base64);
    if image.trim().is_empty() {
        return Err(ApiError::BadRequest("No page image provided".into()));
    }
    let model = req
        .model
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MODEL);
    let page = req
        .page_number
        .map(|p| p.to_string())
        .unwrap_or_else(|| "?".into());

    let raw = ctx.vision.complete(model, &ctx.prompt, image).await?;

    let reply = match try_parse_questions(&raw) {
        Some(questions) => ExtractReply {
            questions,
            unparsed: None,
        },
        None => {
            warn!("Page {}: could not decode model output as JSON", page);
            ExtractReply {
                questions: Vec::new(),
                unparsed: Some(excerpt(&raw, EXCERPT_LEN)),
            }
        }
    };
    info!(
        "Page {}: {} questions extracted with '{}'",
        page,
        reply.questions.len(),
        model
    );
    Ok(Json(reply))
}

/// `GET /api/models`
pub async fn list_models(State(ctx): State<ApiContext>) -> Json<ModelList> {
    Json(ModelList {
        models: ctx.catalog.list_models().await,
    })
}

/// `GET /api/health`
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Accept both bare base64 and `data:image/png;base64,...` URLs.
fn strip_data_url(image: &str) -> &str {
    match image.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_url_prefix_is_removed() {
        assert_eq!(strip_data_url("data:image/png;base64,iVBOR"), "iVBOR");
        assert_eq!(strip_data_url("iVBOR"), "iVBOR");
    }
}
