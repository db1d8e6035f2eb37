//! Top-level extraction entry points.
//!
//! [`extract_questions`] is the one-call API: resolve the input, open it,
//! estimate the cost, run every page through the proxy and return the
//! questions in page order. The pieces are public too, for callers (the CLI,
//! [`crate::stream`]) that need to act between steps.

use crate::catalog::{find_model, CatalogClient};
use crate::client::HttpExtractionClient;
use crate::config::ExtractionConfig;
use crate::cost;
use crate::error::Pdf2QuizError;
use crate::orchestrator::{self, EventSender, ExtractionSession};
use crate::output::ExtractionOutput;
use crate::pipeline::input;
use crate::pipeline::render::Document;
use tracing::info;

/// Extract questions from a PDF file path or URL.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2quiz::{extract_questions, ExtractionConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Assumes `pdf2quiz serve` is running on the default endpoint.
///     let config = ExtractionConfig::default();
///     let output = extract_questions("midterm.pdf", &config).await?;
///     for q in output.questions() {
///         println!("{}", q.text());
///     }
///     Ok(())
/// }
/// ```
pub async fn extract_questions(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2QuizError> {
    let doc = open_input(input_str.as_ref(), config).await?;
    let estimated_cost = estimate_cost(doc.page_count(), config).await;
    let mut output = extract_document(&doc, config, None).await?;
    output.estimated_cost = estimated_cost;
    Ok(output)
}

/// Blocking version of [`extract_questions`].
///
/// Creates a temporary tokio runtime; do not call from inside one.
pub fn extract_questions_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2QuizError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2QuizError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_questions(input_str, config))
}

/// Resolve `input_str` and open it as a [`Document`].
pub async fn open_input(input_str: &str, config: &ExtractionConfig) -> Result<Document, Pdf2QuizError> {
    let source = input::resolve_input(input_str, config.download_timeout_secs).await?;
    Document::open(source.bytes, source.file_name, config.password.clone()).await
}

/// Estimated USD cost of extracting `page_count` pages with `config.model`.
///
/// Pricing comes from the proxy's catalog (or the built-in fallback). Models
/// without pricing estimate to 0.
pub async fn estimate_cost(page_count: usize, config: &ExtractionConfig) -> f64 {
    let models = CatalogClient::proxy(&config.endpoint).list_models().await;
    let pricing = find_model(&models, &config.model).and_then(|m| m.pricing.as_ref());
    cost::estimate(page_count, pricing)
}

/// Run extraction over an opened document.
///
/// `estimated_cost` is left at 0; see [`estimate_cost`].
pub async fn extract_document(
    doc: &Document,
    config: &ExtractionConfig,
    events: Option<&EventSender>,
) -> Result<ExtractionOutput, Pdf2QuizError> {
    let client = HttpExtractionClient::new(&config.endpoint, config.request_timeout_secs)
        .map_err(|e| Pdf2QuizError::Internal(format!("Failed to build HTTP client: {e}")))?;

    let mut session = ExtractionSession::new();
    let summary = orchestrator::run(&mut session, doc, &client, config, events).await;
    info!(
        "'{}': {} questions from {} pages",
        doc.file_name(),
        summary.total_questions,
        summary.total_pages
    );

    Ok(ExtractionOutput {
        file_name: doc.file_name().to_string(),
        model: config.model.clone(),
        pages: session.into_results().into_values().collect(),
        summary,
        estimated_cost: 0.0,
    })
}
