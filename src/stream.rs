//! Streaming extraction API: observe a run as pages settle.
//!
//! ## Why stream?
//!
//! A 200-page book takes minutes. [`extract_stream`] starts the run on its
//! own task and hands back a `Stream` of [`ExtractionEvent`]s, so callers can
//! drive a progress bar or show each page's questions as soon as they exist.
//! Pages settle in completion order, not page order; key by `page_num`.
//!
//! Dropping the event stream does not stop the run (events are then simply
//! discarded). Abort the [`ExtractionHandle::task`] to cancel it.

use crate::client::{HttpExtractionClient, QuestionExtractor};
use crate::config::ExtractionConfig;
use crate::error::Pdf2QuizError;
use crate::orchestrator::{self, ExtractionEvent, ExtractionSession, PageSource};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// A running extraction.
pub struct ExtractionHandle {
    /// Progress events; ends after [`ExtractionEvent::Finished`].
    pub events: UnboundedReceiverStream<ExtractionEvent>,
    /// Resolves to the session holding every page's result.
    pub task: JoinHandle<ExtractionSession>,
}

/// Start extracting `source` through the HTTP proxy in `config.endpoint`.
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2quiz::{extract_stream, open_input, ExtractionConfig, ExtractionEvent};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::default();
/// let doc = open_input("midterm.pdf", &config).await?;
/// let mut handle = extract_stream(doc, config)?;
/// while let Some(event) = handle.events.next().await {
///     if let ExtractionEvent::PageSettled { page_num, question_count, .. } = event {
///         println!("page {page_num}: {question_count} questions");
///     }
/// }
/// let session = handle.task.await?;
/// println!("{} pages", session.results().len());
/// # Ok(())
/// # }
/// ```
pub fn extract_stream<S>(source: S, config: ExtractionConfig) -> Result<ExtractionHandle, Pdf2QuizError>
where
    S: PageSource + 'static,
{
    let client = HttpExtractionClient::new(&config.endpoint, config.request_timeout_secs)
        .map_err(|e| Pdf2QuizError::Internal(format!("Failed to build HTTP client: {e}")))?;
    Ok(extract_stream_with(source, client, config))
}

/// Like [`extract_stream`] with a caller-supplied extractor.
pub fn extract_stream_with<S, E>(source: S, extractor: E, config: ExtractionConfig) -> ExtractionHandle
where
    S: PageSource + 'static,
    E: QuestionExtractor + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(async move {
        let mut session = ExtractionSession::new();
        orchestrator::run(&mut session, &source, &extractor, &config, Some(&tx)).await;
        session
    });
    ExtractionHandle {
        events: UnboundedReceiverStream::new(rx),
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use crate::output::PageResult;
    use crate::pipeline::encode::PageImage;
    use futures::StreamExt;

    struct TwoPages;

    impl PageSource for TwoPages {
        fn page_count(&self) -> usize {
            2
        }

        async fn rasterize_pages(&self, _scale: f32) -> Vec<Result<PageImage, PageError>> {
            (1..=2)
                .map(|page_num| {
                    Ok(PageImage {
                        page_num,
                        image_base64: String::new(),
                        width: 1,
                        height: 1,
                    })
                })
                .collect()
        }
    }

    struct Empty;

    impl QuestionExtractor for Empty {
        async fn extract(&self, image: PageImage, _model: &str) -> PageResult {
            PageResult::extracted(image.page_num, Vec::new(), 0)
        }
    }

    #[tokio::test]
    async fn stream_ends_with_finished_and_task_returns_session() {
        let handle = extract_stream_with(TwoPages, Empty, ExtractionConfig::default());
        let events: Vec<ExtractionEvent> = handle.events.collect().await;

        assert!(matches!(events.last(), Some(ExtractionEvent::Finished(_))));
        let settled = events
            .iter()
            .filter(|e| matches!(e, ExtractionEvent::PageSettled { .. }))
            .count();
        assert_eq!(settled, 2);

        let session = handle.task.await.unwrap();
        assert!(session.is_complete());
        assert_eq!(session.results().len(), 2);
    }
}
