//! Extraction orchestration: rasterise every page, fan out one extraction
//! request per page, merge results into an [`ExtractionSession`].
//!
//! ## Why two phases?
//!
//! pdfium is not re-entrant, so all pages are rasterised first in a single
//! blocking task. Only the network-bound extraction requests run
//! concurrently, through `buffer_unordered(config.concurrency)`. The
//! concurrency limit bounds how many requests are in flight, not how many
//! pages a document may have.
//!
//! ## Why a session object?
//!
//! Results are merged on the single task that polls the request futures, so
//! the session needs no locks. The caller owns it and can re-run extraction
//! on the same session; every page entry is replaced whole as it settles.
//! Observers follow along through [`ExtractionEvent`]s instead of sharing
//! state with the run.

use crate::client::QuestionExtractor;
use crate::config::ExtractionConfig;
use crate::error::PageError;
use crate::output::{ExtractionResult, PageResult, RunSummary};
use crate::pipeline::encode::PageImage;
use crate::question::Question;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Anything that can produce rasterised pages.
///
/// Implemented by [`crate::pipeline::render::Document`]; tests supply
/// in-memory sources.
pub trait PageSource: Send + Sync {
    fn page_count(&self) -> usize;

    /// Render every page; entry `i` is page `i + 1`.
    fn rasterize_pages(
        &self,
        scale: f32,
    ) -> impl Future<Output = Vec<Result<PageImage, PageError>>> + Send;
}

/// Progress notifications emitted during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExtractionEvent {
    /// The run began; `total_pages` entries will settle.
    Started { total_pages: usize, model: String },
    /// Rasterisation finished; `failed` pages could not be rendered.
    Rasterized { rendered: usize, failed: usize },
    /// One page settled, successfully or not.
    PageSettled {
        page_num: usize,
        question_count: usize,
        error: Option<String>,
        completed: usize,
        total: usize,
        progress_pct: f64,
        elapsed_ms: u64,
    },
    /// Every page settled.
    Finished(RunSummary),
}

pub type EventSender = UnboundedSender<ExtractionEvent>;

/// Extraction state owned by the caller across runs.
#[derive(Debug, Clone, Default)]
pub struct ExtractionSession {
    results: ExtractionResult,
    completed: usize,
    total: usize,
    model: String,
    started_at: Option<Instant>,
}

impl ExtractionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset counters for a new run of `total` pages.
    ///
    /// Existing page entries are kept and overwritten one by one as the new
    /// run settles, so a re-run never shows a blank document in between.
    pub fn begin(&mut self, total: usize, model: impl Into<String>) {
        self.completed = 0;
        self.total = total;
        self.model = model.into();
        self.started_at = Some(Instant::now());
        self.results.retain(|&page, _| page >= 1 && page <= total);
    }

    /// Insert or replace the entry for `result.page_num` and count it settled.
    pub fn merge(&mut self, result: PageResult) {
        self.results.insert(result.page_num, result);
        self.completed = (self.completed + 1).min(self.total.max(1));
    }

    /// Settled pages as a percentage of the total, 0–100.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Milliseconds since [`ExtractionSession::begin`].
    pub fn elapsed_ms(&self) -> u64 {
        self.started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.completed >= self.total
    }

    /// Questions of one page; empty for unknown or failed pages.
    pub fn questions(&self, page_num: usize) -> &[Question] {
        self.results
            .get(&page_num)
            .map(|r| r.questions.as_slice())
            .unwrap_or(&[])
    }

    pub fn page(&self, page_num: usize) -> Option<&PageResult> {
        self.results.get(&page_num)
    }

    pub fn results(&self) -> &ExtractionResult {
        &self.results
    }

    pub fn into_results(self) -> ExtractionResult {
        self.results
    }

    /// Aggregate counts over the current entries.
    pub fn summary(&self) -> RunSummary {
        let pages = || self.results.values();
        RunSummary {
            total_pages: self.total,
            total_questions: pages().map(|r| r.questions.len()).sum(),
            mcq_questions: pages().map(PageResult::mcq_count).sum(),
            failed_pages: pages().filter(|r| r.is_failed()).count(),
            elapsed_ms: self.elapsed_ms(),
        }
    }
}

/// Run one extraction over every page of `source`.
///
/// Completes when every page has settled; a failed page never aborts the
/// run. Dropping the returned future abandons in-flight requests.
pub async fn run<S, E>(
    session: &mut ExtractionSession,
    source: &S,
    extractor: &E,
    config: &ExtractionConfig,
    events: Option<&EventSender>,
) -> RunSummary
where
    S: PageSource,
    E: QuestionExtractor,
{
    let total = source.page_count();
    session.begin(total, config.model.clone());
    info!(
        "Extracting questions from {} pages with '{}' (concurrency {})",
        total, config.model, config.concurrency
    );
    emit(
        events,
        ExtractionEvent::Started {
            total_pages: total,
            model: config.model.clone(),
        },
    );

    // ── Phase 1: rasterise ────────────────────────────────────────────────
    let rendered = source.rasterize_pages(config.render_scale).await;
    let mut images = Vec::with_capacity(rendered.len());
    let mut render_failures = 0usize;
    for result in rendered {
        match result {
            Ok(image) => images.push(image),
            Err(err) => {
                render_failures += 1;
                warn!("{}", err);
                settle(session, PageResult::failed(err, 0), events);
            }
        }
    }
    emit(
        events,
        ExtractionEvent::Rasterized {
            rendered: images.len(),
            failed: render_failures,
        },
    );

    // ── Phase 2: bounded fan-out ──────────────────────────────────────────
    let model = config.model.as_str();
    let mut in_flight = stream::iter(images)
        .map(|image| extractor.extract(image, model))
        .buffer_unordered(config.concurrency.max(1));

    while let Some(result) = in_flight.next().await {
        debug!(
            "Page {} settled: {} questions in {}ms",
            result.page_num,
            result.questions.len(),
            result.duration_ms
        );
        settle(session, result, events);
    }

    let summary = session.summary();
    info!(
        "Extraction finished: {} questions ({} MCQ) from {} pages, {} failed, {}ms",
        summary.total_questions,
        summary.mcq_questions,
        summary.total_pages,
        summary.failed_pages,
        summary.elapsed_ms
    );
    emit(events, ExtractionEvent::Finished(summary.clone()));
    summary
}

fn settle(session: &mut ExtractionSession, result: PageResult, events: Option<&EventSender>) {
    let page_num = result.page_num;
    let question_count = result.questions.len();
    let error = result.error.as_ref().map(ToString::to_string);
    session.merge(result);
    emit(
        events,
        ExtractionEvent::PageSettled {
            page_num,
            question_count,
            error,
            completed: session.completed(),
            total: session.total(),
            progress_pct: session.progress(),
            elapsed_ms: session.elapsed_ms(),
        },
    );
}

fn emit(events: Option<&EventSender>, event: ExtractionEvent) {
    if let Some(tx) = events {
        // Receiver gone means nobody is watching anymore; the run carries on.
        let _ = tx.send(event);
    }
}
