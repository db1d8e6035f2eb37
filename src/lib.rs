//! # edgequake-pdf2quiz
//!
//! Extract exam questions from PDF study material using Vision Language
//! Models, then practise them.
//!
//! ## Why this crate?
//!
//! Past papers and worksheets are PDFs: scanned, multi-column, full of
//! formulae and answer grids. Text extraction scrambles exactly the parts
//! that matter (which options belong to which question, which one is
//! ticked). Instead each page is rasterised and a vision model reads it as a
//! student would, answering with structured multiple-choice and open
//! questions.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     resolve local file or download from a blob URL
//!  ├─ 2. Render    rasterise every page via pdfium (spawn_blocking)
//!  ├─ 3. Encode    PNG → base64
//!  ├─ 4. Extract   bounded concurrent POSTs to the extraction proxy
//!  │               └─ proxy: vision model call + JSON recovery
//!  └─ 5. Merge     per-page results into an ExtractionSession, with events
//! ```
//!
//! The proxy ([`api`], `pdf2quiz serve`) is the only process holding
//! provider credentials; clients need nothing but its URL.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2quiz::{extract_questions, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .endpoint("http://127.0.0.1:3000")
//!         .model("openai/gpt-4o")
//!         .build()?;
//!     let output = extract_questions("biology_final.pdf", &config).await?;
//!     eprintln!(
//!         "{} questions ({} MCQ), est. ${:.4}",
//!         output.summary.total_questions,
//!         output.summary.mcq_questions,
//!         output.estimated_cost
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2quiz` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod catalog;
pub mod client;
pub mod config;
pub mod cost;
pub mod error;
pub mod extract;
pub mod orchestrator;
pub mod output;
pub mod pipeline;
pub mod practice;
pub mod prompts;
pub mod question;
pub mod storage;
pub mod stream;
pub mod upstream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use catalog::{fallback_models, find_model, CatalogClient, ModelDescriptor, ModelPricing, DEFAULT_MODEL};
pub use client::{HttpExtractionClient, QuestionExtractor};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, ServerConfig};
pub use error::{PageError, Pdf2QuizError};
pub use extract::{estimate_cost, extract_document, extract_questions, extract_questions_sync, open_input};
pub use orchestrator::{ExtractionEvent, ExtractionSession, PageSource};
pub use output::{ExtractionOutput, ExtractionResult, PageResult, RunSummary};
pub use pipeline::parse::parse_questions;
pub use pipeline::render::Document;
pub use question::{McqQuestion, OpenQuestion, Question};
pub use storage::ResultStore;
pub use stream::{extract_stream, ExtractionHandle};
