//! Error types for the edgequake-pdf2quiz library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2QuizError`] — **Fatal**: the run cannot start at all (bad input
//!   file, unreadable PDF, pdfium missing, invalid configuration). Returned as
//!   `Err(Pdf2QuizError)` from the top-level `extract*` functions.
//!
//! * [`PageError`] — **Non-fatal**: a single page could not be rendered,
//!   its request to the extraction endpoint failed, or the model reply could
//!   not be decoded. Stored inside [`crate::output::PageResult`] next to an
//!   empty question list, so a failed page is distinguishable from a page
//!   that genuinely holds no questions.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2quiz library.
#[derive(Debug, Error)]
pub enum Pdf2QuizError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// URL was valid but the download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("'{name}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// pdfium could not parse the document.
    #[error("PDF '{name}' is corrupt: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// The document opened but has no pages to extract from.
    #[error("PDF '{name}' has no pages")]
    EmptyDocument { name: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install libpdfium on the library path or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The local result cache could not be read or written.
    #[error("Result cache error at '{path}': {detail}")]
    Storage { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// The run always continues; the page ends up with zero questions and this
/// marker in its [`crate::output::PageResult`].
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageError {
    /// The page could not be rasterised (corrupt or unsupported content).
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// Network or HTTP failure calling the extraction endpoint.
    #[error("Page {page}: extraction request failed: {detail}")]
    RequestFailed { page: usize, detail: String },

    /// The model replied but none of the recovery strategies decoded it.
    #[error("Page {page}: model output could not be parsed")]
    ParseFailed { page: usize, excerpt: String },
}

impl PageError {
    /// 1-indexed page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageError::RenderFailed { page, .. }
            | PageError::RequestFailed { page, .. }
            | PageError::ParseFailed { page, .. } => *page,
        }
    }
}
