//! PDF rasterisation: open a [`Document`] and render pages to [`PageImage`]s.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and blocks while rendering. Every pdfium call runs on tokio's
//! blocking pool so the runtime threads keep polling in-flight extraction
//! requests.
//!
//! ## Why a fixed scale?
//!
//! Pages are rendered at [`RENDER_SCALE`] (2× the PDF's point size). At 1×
//! small answer labels and subscripts blur; above 2× payloads grow past what
//! the upstream APIs accept comfortably without improving recognition.

use crate::error::{PageError, Pdf2QuizError};
use crate::orchestrator::PageSource;
use crate::pipeline::encode::{encode_page, PageImage};
use pdfium_render::prelude::*;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Render scale relative to the page's natural size.
pub const RENDER_SCALE: f32 = 2.0;

/// An opened PDF, held in memory for the duration of one extraction run.
#[derive(Clone)]
pub struct Document {
    bytes: Arc<Vec<u8>>,
    file_name: String,
    password: Option<String>,
    page_count: usize,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .field("page_count", &self.page_count)
            .finish()
    }
}

impl Document {
    /// Validate `bytes` with pdfium and record the page count.
    pub async fn open(
        bytes: Vec<u8>,
        file_name: impl Into<String>,
        password: Option<String>,
    ) -> Result<Document, Pdf2QuizError> {
        let bytes = Arc::new(bytes);
        let file_name = file_name.into();

        let (b, name, pwd) = (Arc::clone(&bytes), file_name.clone(), password.clone());
        let page_count = tokio::task::spawn_blocking(move || {
            count_pages_blocking(&b, &name, pwd.as_deref())
        })
        .await
        .map_err(|e| Pdf2QuizError::Internal(format!("Open task panicked: {}", e)))??;

        if page_count == 0 {
            return Err(Pdf2QuizError::EmptyDocument { name: file_name });
        }
        info!("PDF '{}' loaded: {} pages", file_name, page_count);

        Ok(Document {
            bytes,
            file_name,
            password,
            page_count,
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// File name of the source, used as the local cache key.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Render a single 1-indexed page.
pub async fn rasterize(doc: &Document, page_num: usize, scale: f32) -> Result<PageImage, PageError> {
    if page_num == 0 || page_num > doc.page_count {
        return Err(PageError::RenderFailed {
            page: page_num,
            detail: format!("page out of range (document has {} pages)", doc.page_count),
        });
    }
    render_pages(doc, vec![page_num], scale)
        .await
        .pop()
        .unwrap_or_else(|| {
            Err(PageError::RenderFailed {
                page: page_num,
                detail: "page was not rendered".to_string(),
            })
        })
}

/// Render every page in ascending order.
///
/// The returned vector has exactly `page_count` entries; entry `i` belongs to
/// page `i + 1`. A page that cannot be rendered fails alone.
pub async fn rasterize_all(doc: &Document, scale: f32) -> Vec<Result<PageImage, PageError>> {
    render_pages(doc, (1..=doc.page_count).collect(), scale).await
}

/// Render `pages` (1-indexed, in range) on the blocking pool, one result per
/// requested page.
async fn render_pages(doc: &Document, pages: Vec<usize>, scale: f32) -> Vec<Result<PageImage, PageError>> {
    let bytes = Arc::clone(&doc.bytes);
    let password = doc.password.clone();
    let requested = pages.clone();

    tokio::task::spawn_blocking(move || {
        render_pages_blocking(&bytes, password.as_deref(), &pages, scale)
    })
    .await
    .unwrap_or_else(|e| fail_pages(&requested, &format!("render task panicked: {}", e)))
}

fn fail_pages(pages: &[usize], detail: &str) -> Vec<Result<PageImage, PageError>> {
    pages
        .iter()
        .map(|&page| {
            Err(PageError::RenderFailed {
                page,
                detail: detail.to_string(),
            })
        })
        .collect()
}

impl PageSource for Document {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn rasterize_pages(
        &self,
        scale: f32,
    ) -> impl Future<Output = Vec<Result<PageImage, PageError>>> + Send {
        rasterize_all(self, scale)
    }
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the working directory, then
/// the system library path.
pub fn bind_pdfium() -> Result<Pdfium, Pdf2QuizError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| Pdf2QuizError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn render_config(scale: f32) -> PdfRenderConfig {
    PdfRenderConfig::new().scale_page_by_factor(scale)
}

fn count_pages_blocking(
    bytes: &[u8],
    name: &str,
    password: Option<&str>,
) -> Result<usize, Pdf2QuizError> {
    let pdfium = bind_pdfium()?;
    let document = pdfium.load_pdf_from_byte_slice(bytes, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                Pdf2QuizError::WrongPassword { name: name.to_string() }
            } else {
                Pdf2QuizError::PasswordRequired { name: name.to_string() }
            }
        } else {
            Pdf2QuizError::CorruptPdf {
                name: name.to_string(),
                detail: err_str,
            }
        }
    })?;
    Ok(document.pages().len() as usize)
}

fn render_pages_blocking(
    bytes: &[u8],
    password: Option<&str>,
    pages: &[usize],
    scale: f32,
) -> Vec<Result<PageImage, PageError>> {
    let pdfium = match bind_pdfium() {
        Ok(p) => p,
        Err(e) => return fail_pages(pages, &e.to_string()),
    };
    let document = match pdfium.load_pdf_from_byte_slice(bytes, password) {
        Ok(d) => d,
        Err(e) => return fail_pages(pages, &format!("{:?}", e)),
    };

    let config = render_config(scale);
    pages
        .iter()
        .map(|&page_num| {
            let result = render_page(&document, page_num, &config);
            if let Err(ref e) = result {
                warn!("{}", e);
            }
            result
        })
        .collect()
}

fn render_page(
    document: &PdfDocument<'_>,
    page_num: usize,
    config: &PdfRenderConfig,
) -> Result<PageImage, PageError> {
    let failed = |detail: String| PageError::RenderFailed {
        page: page_num,
        detail,
    };

    let page = document
        .pages()
        .get((page_num - 1) as u16)
        .map_err(|e| failed(format!("{:?}", e)))?;

    let bitmap = page
        .render_with_config(config)
        .map_err(|e| failed(format!("{:?}", e)))?;

    let image = bitmap.as_image();
    debug!(
        "Rendered page {} → {}x{} px",
        page_num,
        image.width(),
        image.height()
    );

    encode_page(page_num, &image).map_err(|e| failed(format!("PNG encoding failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_page_doc() -> Document {
        Document {
            bytes: Arc::new(Vec::new()),
            file_name: "two.pdf".into(),
            password: None,
            page_count: 2,
        }
    }

    #[tokio::test]
    async fn out_of_range_pages_fail_without_rendering() {
        let doc = two_page_doc();
        for page in [0, 3] {
            match rasterize(&doc, page, RENDER_SCALE).await {
                Err(PageError::RenderFailed { page: p, detail }) => {
                    assert_eq!(p, page);
                    assert!(detail.contains("out of range"), "{detail}");
                }
                other => panic!("expected RenderFailed, got {other:?}"),
            }
        }
    }

    #[test]
    fn failed_pages_keep_their_numbers() {
        let results = fail_pages(&[2, 5], "no pdfium");
        let pages: Vec<usize> = results
            .iter()
            .map(|r| r.as_ref().map_err(PageError::page).unwrap_err())
            .collect();
        assert_eq!(pages, vec![2, 5]);
    }
}
