//! Result types produced by an extraction run.

use crate::error::PageError;
use crate::question::Question;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Questions extracted from one page, keyed by 1-indexed page number.
///
/// Entries are replaced whole when a page settles; completion order is
/// irrelevant, always look pages up by number.
pub type ExtractionResult = BTreeMap<usize, PageResult>;

/// Outcome of one page.
///
/// A failed page still has an (empty) question list, so consumers that only
/// care about questions never need to branch on `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number.
    pub page_num: usize,
    pub questions: Vec<Question>,
    /// Set when the page failed rather than genuinely containing nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PageError>,
    /// Wall-clock time spent on this page's request.
    pub duration_ms: u64,
}

impl PageResult {
    pub fn extracted(page_num: usize, questions: Vec<Question>, duration_ms: u64) -> Self {
        Self {
            page_num,
            questions,
            error: None,
            duration_ms,
        }
    }

    pub fn failed(error: PageError, duration_ms: u64) -> Self {
        Self {
            page_num: error.page(),
            questions: Vec::new(),
            error: Some(error),
            duration_ms,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn mcq_count(&self) -> usize {
        self.questions.iter().filter(|q| q.is_mcq()).count()
    }
}

/// Aggregate numbers for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_pages: usize,
    pub total_questions: usize,
    pub mcq_questions: usize,
    pub failed_pages: usize,
    pub elapsed_ms: u64,
}

/// Everything the eager [`crate::extract::extract_questions`] call returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// File name of the source PDF (the local cache key).
    pub file_name: String,
    pub model: String,
    /// Pages in ascending page order.
    pub pages: Vec<PageResult>,
    pub summary: RunSummary,
    /// Pre-run cost estimate in USD; 0 when the model's pricing is unknown.
    pub estimated_cost: f64,
}

impl ExtractionOutput {
    /// Questions of all pages, in page order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.pages.iter().flat_map(|p| p.questions.iter())
    }

    /// Page number → question list, the shape stored by the local cache.
    pub fn question_map(&self) -> BTreeMap<usize, Vec<Question>> {
        self.pages
            .iter()
            .map(|p| (p.page_num, p.questions.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::OpenQuestion;

    #[test]
    fn failed_page_takes_number_from_error() {
        let r = PageResult::failed(
            PageError::RenderFailed {
                page: 4,
                detail: "bad xref".into(),
            },
            12,
        );
        assert_eq!(r.page_num, 4);
        assert!(r.questions.is_empty());
        assert!(r.is_failed());
    }

    #[test]
    fn error_field_omitted_for_successful_pages() {
        let r = PageResult::extracted(
            1,
            vec![Question::Other(OpenQuestion {
                question: "Why?".into(),
                explanation: None,
            })],
            5,
        );
        let v = serde_json::to_value(&r).unwrap();
        assert!(v.get("error").is_none());
        assert_eq!(r.mcq_count(), 0);
    }
}
