//! Local result cache: extracted questions keyed by source file name.
//!
//! Each PDF gets one JSON file, `questions_<file name>.json`, mapping page
//! number to that page's question array. Re-opening the same file shows the
//! previous extraction without paying for it again. Writes go to a temp file
//! first and are renamed into place, so an interrupted save never leaves a
//! half-written cache entry.

use crate::error::Pdf2QuizError;
use crate::question::Question;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Stored shape: page number → questions.
pub type StoredQuestions = BTreeMap<usize, Vec<Question>>;

/// Question counts for one cached file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheSummary {
    pub total_questions: usize,
    pub mcq_count: usize,
}

impl CacheSummary {
    pub fn of(stored: &StoredQuestions) -> Self {
        let all = || stored.values().flatten();
        Self {
            total_questions: all().count(),
            mcq_count: all().filter(|q| q.is_mcq()).count(),
        }
    }
}

/// Directory-backed cache of extraction results.
#[derive(Debug, Clone)]
pub struct ResultStore {
    dir: PathBuf,
}

impl ResultStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<platform cache dir>/pdf2quiz`, falling back to the temp dir.
    pub fn default_location() -> Self {
        let base = dirs::cache_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
            .unwrap_or_else(std::env::temp_dir);
        Self::new(base.join("pdf2quiz"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file for `file_name`.
    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.dir.join(format!("questions_{}.json", sanitize(file_name)))
    }

    /// Replace the cached questions for `file_name`.
    pub async fn save(&self, file_name: &str, questions: &StoredQuestions) -> Result<PathBuf, Pdf2QuizError> {
        let path = self.path_for(file_name);
        let storage_err = |detail: String| Pdf2QuizError::Storage {
            path: path.clone(),
            detail,
        };

        let json = serde_json::to_vec_pretty(questions).map_err(|e| storage_err(e.to_string()))?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| storage_err(e.to_string()))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| Pdf2QuizError::OutputWriteFailed {
                path: tmp.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Pdf2QuizError::OutputWriteFailed {
                path: path.clone(),
                source: e,
            })?;

        info!("Saved {} pages of questions to {}", questions.len(), path.display());
        Ok(path)
    }

    /// Cached questions for `file_name`; `None` when nothing is cached.
    pub async fn load(&self, file_name: &str) -> Result<Option<StoredQuestions>, Pdf2QuizError> {
        let path = self.path_for(file_name);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cached questions at {}", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(Pdf2QuizError::Storage {
                    path,
                    detail: e.to_string(),
                })
            }
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Pdf2QuizError::Storage {
                path,
                detail: format!("corrupt cache entry: {e}"),
            })
    }

    /// Counts for the dashboard; zeros when nothing is cached.
    pub async fn summary(&self, file_name: &str) -> Result<CacheSummary, Pdf2QuizError> {
        Ok(self
            .load(file_name)
            .await?
            .map(|stored| CacheSummary::of(&stored))
            .unwrap_or_default())
    }

    /// Drop the cache entry; missing entries are not an error.
    pub async fn remove(&self, file_name: &str) -> Result<(), Pdf2QuizError> {
        let path = self.path_for(file_name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Pdf2QuizError::Storage {
                path,
                detail: e.to_string(),
            }),
        }
    }
}

/// Keep file names usable as a single path component.
fn sanitize(file_name: &str) -> String {
    file_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}
