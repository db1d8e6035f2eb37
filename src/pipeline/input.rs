//! Input resolution: load a user-supplied path or URL into memory.
//!
//! Uploaded study material lives in object storage and reaches us as a public
//! blob URL; local runs pass a file path. Either way the whole PDF is read
//! into memory (pdfium can open a byte slice) and its file name is kept as
//! the key for the local result cache. The `%PDF` magic is checked up front
//! so callers get a clear error instead of a pdfium parse failure.

use crate::error::Pdf2QuizError;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// PDF bytes plus the name they are cached under.
#[derive(Debug, Clone)]
pub struct SourcePdf {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a local PDF or download one from an HTTP(S) URL.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<SourcePdf, Pdf2QuizError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Pdf2QuizError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<SourcePdf, Pdf2QuizError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => Pdf2QuizError::PermissionDenied { path: path.clone() },
        _ => Pdf2QuizError::FileNotFound { path: path.clone() },
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());

    check_magic(&file_name, &bytes)?;
    debug!("Read local PDF '{}' ({} bytes)", path.display(), bytes.len());

    Ok(SourcePdf { file_name, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<SourcePdf, Pdf2QuizError> {
    info!("Downloading PDF from: {}", url);

    let download_failed = |reason: String| Pdf2QuizError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| download_failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Pdf2QuizError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            download_failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(download_failed(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_failed(e.to_string()))?
        .to_vec();

    let file_name = file_name_from_url(url);
    check_magic(&file_name, &bytes)?;
    info!("Downloaded '{}' ({} bytes)", file_name, bytes.len());

    Ok(SourcePdf { file_name, bytes })
}

/// Last path segment of the URL when it looks like a file name.
pub fn file_name_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty() && last.contains('.'))
        .unwrap_or_else(|| "downloaded.pdf".to_string())
}

fn check_magic(name: &str, bytes: &[u8]) -> Result<(), Pdf2QuizError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(Pdf2QuizError::NotAPdf {
            name: name.to_string(),
            magic,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://bucket.example/pdfs/exam.pdf"));
        assert!(is_url("http://localhost/exam.pdf"));
        assert!(!is_url("/tmp/exam.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn file_name_comes_from_last_segment() {
        assert_eq!(
            file_name_from_url("https://x.supabase.co/storage/v1/object/public/pdfs/1700_bio.pdf"),
            "1700_bio.pdf"
        );
        assert_eq!(file_name_from_url("https://example.com/"), "downloaded.pdf");
        assert_eq!(file_name_from_url("not a url"), "downloaded.pdf");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = resolve_input("/definitely/not/here.pdf", 5).await.unwrap_err();
        assert!(matches!(err, Pdf2QuizError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn non_pdf_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04 zip, not pdf").unwrap();
        let err = resolve_input(f.path().to_str().unwrap(), 5).await.unwrap_err();
        match err {
            Pdf2QuizError::NotAPdf { magic, .. } => assert_eq!(&magic, b"PK\x03\x04"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn local_pdf_keeps_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chem_midterm.pdf");
        std::fs::write(&path, b"%PDF-1.7\n%stub").unwrap();
        let src = resolve_input(path.to_str().unwrap(), 5).await.unwrap();
        assert_eq!(src.file_name, "chem_midterm.pdf");
        assert!(src.bytes.starts_with(b"%PDF"));
    }
}
