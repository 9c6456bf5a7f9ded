//! Input resolution: normalise a user-supplied path or URL to a local file
//! and classify it as PDF or plain text.
//!
//! URL inputs are downloaded into a `TempDir` that lives as long as the
//! returned [`ResolvedInput`], because pdfium needs a file-system path.
//! Classification looks at the `%PDF` magic bytes, not the extension.

use crate::error::MindMapError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// What kind of document the input is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    /// Anything else; decoded as UTF-8 later.
    Text,
}

/// The resolved input: either a local path or a downloaded temp file.
pub enum ResolvedInput {
    /// Input was already a local file.
    Local { path: PathBuf, kind: InputKind },
    /// Input was a URL; the body was saved in a temp directory that is kept
    /// alive until processing completes.
    Downloaded {
        path: PathBuf,
        kind: InputKind,
        _temp_dir: TempDir,
    },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local { path, .. } => path,
            ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            ResolvedInput::Local { kind, .. } => *kind,
            ResolvedInput::Downloaded { kind, .. } => *kind,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Classify a document by its first bytes.
pub fn detect_kind(head: &[u8]) -> InputKind {
    if head.starts_with(PDF_MAGIC) {
        InputKind::Pdf
    } else {
        InputKind::Text
    }
}

/// Resolve the input string to a local file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, MindMapError> {
    if input.trim().is_empty() {
        return Err(MindMapError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

fn resolve_local(path_str: &str) -> Result<ResolvedInput, MindMapError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(MindMapError::FileNotFound { path });
    }

    let kind = match std::fs::File::open(&path) {
        Ok(f) => {
            let mut head = Vec::with_capacity(PDF_MAGIC.len());
            f.take(PDF_MAGIC.len() as u64)
                .read_to_end(&mut head)
                .map_err(|e| MindMapError::Internal(format!("Failed to read '{}': {e}", path.display())))?;
            detect_kind(&head)
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(MindMapError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(MindMapError::FileNotFound { path });
        }
    };

    debug!("Resolved local input: {} ({:?})", path.display(), kind);
    Ok(ResolvedInput::Local { path, kind })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, MindMapError> {
    info!("Downloading course document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| MindMapError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            MindMapError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            MindMapError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(MindMapError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| MindMapError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let kind = detect_kind(&bytes);
    let temp_dir = TempDir::new().map_err(|e| MindMapError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(filename_from_url(url, kind));

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| MindMapError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        kind,
        _temp_dir: temp_dir,
    })
}

/// Last URL path segment when it looks like a file name, else a fallback
/// matching the detected kind.
fn filename_from_url(url: &str, kind: InputKind) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    match kind {
        InputKind::Pdf => "downloaded.pdf".to_string(),
        InputKind::Text => "downloaded.txt".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/course.pdf"));
        assert!(is_url("http://example.com/course.pdf"));
        assert!(!is_url("/tmp/course.pdf"));
        assert!(!is_url("course.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn detect_kind_by_magic() {
        assert_eq!(detect_kind(b"%PDF-1.7 ..."), InputKind::Pdf);
        assert_eq!(detect_kind(b"Module 1: Intro"), InputKind::Text);
        assert_eq!(detect_kind(b""), InputKind::Text);
    }

    #[test]
    fn filename_fallbacks() {
        assert_eq!(
            filename_from_url("https://example.com/files/lean.pdf", InputKind::Pdf),
            "lean.pdf"
        );
        assert_eq!(
            filename_from_url("https://example.com/download", InputKind::Text),
            "downloaded.txt"
        );
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let r = resolve_input("/definitely/not/a/real/course.pdf", 5).await;
        assert!(matches!(r, Err(MindMapError::FileNotFound { .. })));
    }

    #[tokio::test]
    async fn blank_input_is_invalid() {
        let r = resolve_input("  ", 5).await;
        assert!(matches!(r, Err(MindMapError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn local_text_file_resolves_as_text() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(f, "Module 1: Basics\nHello").unwrap();
        let resolved = resolve_input(f.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.kind(), InputKind::Text);
        assert_eq!(resolved.path(), f.path());
    }
}
