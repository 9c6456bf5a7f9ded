//! Error types for the edgequake-mindmap library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`MindMapError`]: fatal, the run cannot proceed at all (bad input
//!   file, unreadable PDF, provider not configured, customisation failed).
//!   Returned as `Err(MindMapError)` from the top-level `generate*` functions.
//!
//! * [`ExtractionFailure`]: non-fatal, one chunk's mind map could not be
//!   produced (no JSON in the reply, malformed JSON, transport error) but all
//!   other chunks are fine. Stored inside [`crate::output::ChunkOutcome`] so
//!   one bad module never costs the caller the rest of the course.
//!
//! * [`CompletionError`]: the failure reported by a
//!   [`crate::completion::TextCompletion`] implementation. The extractor
//!   converts it into [`ExtractionFailure::UpstreamError`], keeping the detail.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-mindmap library.
#[derive(Debug, Error)]
pub enum MindMapError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file is neither a PDF nor UTF-8 text.
    #[error("File '{path}' is neither a PDF nor UTF-8 text")]
    NotText { path: PathBuf },

    /// Text extraction produced nothing to work with.
    #[error("No text could be extracted from '{source_name}'")]
    EmptyInput { source_name: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install libpdfium system-wide or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    /// pdfium returned an error while reading a page's text layer.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The course customisation call failed after all retries.
    #[error("Course customisation failed after {retries} retries: {detail}")]
    CustomizationFailed { retries: u32, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output artefact.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An artefact could not be serialised to JSON.
    #[error("Failed to serialise '{what}': {detail}")]
    Serialization { what: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a single chunk produced no usable mind map.
///
/// The first four variants mirror what can go wrong between the prompt and
/// the graph; [`ExtractionFailure::InvalidGraphReferences`] is raised only
/// under [`crate::config::ReferencePolicy::Strict`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExtractionFailure {
    /// The reply contained no `{ … }` span.
    #[error("no JSON object found in the model reply")]
    NoJsonFound,

    /// A `{ … }` span was found but did not parse into the expected shape.
    #[error("malformed JSON in the model reply: {detail}")]
    MalformedJson { detail: String },

    /// The JSON object lacks `nodes` and/or `edges`.
    #[error("model reply is missing required keys: {}", .missing.join(", "))]
    MissingRequiredKeys { missing: Vec<String> },

    /// The completion call itself failed (network, auth, quota, timeout).
    #[error("completion service error: {detail}")]
    UpstreamError { detail: String },

    /// The graph repeats node ids or has edges pointing at unknown nodes.
    #[error(
        "graph has {} duplicate node id(s) and {} dangling edge(s)",
        .duplicate_ids.len(),
        .dangling_edges.len()
    )]
    InvalidGraphReferences {
        duplicate_ids: Vec<String>,
        /// `(from, to)` pairs of the offending edges.
        dangling_edges: Vec<(String, String)>,
    },
}

impl ExtractionFailure {
    /// Whether retrying the same prompt could plausibly succeed.
    ///
    /// Only transport-level failures qualify; a reply the model already got
    /// wrong is reported, not silently re-requested.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExtractionFailure::UpstreamError { .. })
    }
}

/// Error reported by a [`crate::completion::TextCompletion`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompletionError {
    /// Human-readable detail, preserved for display.
    pub message: String,
}

impl CompletionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_display_lists_keys() {
        let e = ExtractionFailure::MissingRequiredKeys {
            missing: vec!["edges".into()],
        };
        assert!(e.to_string().contains("edges"), "got: {e}");
    }

    #[test]
    fn invalid_references_display_counts() {
        let e = ExtractionFailure::InvalidGraphReferences {
            duplicate_ids: vec!["a".into()],
            dangling_edges: vec![("a".into(), "zz".into()), ("b".into(), "yy".into())],
        };
        let msg = e.to_string();
        assert!(msg.contains("1 duplicate"), "got: {msg}");
        assert!(msg.contains("2 dangling"), "got: {msg}");
    }

    #[test]
    fn only_upstream_errors_are_retryable() {
        assert!(ExtractionFailure::UpstreamError {
            detail: "503".into()
        }
        .is_retryable());
        assert!(!ExtractionFailure::NoJsonFound.is_retryable());
        assert!(!ExtractionFailure::MalformedJson {
            detail: "eof".into()
        }
        .is_retryable());
    }

    #[test]
    fn failure_serialises_with_reason_tag() {
        let json = serde_json::to_string(&ExtractionFailure::NoJsonFound).unwrap();
        assert_eq!(json, r#"{"reason":"no_json_found"}"#);
    }

    #[test]
    fn customization_failed_display() {
        let e = MindMapError::CustomizationFailed {
            retries: 3,
            detail: "quota exceeded".into(),
        };
        assert!(e.to_string().contains("3 retries"));
        assert!(e.to_string().contains("quota exceeded"));
    }
}
