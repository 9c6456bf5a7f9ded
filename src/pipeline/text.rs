//! Text extraction: turn a resolved input into one plain-text string.
//!
//! PDFs go through pdfium's text layer on a blocking thread (pdfium is not
//! async-safe). Page texts are joined with a newline and pages with no text
//! are skipped, so scanned pages without a text layer simply contribute
//! nothing. Any other file is read as UTF-8.

use crate::error::MindMapError;
use crate::pipeline::input::{InputKind, ResolvedInput};
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Environment variable naming an explicit pdfium library file.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Extract the full text of `input`.
pub async fn extract_text(
    input: &ResolvedInput,
    password: Option<&str>,
) -> Result<String, MindMapError> {
    let path = input.path().to_path_buf();

    match input.kind() {
        InputKind::Text => {
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| read_error(e, &path))?;
            String::from_utf8(bytes).map_err(|_| MindMapError::NotText { path })
        }
        InputKind::Pdf => {
            let pwd = password.map(|s| s.to_string());
            tokio::task::spawn_blocking(move || extract_pdf_text_blocking(&path, pwd.as_deref()))
                .await
                .map_err(|e| MindMapError::Internal(format!("Text extraction task panicked: {}", e)))?
        }
    }
}

fn read_error(err: std::io::Error, path: &Path) -> MindMapError {
    match err.kind() {
        std::io::ErrorKind::NotFound => MindMapError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => MindMapError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => MindMapError::Internal(format!("Failed to read '{}': {err}", path.display())),
    }
}

/// Bind pdfium from `PDFIUM_LIB_PATH` when set, else from the system.
fn bind_pdfium() -> Result<Pdfium, MindMapError> {
    let bindings = match std::env::var(PDFIUM_LIB_PATH_ENV) {
        Ok(lib) if !lib.is_empty() => Pdfium::bind_to_library(&lib),
        _ => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| MindMapError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn extract_pdf_text_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<String, MindMapError> {
    let pdfium = bind_pdfium()?;

    let document = pdfium.load_pdf_from_file(pdf_path, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                MindMapError::WrongPassword {
                    path: pdf_path.to_path_buf(),
                }
            } else {
                MindMapError::PasswordRequired {
                    path: pdf_path.to_path_buf(),
                }
            }
        } else {
            MindMapError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: err_str,
            }
        }
    })?;

    let pages = document.pages();
    info!("PDF loaded: {} pages", pages.len());

    let mut texts = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| MindMapError::TextExtractionFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?
            .all();

        if text.trim().is_empty() {
            debug!("Page {}: no text layer, skipped", idx + 1);
            continue;
        }
        debug!("Page {}: {} chars", idx + 1, text.len());
        texts.push(text);
    }

    Ok(join_page_texts(&texts))
}

fn join_page_texts<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}
