//! Raw text extraction from uploaded resume files.
//!
//! Extraction never fails the upload: unreadable files yield a placeholder
//! string and the pipeline works with whatever text it gets.

use std::panic;
use std::path::Path;

use tracing::{error, info};

/// Extracts text from a resume. CPU-bound for PDFs, so call it via `spawn_blocking`.
pub fn extract_resume_text(bytes: &[u8], filename: &str) -> String {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        // The PDF parser panics on some malformed inputs; treat that like a parse error.
        Some("pdf") => match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
            Ok(Ok(text)) => {
                info!("Extracted {} chars from PDF {filename}", text.len());
                text
            }
            Ok(Err(e)) => {
                error!("PDF parser error for {filename}: {e}");
                format!("[Error parsing file: {filename}]")
            }
            Err(_) => {
                error!("PDF parser panicked on {filename}");
                format!("[Error parsing file: {filename}]")
            }
        },
        Some("txt") | Some("md") => String::from_utf8_lossy(bytes).into_owned(),
        _ => format!("[File content for {filename}]"),
    }
}

/// Replaces every character outside `[A-Za-z0-9.]` with `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
