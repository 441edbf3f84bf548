//! Document loader: uploaded bytes + filename → plain text.
//!
//! Supported: `.pdf` (per-page text via lopdf) and `.txt` (UTF-8).
//! The input is never modified.

use std::fmt::Display;
use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::error::{QuizError, QuizResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
  Pdf,
  Text,
}

impl DocumentKind {
  /// Pick the decoder from the extension (case-insensitive).
  pub fn from_filename(filename: &str) -> QuizResult<Self> {
    let ext = Path::new(filename)
      .extension()
      .and_then(|e| e.to_str())
      .unwrap_or_default();
    if ext.eq_ignore_ascii_case("pdf") {
      Ok(DocumentKind::Pdf)
    } else if ext.eq_ignore_ascii_case("txt") {
      Ok(DocumentKind::Text)
    } else {
      Err(QuizError::UnsupportedFormat { filename: filename.to_string() })
    }
  }
}

/// Extract the text of an uploaded document.
#[instrument(level = "info", skip(filename, bytes), fields(%filename, size = bytes.len()))]
pub fn read_document(filename: &str, bytes: &[u8]) -> QuizResult<String> {
  let text = match DocumentKind::from_filename(filename)? {
    DocumentKind::Pdf => read_pdf(filename, bytes)?,
    DocumentKind::Text => std::str::from_utf8(bytes)
      .map_err(|e| QuizError::document_read(filename, format!("not valid UTF-8 text: {e}")))?
      .to_string(),
  };
  debug!(target: "quizsmith", %filename, text_len = text.len(), "Document text extracted");
  Ok(text)
}

/// Same as `read_document`, off the async runtime. PDF decoding is CPU bound.
pub async fn read_document_blocking(filename: String, bytes: Vec<u8>) -> QuizResult<String> {
  let name = filename.clone();
  tokio::task::spawn_blocking(move || read_document(&filename, &bytes))
    .await
    .map_err(|e| QuizError::document_read(name, format!("decoder task failed: {e}")))?
}

fn read_pdf(filename: &str, bytes: &[u8]) -> QuizResult<String> {
  let doc = lopdf::Document::load_mem(bytes).map_err(|e| {
    warn!(target: "quizsmith", %filename, error = %e, "Error reading PDF file");
    QuizError::document_read(filename, e)
  })?;
  if doc.is_encrypted() {
    return Err(QuizError::document_read(filename, "document is encrypted"));
  }

  let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
  debug!(target: "quizsmith", %filename, pages = page_numbers.len(), "PDF parsed");
  Ok(concat_pages(
    page_numbers.into_iter().map(|n| (n, doc.extract_text(&[n]))),
  ))
}

/// Join page texts in page order. A page whose text cannot be extracted
/// contributes an empty string.
fn concat_pages<I, E>(pages: I) -> String
where
  I: IntoIterator<Item = (u32, Result<String, E>)>,
  E: Display,
{
  let mut out = String::new();
  for (page, text) in pages {
    match text {
      Ok(t) => out.push_str(&t),
      Err(e) => debug!(target: "quizsmith", page, error = %e, "No extractable text on page"),
    }
  }
  out
}
