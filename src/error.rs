//! Typed failures for loading, generating and formatting a quiz.
//!
//! `Display` carries the full detail for logs. `user_message` is the reduced
//! text a person sees in the browser.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum QuizError {
    #[error("Unsupported file format for '{filename}': only PDF and TXT files are supported")]
    UnsupportedFormat { filename: String },

    #[error("Error reading document '{filename}': {reason}")]
    DocumentRead { filename: String, reason: String },

    #[error("Model call failed (model: {model}): {message}")]
    ModelInvocation { model: String, message: String },

    #[error("Model returned malformed quiz JSON: {reason}")]
    MalformedQuizJson { reason: String, raw: String },

    #[error("Quiz could not be formatted as a table: {0}")]
    Formatting(String),

    #[error("Invalid quiz request: {0}")]
    InvalidRequest(String),

    #[error("Upload exceeds the {limit}-byte limit")]
    UploadTooLarge { limit: usize },
}

impl QuizError {
    pub fn error_code(&self) -> &'static str {
        match self {
            QuizError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            QuizError::DocumentRead { .. } => "DOCUMENT_READ_ERROR",
            QuizError::ModelInvocation { .. } => "MODEL_INVOCATION_ERROR",
            QuizError::MalformedQuizJson { .. } => "MALFORMED_QUIZ_JSON",
            QuizError::Formatting(_) => "FORMATTING_ERROR",
            QuizError::InvalidRequest(_) => "INVALID_REQUEST",
            QuizError::UploadTooLarge { .. } => "UPLOAD_TOO_LARGE",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            QuizError::UnsupportedFormat { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            QuizError::DocumentRead { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            QuizError::ModelInvocation { .. } => StatusCode::BAD_GATEWAY,
            QuizError::MalformedQuizJson { .. } => StatusCode::BAD_GATEWAY,
            QuizError::Formatting(_) => StatusCode::INTERNAL_SERVER_ERROR,
            QuizError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            QuizError::UploadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Message safe to show to the person who uploaded the document.
    /// Never includes model names, HTTP bodies or decoder internals.
    pub fn user_message(&self) -> String {
        match self {
            QuizError::UnsupportedFormat { .. } => {
                "Unsupported file format. Only PDF and TXT files are supported.".into()
            }
            QuizError::DocumentRead { .. } => {
                "Error reading the file. It might be corrupted or password-protected.".into()
            }
            QuizError::ModelInvocation { .. } => {
                "The quiz service is unavailable right now. Please try again later.".into()
            }
            QuizError::MalformedQuizJson { .. } => {
                "Failed to parse the generated quiz. The model might have returned malformed JSON."
                    .into()
            }
            QuizError::Formatting(_) => "The generated quiz could not be displayed as a table.".into(),
            // Validation messages describe the caller's own input.
            QuizError::InvalidRequest(msg) => msg.clone(),
            QuizError::UploadTooLarge { limit } => format!(
                "The uploaded file is too large. The limit is {}.",
                human_size(*limit)
            ),
        }
    }

    /// Raw model text attached to the failure, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            QuizError::MalformedQuizJson { raw, .. } => Some(raw),
            _ => None,
        }
    }

    pub fn model_invocation(model: impl Into<String>, message: impl Into<String>) -> Self {
        QuizError::ModelInvocation {
            model: model.into(),
            message: message.into(),
        }
    }

    pub fn document_read(filename: impl Into<String>, reason: impl ToString) -> Self {
        QuizError::DocumentRead {
            filename: filename.into(),
            reason: reason.to_string(),
        }
    }
}

pub type QuizResult<T> = Result<T, QuizError>;

fn human_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else if bytes >= 1024 && bytes % 1024 == 0 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{bytes} bytes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_and_unreadable_messages_differ() {
        let unsupported = QuizError::UnsupportedFormat {
            filename: "notes.docx".into(),
        };
        let unreadable = QuizError::document_read("notes.pdf", "invalid xref");

        assert_ne!(unsupported.user_message(), unreadable.user_message());
        assert!(unsupported.to_string().contains("Unsupported file format"));
        assert!(unreadable.to_string().contains("Error reading document 'notes.pdf'"));
        assert_eq!(unsupported.error_code(), "UNSUPPORTED_FORMAT");
        assert_eq!(unreadable.error_code(), "DOCUMENT_READ_ERROR");
    }

    #[test]
    fn user_message_hides_model_detail() {
        let err = QuizError::model_invocation("gemini-1.5-flash", "HTTP 401: API key not valid");
        assert!(err.to_string().contains("API key not valid"));
        assert!(!err.user_message().contains("API key"));
        assert!(!err.user_message().contains("gemini"));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn malformed_json_keeps_raw_output() {
        let err = QuizError::MalformedQuizJson {
            reason: "expected value at line 1 column 1".into(),
            raw: "Sure! Here is your quiz".into(),
        };
        assert_eq!(err.raw_output(), Some("Sure! Here is your quiz"));
        assert_eq!(QuizError::Formatting("x".into()).raw_output(), None);
    }

    #[test]
    fn status_codes() {
        assert_eq!(
            QuizError::InvalidRequest("number must be at least 1".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            QuizError::UnsupportedFormat { filename: "a.doc".into() }.status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            QuizError::document_read("a.pdf", "bad").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            QuizError::UploadTooLarge { limit: 1024 }.status_code(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn too_large_message_names_the_limit() {
        let msg = QuizError::UploadTooLarge { limit: 10 * 1024 * 1024 }.user_message();
        assert!(msg.contains("too large"), "{msg}");
        assert!(msg.contains("10 MiB"), "{msg}");
        assert!(QuizError::UploadTooLarge { limit: 1024 }.user_message().contains("1 KiB"));
        assert!(QuizError::UploadTooLarge { limit: 1500 }.user_message().contains("1500 bytes"));
    }
}
