//! Public JSON shapes returned by the HTTP endpoints (serde ready).
//! Keep this small and stable so the static page can evolve independently.

use serde::Serialize;
use serde_json::Value;

use crate::domain::TableRow;
use crate::error::QuizError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    Ok,
    /// The model answered but nothing could be tabulated. The raw text is
    /// still handed back for display.
    Degraded,
}

/// Body of a `POST /api/v1/quiz` answer (success or degraded).
#[derive(Debug, Serialize)]
pub struct QuizOut {
    pub request_id: String,
    pub status: QuizStatus,
    pub quiz: Option<Value>,
    pub rows: Vec<TableRow>,
    pub review: Option<String>,
    pub raw_output: Option<String>,
    pub message: Option<String>,
}

impl QuizOut {
    /// Degraded answer for stage-1 output that is not a quiz object.
    pub fn malformed(request_id: String, err: &QuizError) -> Self {
        Self {
            request_id,
            status: QuizStatus::Degraded,
            quiz: None,
            rows: Vec::new(),
            review: None,
            raw_output: err.raw_output().map(str::to_string),
            message: Some(err.user_message()),
        }
    }
}

/// Body of every other failure.
#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub request_id: String,
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub model_enabled: bool,
}
