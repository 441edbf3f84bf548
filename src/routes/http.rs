//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented; failures are answered with a reduced message.

use std::sync::Arc;

use axum::{
  extract::{multipart::MultipartError, Multipart, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{QuizError, QuizResult};
use crate::logic::{produce_quiz, QuizForm};
use crate::protocol::{ErrorOut, HealthOut};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, model_enabled: state.openai.is_some() })
}

#[instrument(level = "info", skip(state, multipart), fields(request_id = tracing::field::Empty))]
pub async fn http_post_quiz(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
  let request_id = Uuid::new_v4().to_string();
  tracing::Span::current().record("request_id", request_id.as_str());

  let Some(oa) = &state.openai else {
    warn!(target: "quizsmith", %request_id, "Quiz requested but no model service is configured");
    return error_response(
      StatusCode::SERVICE_UNAVAILABLE,
      request_id,
      "Quiz generation is not configured on this server (missing model API key).".into(),
    );
  };

  let form = match read_quiz_form(multipart, state.limits.max_upload_bytes).await {
    Ok(f) => f,
    Err(e) => {
      warn!(target: "quizsmith", %request_id, error = %e, "Rejected quiz form");
      return error_response(e.status_code(), request_id, e.user_message());
    }
  };

  match produce_quiz(oa, &state, form, &request_id).await {
    Ok(out) => {
      info!(target: "quizsmith", %request_id, status = ?out.status, rows = out.rows.len(), "HTTP quiz served");
      Json(out).into_response()
    }
    Err(e) => error_response(e.status_code(), request_id, e.user_message()),
  }
}

fn error_response(status: StatusCode, request_id: String, error: String) -> Response {
  (status, Json(ErrorOut { request_id, error })).into_response()
}

/// Collect `file`, `number`, `subject` and `tone`. Unknown fields are ignored.
async fn read_quiz_form(mut multipart: Multipart, limit: usize) -> QuizResult<QuizForm> {
  let bad_upload = |e: MultipartError| upload_error(e, limit);
  let mut file: Option<(String, Vec<u8>)> = None;
  let mut number: Option<String> = None;
  let mut subject: Option<String> = None;
  let mut tone: Option<String> = None;

  while let Some(field) = multipart.next_field().await.map_err(bad_upload)? {
    let name = field.name().unwrap_or_default().to_string();
    match name.as_str() {
      "file" => {
        let filename = field
          .file_name()
          .map(str::to_string)
          .filter(|n| !n.trim().is_empty())
          .ok_or_else(|| QuizError::InvalidRequest("The uploaded file has no name.".into()))?;
        let bytes = field.bytes().await.map_err(bad_upload)?;
        file = Some((filename, bytes.to_vec()));
      }
      "number" => number = Some(field.text().await.map_err(bad_upload)?),
      "subject" => subject = Some(field.text().await.map_err(bad_upload)?),
      "tone" => tone = Some(field.text().await.map_err(bad_upload)?),
      _ => {}
    }
  }

  let (filename, bytes) = file.ok_or_else(|| missing("file"))?;
  let number = number
    .ok_or_else(|| missing("number"))?
    .trim()
    .parse::<u32>()
    .map_err(|_| QuizError::InvalidRequest("Number of questions must be a whole number.".into()))?;
  Ok(QuizForm {
    filename,
    bytes,
    number,
    subject: subject.ok_or_else(|| missing("subject"))?,
    tone: tone.ok_or_else(|| missing("tone"))?,
  })
}

fn missing(field: &str) -> QuizError {
  QuizError::InvalidRequest(format!("Missing form field '{field}'."))
}

/// A body cut off by the size cap is reported as such; anything else is a
/// malformed request.
fn upload_error(e: MultipartError, limit: usize) -> QuizError {
  if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
    QuizError::UploadTooLarge { limit }
  } else {
    QuizError::InvalidRequest(format!("Could not read the upload: {}", e.body_text()))
  }
}
