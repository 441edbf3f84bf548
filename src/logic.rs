//! Request orchestration: uploaded document → quiz → table rows.
//!
//! Handlers stay thin; this is where the loader, the pipeline and the
//! formatter are chained and where failures are logged with full detail
//! before being reduced for the caller.

use tracing::{error, info, instrument, warn};

use crate::domain::QuizRequest;
use crate::error::{QuizError, QuizResult};
use crate::loader::read_document_blocking;
use crate::openai::ChatModel;
use crate::pipeline::run_pipeline;
use crate::protocol::{QuizOut, QuizStatus};
use crate::state::AppState;
use crate::table::rows_or_empty;

/// The decoded multipart form.
#[derive(Debug)]
pub struct QuizForm {
  pub filename: String,
  pub bytes: Vec<u8>,
  pub number: u32,
  pub subject: String,
  pub tone: String,
}

/// Run one quiz request end to end.
///
/// `Ok` covers both the normal answer and the degraded one (model text that
/// could not be tabulated). Every other failure is returned as `Err` after
/// being logged.
#[instrument(level = "info", skip(model, state, form), fields(%request_id, filename = %form.filename, size = form.bytes.len(), number = form.number))]
pub async fn produce_quiz<M: ChatModel>(
  model: &M,
  state: &AppState,
  form: QuizForm,
  request_id: &str,
) -> QuizResult<QuizOut> {
  match run(model, state, form, request_id).await {
    Err(e @ QuizError::MalformedQuizJson { .. }) => {
      warn!(target: "quizsmith", %request_id, error = %e, "Returning raw model output instead of a table");
      Ok(QuizOut::malformed(request_id.to_string(), &e))
    }
    Err(e) => {
      error!(target: "quizsmith", %request_id, code = e.error_code(), error = %e, "Quiz request failed");
      Err(e)
    }
    ok => ok,
  }
}

async fn run<M: ChatModel>(
  model: &M,
  state: &AppState,
  form: QuizForm,
  request_id: &str,
) -> QuizResult<QuizOut> {
  let QuizForm { filename, bytes, number, subject, tone } = form;
  let text = read_document_blocking(filename, bytes).await?;
  let req = QuizRequest::new(
    text,
    number,
    &subject,
    &tone,
    state.response_template.clone(),
    &state.limits,
  )?;

  let result = run_pipeline(model, &state.prompts, &req, state.limits.review_policy).await?;
  let quiz = result.quiz.to_value();
  let rows = rows_or_empty(&quiz);

  if rows.is_empty() {
    warn!(target: "quizsmith", %request_id, "Quiz produced no table rows");
    return Ok(QuizOut {
      request_id: request_id.to_string(),
      status: QuizStatus::Degraded,
      raw_output: Some(result.raw_quiz),
      quiz: Some(quiz),
      rows,
      review: result.review,
      message: Some("The model returned no questions to display.".into()),
    });
  }

  info!(target: "quizsmith", %request_id, rows = rows.len(), reviewed = result.review.is_some(), "Quiz ready");
  Ok(QuizOut {
    request_id: request_id.to_string(),
    status: QuizStatus::Ok,
    quiz: Some(quiz),
    rows,
    review: result.review,
    raw_output: None,
    message: None,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Limits;
  use crate::test_utils::FakeModel;
  use serde_json::json;

  fn state() -> AppState {
    AppState::with_client(None, Limits::default())
  }

  fn form(filename: &str, body: &str, number: u32) -> QuizForm {
    QuizForm {
      filename: filename.into(),
      bytes: body.as_bytes().to_vec(),
      number,
      subject: " Biology ".into(),
      tone: "simple".into(),
    }
  }

  const NOTES: &str = "Mitochondria generate ATP. Animal cells have no cell wall.";

  #[tokio::test]
  async fn text_upload_becomes_rows_and_review() {
    let quiz = json!({
      "1": {"mcq": "What generates ATP?", "options": {"a": "Mitochondria", "b": "Ribosomes"}, "correct": "a"},
      "2": {"mcq": "Which cells lack a wall?", "options": {"a": "Plant", "b": "Animal"}, "correct": "b"}
    });
    let model = FakeModel::new(vec![Ok(quiz.to_string()), Ok("Well suited to beginners.".into())]);

    let out = produce_quiz(&model, &state(), form("notes.txt", NOTES, 2), "req-1").await.unwrap();
    assert_eq!(out.status, QuizStatus::Ok);
    assert_eq!(out.request_id, "req-1");
    assert_eq!(out.quiz, Some(quiz));
    assert_eq!(out.rows.len(), 2);
    assert_eq!(out.rows[1].choices, "a -> Plant || b -> Animal");
    assert_eq!(out.review.as_deref(), Some("Well suited to beginners."));
    assert!(out.raw_output.is_none());

    let calls = model.calls();
    assert!(calls[0].user.contains(NOTES));
    assert!(calls[0].user.contains("for Biology students"));
  }

  #[tokio::test]
  async fn malformed_quiz_is_degraded_with_raw_text() {
    let model = FakeModel::new(vec![Ok("not json at all".into())]);
    let out = produce_quiz(&model, &state(), form("notes.txt", NOTES, 3), "req-2").await.unwrap();
    assert_eq!(out.status, QuizStatus::Degraded);
    assert!(out.rows.is_empty());
    assert!(out.quiz.is_none());
    assert_eq!(out.raw_output.as_deref(), Some("not json at all"));
    assert!(out.message.is_some());
  }

  #[tokio::test]
  async fn empty_quiz_is_degraded() {
    let raw = "Here you go:\n```json\n{}\n```";
    let model = FakeModel::new(vec![Ok(raw.into()), Ok("Nothing to review.".into())]);
    let out = produce_quiz(&model, &state(), form("notes.txt", NOTES, 3), "req-3").await.unwrap();
    assert_eq!(out.status, QuizStatus::Degraded);
    assert!(out.rows.is_empty());
    assert_eq!(out.quiz, Some(json!({})));
    assert_eq!(out.raw_output.as_deref(), Some(raw));
  }

  #[tokio::test]
  async fn unsupported_upload_never_reaches_the_model() {
    let model = FakeModel::new(vec![]);
    let err = produce_quiz(&model, &state(), form("notes.docx", NOTES, 3), "req-4").await.unwrap_err();
    assert!(matches!(err, QuizError::UnsupportedFormat { .. }));
    assert!(model.calls().is_empty());
  }

  #[tokio::test]
  async fn blank_document_is_rejected_before_generation() {
    let model = FakeModel::new(vec![]);
    let err = produce_quiz(&model, &state(), form("blank.txt", "  \n ", 3), "req-5").await.unwrap_err();
    assert!(matches!(err, QuizError::InvalidRequest(_)));
    assert!(model.calls().is_empty());
  }

  #[tokio::test]
  async fn model_failure_is_returned() {
    let model = FakeModel::new(vec![Err(QuizError::model_invocation("fake-model", "HTTP 503"))]);
    let err = produce_quiz(&model, &state(), form("notes.txt", NOTES, 3), "req-6").await.unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);
  }
}
