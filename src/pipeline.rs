//! Two-stage quiz pipeline.
//!
//! Stage 1 (generate): fill the generation template, ask the model for a single
//! JSON object, parse it into a `QuizDocument`.
//! Stage 2 (evaluate): embed that exact document in the evaluation template and
//! keep the model's answer as the review text.
//!
//! The stages run strictly in order. A failure in stage 1 means stage 2 never runs.

use std::time::Instant;

use tracing::{info, instrument, warn};

use crate::config::{Prompts, ReviewPolicy};
use crate::domain::{PipelineResult, QuizDocument, QuizRequest, ReviewText};
use crate::error::{QuizError, QuizResult};
use crate::openai::{ChatModel, ResponseFormat};
use crate::util::{fill_template, json_kind, trunc_for_log};

pub fn generation_prompt(prompts: &Prompts, req: &QuizRequest) -> String {
  let number = req.number.to_string();
  let schema = req.schema.to_string();
  fill_template(
    &prompts.generation_template,
    &[
      ("number", number.as_str()),
      ("subject", req.subject.as_str()),
      ("tone", req.tone.as_str()),
      ("text", req.text.as_str()),
      ("response_json", schema.as_str()),
    ],
  )
}

pub fn evaluation_prompt(prompts: &Prompts, subject: &str, quiz: &QuizDocument) -> String {
  let quiz_json = quiz.to_pretty_json();
  fill_template(&prompts.evaluation_template, &[("subject", subject), ("quiz", quiz_json.as_str())])
}

/// Parse stage-1 output. The payload must be a JSON object; when the whole
/// reply is not JSON, the first Markdown code fence anywhere in it is tried.
pub fn parse_quiz(raw: &str) -> QuizResult<QuizDocument> {
  let malformed = |reason: String| QuizError::MalformedQuizJson { reason, raw: raw.to_string() };
  let value: serde_json::Value = match serde_json::from_str(raw.trim()) {
    Ok(v) => v,
    Err(e) => match fenced_body(raw) {
      Some(body) => serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?,
      None => return Err(malformed(e.to_string())),
    },
  };
  QuizDocument::from_value(value)
    .map_err(|other| malformed(format!("expected a JSON object, got {}", json_kind(&other))))
}

/// Text between the first "```" (plus an optional `json` tag) and the next
/// "```". An unclosed fence runs to the end of the text.
fn fenced_body(raw: &str) -> Option<&str> {
  let open = raw.find("```")?;
  let after = &raw[open + 3..];
  let after = after.strip_prefix("json").unwrap_or(after);
  let body = match after.find("```") {
    Some(close) => &after[..close],
    None => after,
  };
  Some(body.trim())
}

/// Stage 1.
#[instrument(level = "info", skip(model, prompts, req), fields(model = %model.model_name(), number = req.number, subject = %req.subject, text_len = req.text.len()))]
pub async fn generate_quiz<M: ChatModel>(
  model: &M,
  prompts: &Prompts,
  req: &QuizRequest,
) -> QuizResult<(QuizDocument, String)> {
  let prompt = generation_prompt(prompts, req);
  let start = Instant::now();
  let raw = model.complete(&prompts.generation_system, &prompt, ResponseFormat::JsonObject).await?;
  let quiz = parse_quiz(&raw).map_err(|e| {
    warn!(target: "quizsmith", error = %e, raw_preview = %trunc_for_log(&raw, 200), "Stage 1 output is not a quiz object");
    e
  })?;
  info!(target: "quizsmith", elapsed = ?start.elapsed(), questions = quiz.len(), "Quiz generated");
  Ok((quiz, raw))
}

/// Stage 2. The raw answer, trimmed, is the review.
#[instrument(level = "info", skip(model, prompts, quiz), fields(model = %model.model_name(), questions = quiz.len()))]
pub async fn evaluate_quiz<M: ChatModel>(
  model: &M,
  prompts: &Prompts,
  subject: &str,
  quiz: &QuizDocument,
) -> QuizResult<ReviewText> {
  let prompt = evaluation_prompt(prompts, subject, quiz);
  let start = Instant::now();
  let review = model.complete(&prompts.evaluation_system, &prompt, ResponseFormat::Text).await?;
  let review = review.trim().to_string();
  info!(target: "quizsmith", elapsed = ?start.elapsed(), review_len = review.len(), "Quiz reviewed");
  Ok(review)
}

/// Generate, then evaluate the generated quiz.
pub async fn run_pipeline<M: ChatModel>(
  model: &M,
  prompts: &Prompts,
  req: &QuizRequest,
  policy: ReviewPolicy,
) -> QuizResult<PipelineResult> {
  let (quiz, raw_quiz) = generate_quiz(model, prompts, req).await?;

  let expected = req.number as usize;
  if quiz.len() != expected {
    warn!(target: "quizsmith", expected, actual = quiz.len(), ?policy, "Generated question count differs from request");
    if policy == ReviewPolicy::SkipOnCountMismatch {
      return Ok(PipelineResult { quiz, raw_quiz, review: None });
    }
  }

  let review = evaluate_quiz(model, prompts, &req.subject, &quiz).await?;
  Ok(PipelineResult { quiz, raw_quiz, review: Some(review) })
}
