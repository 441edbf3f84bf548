//! Flatten a quiz document into display rows.

use serde_json::Value;
use tracing::error;

use crate::domain::{QuizItem, TableRow};
use crate::error::{QuizError, QuizResult};
use crate::util::json_kind;

const PLACEHOLDER: &str = "N/A";
const CHOICE_SEPARATOR: &str = " || ";

/// One row per entry, in the document's key order. Missing sub-fields become
/// placeholders; only a non-object top level is an error.
pub fn format_rows(quiz: &Value) -> QuizResult<Vec<TableRow>> {
  let map = quiz.as_object().ok_or_else(|| {
    QuizError::Formatting(format!("expected a JSON object of questions, got {}", json_kind(quiz)))
  })?;
  Ok(map.values().map(|entry| row_for(&QuizItem::from_value(entry))).collect())
}

/// `format_rows`, with failure logged and turned into the "no rows" sentinel.
pub fn rows_or_empty(quiz: &Value) -> Vec<TableRow> {
  format_rows(quiz).unwrap_or_else(|e| {
    error!(target: "quizsmith", error = %e, "Quiz table formatting failed");
    Vec::new()
  })
}

fn row_for(item: &QuizItem) -> TableRow {
  let choices = item
    .options
    .iter()
    .map(|(label, text)| format!("{label} -> {text}"))
    .collect::<Vec<_>>()
    .join(CHOICE_SEPARATOR);
  TableRow {
    question: item.question.clone().unwrap_or_else(|| PLACEHOLDER.into()),
    choices,
    correct: item.correct_label.clone().unwrap_or_else(|| PLACEHOLDER.into()),
  }
}
