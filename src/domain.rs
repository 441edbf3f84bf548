//! Domain models: the quiz request, the generated quiz document, and the
//! rows derived from it for display.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::Limits;
use crate::error::{QuizError, QuizResult};

/// Immutable input to the pipeline.
#[derive(Clone, Debug)]
pub struct QuizRequest {
  pub text: String,
  pub number: u32,
  pub subject: String,
  pub tone: String,
  /// Template describing the required output shape; passed to the model as text.
  pub schema: Value,
}

impl QuizRequest {
  /// Validate and build a request. Subject and tone are trimmed.
  pub fn new(
    text: String,
    number: u32,
    subject: &str,
    tone: &str,
    schema: Value,
    limits: &Limits,
  ) -> QuizResult<Self> {
    if number == 0 || number > limits.max_questions {
      return Err(QuizError::InvalidRequest(format!(
        "Number of questions must be between 1 and {}.",
        limits.max_questions
      )));
    }
    let subject = check_field("Subject", subject, limits.max_field_chars)?;
    let tone = check_field("Tone", tone, limits.max_field_chars)?;
    if text.trim().is_empty() {
      return Err(QuizError::InvalidRequest(
        "The uploaded document contains no extractable text.".into(),
      ));
    }
    Ok(Self { text, number, subject, tone, schema })
  }
}

fn check_field(name: &str, value: &str, max_chars: usize) -> QuizResult<String> {
  let v = value.trim();
  if v.is_empty() {
    return Err(QuizError::InvalidRequest(format!("{name} is required.")));
  }
  if v.chars().count() > max_chars {
    return Err(QuizError::InvalidRequest(format!(
      "{name} must be at most {max_chars} characters."
    )));
  }
  Ok(v.to_string())
}

/// Mapping from question index ("1".."N") to a quiz entry, in the order the
/// model produced them. Entries stay as raw JSON: the model's shape is a
/// best-effort contract, so readers go through `QuizItem::from_value`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QuizDocument(Map<String, Value>);

impl QuizDocument {
  /// Accept only a JSON object; anything else is handed back unchanged.
  pub fn from_value(value: Value) -> Result<Self, Value> {
    match value {
      Value::Object(map) => Ok(Self(map)),
      other => Err(other),
    }
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> { self.0.iter() }

  pub fn to_value(&self) -> Value { Value::Object(self.0.clone()) }

  /// Two-space indented JSON, the form embedded in the evaluation prompt.
  pub fn to_pretty_json(&self) -> String {
    // Serializing a Map<String, Value> cannot fail.
    serde_json::to_string_pretty(&self.0).unwrap_or_default()
  }
}

/// Lenient typed view of one quiz entry.
#[derive(Clone, Debug, PartialEq)]
pub struct QuizItem {
  pub question: Option<String>,
  /// (label, text) pairs in the order given by the model.
  pub options: Vec<(String, String)>,
  pub correct_label: Option<String>,
}

impl QuizItem {
  /// Reads `mcq` (or `question`), `options` and `correct` (or `correct_label`).
  /// Missing or oddly typed fields become `None` / empty rather than errors.
  pub fn from_value(value: &Value) -> Self {
    let Some(obj) = value.as_object() else {
      return Self { question: None, options: Vec::new(), correct_label: None };
    };
    let field = |keys: &[&str]| {
      keys.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null())).map(json_text)
    };
    let options = obj
      .get("options")
      .and_then(Value::as_object)
      .map(|opts| opts.iter().map(|(label, text)| (label.clone(), json_text(text))).collect())
      .unwrap_or_default();

    Self {
      question: field(&["mcq", "question"]),
      options,
      correct_label: field(&["correct", "correct_label"]),
    }
  }
}

/// Strings render bare; everything else renders as its JSON text.
fn json_text(v: &Value) -> String {
  match v {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// Free-form critique produced by the evaluation stage.
pub type ReviewText = String;

/// Terminal output of the pipeline.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineResult {
  pub quiz: QuizDocument,
  /// Stage-1 text exactly as the model returned it.
  pub raw_quiz: String,
  pub review: Option<ReviewText>,
}

/// One display row per quiz entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableRow {
  pub question: String,
  pub choices: String,
  pub correct: String,
}
