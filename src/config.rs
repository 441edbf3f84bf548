//! Loading service configuration (model settings, prompts, limits) from TOML,
//! plus the JSON response template handed to the model.
//!
//! See `QuizConfig`, `ModelSettings`, `Prompts` and `Limits` for the schema.
//! Every section and field is optional.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info};

pub const DEFAULT_TEMPLATE_PATH: &str = "response_format_template.json";

/// Shipped copy of `response_format_template.json`, used when the file is absent.
pub const BUILTIN_RESPONSE_TEMPLATE: &str = r#"{
  "1": {
    "mcq": "multiple choice question",
    "options": {
      "a": "choice here",
      "b": "choice here",
      "c": "choice here",
      "d": "choice here"
    },
    "correct": "correct answer"
  },
  "2": {
    "mcq": "multiple choice question",
    "options": {
      "a": "choice here",
      "b": "choice here",
      "c": "choice here",
      "d": "choice here"
    },
    "correct": "correct answer"
  },
  "3": {
    "mcq": "multiple choice question",
    "options": {
      "a": "choice here",
      "b": "choice here",
      "c": "choice here",
      "d": "choice here"
    },
    "correct": "correct answer"
  }
}"#;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuizConfig {
  #[serde(default)]
  pub model: ModelSettings,
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub limits: Limits,
}

/// Model service settings. The credential is not part of this file;
/// it comes from the environment only.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
  pub name: String,
  pub base_url: String,
  pub temperature: f32,
  /// Per-request timeout. Unset means the HTTP client's own default.
  pub timeout_secs: Option<u64>,
}

impl Default for ModelSettings {
  fn default() -> Self {
    Self {
      name: "gemini-1.5-flash".into(),
      base_url: "https://generativelanguage.googleapis.com/v1beta/openai".into(),
      temperature: 0.3,
      timeout_secs: None,
    }
  }
}

impl ModelSettings {
  /// QUIZ_MODEL and OPENAI_BASE_URL win over the TOML values.
  pub fn with_env_overrides(mut self) -> Self {
    if let Ok(name) = std::env::var("QUIZ_MODEL") {
      self.name = name;
    }
    if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
      self.base_url = url;
    }
    self
  }
}

/// Prompts used by the two pipeline stages. Templates take `{name}` placeholders:
/// generation gets number, subject, tone, text, response_json;
/// evaluation gets subject, quiz.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub generation_system: String,
  pub generation_template: String,
  pub evaluation_system: String,
  pub evaluation_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generation_system: "You write multiple-choice quizzes. Respond ONLY with a single JSON object.".into(),
      generation_template: r#"You are an expert MCQ maker. You will be given a text and your job is to create a quiz of {number} multiple-choice questions for {subject} students.
The questions should be in a {tone} tone.

**Instructions:**
1.  Create exactly {number} multiple-choice questions from the provided text.
2.  Ensure questions are diverse and not repetitive.
3.  Each question must have one correct answer.
4.  Format your entire output as a single JSON object.

**Source Text:**
{text}

**Required JSON Format:**
{response_json}
"#.into(),
      evaluation_system: String::new(),
      evaluation_template: r#"You are an expert English grammarian and writer. Your task is to evaluate a multiple-choice quiz intended for {subject} students.
Analyze the quiz's complexity, clarity, and grammatical correctness.

Provide a concise analysis (max 50 words) on whether the quiz is suitable for the students' cognitive and analytical abilities.

**Quiz to Evaluate:**
```json
{quiz}
```
"#.into(),
    }
  }
}

/// What to do when stage 1 returns a different number of questions than asked.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewPolicy {
  /// Log the mismatch and review anyway.
  #[default]
  Always,
  /// Skip the evaluation call; the result carries no review.
  SkipOnCountMismatch,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Limits {
  pub max_questions: u32,
  pub max_field_chars: usize,
  pub max_upload_bytes: usize,
  pub review_policy: ReviewPolicy,
}

impl Default for Limits {
  fn default() -> Self {
    Self {
      max_questions: 20,
      max_field_chars: 50,
      max_upload_bytes: 10 * 1024 * 1024,
      review_policy: ReviewPolicy::Always,
    }
  }
}

/// Attempt to load `QuizConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_quiz_config_from_env() -> Option<QuizConfig> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<QuizConfig>(&s) {
      Ok(cfg) => {
        info!(target: "quizsmith", %path, "Loaded quiz config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "quizsmith", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "quizsmith", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

/// Load the output schema template from RESPONSE_TEMPLATE_PATH (or the default path).
///
/// A missing file falls back to the built-in template. A file that exists but
/// does not parse as JSON is an error: the service should not start with it.
pub fn load_response_template_from_env() -> Result<Value, String> {
  let path = std::env::var("RESPONSE_TEMPLATE_PATH").unwrap_or_else(|_| DEFAULT_TEMPLATE_PATH.into());
  load_response_template(Path::new(&path))
}

pub fn load_response_template(path: &Path) -> Result<Value, String> {
  match std::fs::read_to_string(path) {
    Ok(s) => {
      let v: Value = serde_json::from_str(&s)
        .map_err(|e| format!("Response template {} is not valid JSON: {}", path.display(), e))?;
      info!(target: "quizsmith", path = %path.display(), "Loaded response template");
      Ok(v)
    }
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      info!(target: "quizsmith", path = %path.display(), "Response template not found; using built-in template");
      builtin_response_template()
    }
    Err(e) => Err(format!("Failed to read response template {}: {}", path.display(), e)),
  }
}

pub fn builtin_response_template() -> Result<Value, String> {
  serde_json::from_str(BUILTIN_RESPONSE_TEMPLATE).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_keeps_defaults() {
    let cfg: QuizConfig = toml::from_str(
      r#"
      [model]
      temperature = 0.7

      [limits]
      max_questions = 10
      review_policy = "skip_on_count_mismatch"
      "#,
    )
    .unwrap();

    assert_eq!(cfg.model.temperature, 0.7);
    assert_eq!(cfg.model.name, ModelSettings::default().name);
    assert_eq!(cfg.limits.max_questions, 10);
    assert_eq!(cfg.limits.max_field_chars, 50);
    assert_eq!(cfg.limits.review_policy, ReviewPolicy::SkipOnCountMismatch);
    assert!(cfg.prompts.generation_template.contains("{response_json}"));
  }

  #[test]
  fn empty_toml_is_all_defaults() {
    let cfg: QuizConfig = toml::from_str("").unwrap();
    assert_eq!(cfg.limits.review_policy, ReviewPolicy::Always);
    assert_eq!(cfg.model.timeout_secs, None);
  }

  #[test]
  fn default_prompts_carry_every_placeholder() {
    let p = Prompts::default();
    for key in ["{number}", "{subject}", "{tone}", "{text}", "{response_json}"] {
      assert!(p.generation_template.contains(key), "missing {key}");
    }
    for key in ["{subject}", "{quiz}"] {
      assert!(p.evaluation_template.contains(key), "missing {key}");
    }
  }

  #[test]
  fn builtin_template_matches_shipped_file() {
    let builtin = builtin_response_template().unwrap();
    let shipped: Value = serde_json::from_str(include_str!("../response_format_template.json")).unwrap();
    assert_eq!(builtin, shipped);
  }

  #[test]
  fn missing_template_falls_back_and_bad_json_fails() {
    let dir = std::env::temp_dir().join(format!("quizsmith-cfg-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();

    let missing = load_response_template(&dir.join("nope.json")).unwrap();
    assert_eq!(missing, builtin_response_template().unwrap());

    let bad = dir.join("bad.json");
    std::fs::write(&bad, "{ not json").unwrap();
    assert!(load_response_template(&bad).unwrap_err().contains("not valid JSON"));

    std::fs::remove_dir_all(&dir).ok();
  }
}
