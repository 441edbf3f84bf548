//! Application state: the model client, prompts, limits and the output template.
//!
//! Everything here is read-only after startup; handlers share it via `Arc`.

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::config::{Limits, Prompts, QuizConfig};
use crate::openai::OpenAI;

#[derive(Clone)]
pub struct AppState {
    /// `None` when no API key was found; quiz requests are then refused.
    pub openai: Option<OpenAI>,
    pub prompts: Prompts,
    pub limits: Limits,
    pub response_template: Value,
}

impl AppState {
    /// Build state from the (optional) TOML config plus environment overrides.
    #[instrument(level = "info", skip_all)]
    pub fn new(cfg: Option<QuizConfig>, response_template: Value) -> Self {
        let QuizConfig { model, prompts, limits } = cfg.unwrap_or_default();
        let model = model.with_env_overrides();

        let openai = OpenAI::from_env(&model);
        if let Some(oa) = &openai {
            info!(target: "quizsmith", base_url = %oa.base_url, model = %oa.model, temperature = oa.temperature, "Model service enabled.");
        } else {
            warn!(target: "quizsmith", "Model service disabled (no GEMINI_API_KEY or OPENAI_API_KEY). Quiz requests will be refused.");
        }
        info!(
            target: "quizsmith",
            max_questions = limits.max_questions,
            max_field_chars = limits.max_field_chars,
            max_upload_bytes = limits.max_upload_bytes,
            review_policy = ?limits.review_policy,
            "Quiz limits"
        );

        Self { openai, prompts, limits, response_template }
    }

    /// State with an explicit client, bypassing the environment.
    #[cfg(test)]
    pub fn with_client(openai: Option<OpenAI>, limits: Limits) -> Self {
        Self {
            openai,
            prompts: Prompts::default(),
            limits,
            response_template: crate::config::builtin_response_template().unwrap(),
        }
    }
}
