//! Minimal OpenAI-compatible chat client (Gemini, OpenAI, local gateways).
//!
//! We only call chat.completions and request either plain text or a JSON object.
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: The API key lives in a `SecretString` and is never logged.

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::ModelSettings;
use crate::error::{QuizError, QuizResult};

/// Response-format hint sent with a completion request. The service may or may
/// not honour it; callers still validate what comes back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseFormat {
  Text,
  JsonObject,
}

/// A text-generation service: one rendered prompt in, raw text out.
pub trait ChatModel: Send + Sync {
  fn model_name(&self) -> &str;

  fn complete(
    &self,
    system: &str,
    user: &str,
    format: ResponseFormat,
  ) -> impl Future<Output = QuizResult<String>> + Send;
}

#[derive(Clone)]
pub struct OpenAI {
  client: reqwest::Client,
  api_key: SecretString,
  pub base_url: String,
  pub model: String,
  pub temperature: f32,
}

impl OpenAI {
  /// Construct the client if we find GEMINI_API_KEY or OPENAI_API_KEY; otherwise return None.
  pub fn from_env(settings: &ModelSettings) -> Option<Self> {
    let api_key = ["GEMINI_API_KEY", "OPENAI_API_KEY"]
      .iter()
      .filter_map(|k| std::env::var(k).ok())
      .find(|v| !v.trim().is_empty())?;
    match Self::new(SecretString::from(api_key), settings) {
      Ok(oa) => Some(oa),
      Err(e) => {
        error!(target: "quizsmith", error = %e, "Failed to build HTTP client for model service");
        None
      }
    }
  }

  pub fn new(api_key: SecretString, settings: &ModelSettings) -> Result<Self, String> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = settings.timeout_secs {
      builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build().map_err(|e| e.to_string())?;

    Ok(Self {
      client,
      api_key,
      base_url: settings.base_url.trim_end_matches('/').to_string(),
      model: settings.name.clone(),
      temperature: settings.temperature,
    })
  }

  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model, prompt_len = user.len()))]
  async fn chat(&self, system: &str, user: &str, format: ResponseFormat) -> QuizResult<String> {
    let url = format!("{}/chat/completions", self.base_url);
    let mut messages = Vec::with_capacity(2);
    if !system.trim().is_empty() {
      messages.push(ChatMessageReq { role: "system".into(), content: system.into() });
    }
    messages.push(ChatMessageReq { role: "user".into(), content: user.into() });

    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages,
      temperature: self.temperature,
      response_format: match format {
        ResponseFormat::JsonObject => Some(ResponseFormatReq { r#type: "json_object".into() }),
        ResponseFormat::Text => None,
      },
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "quizsmith/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key.expose_secret()))
      .json(&req).send().await
      .map_err(|e| self.fail(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(self.fail(format!("HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse = res.json().await
      .map_err(|e| self.fail(format!("unreadable response body: {}", e)))?;
    let elapsed = start.elapsed();
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Model usage");
    }

    let choice = body.choices.into_iter().next()
      .ok_or_else(|| self.fail("response contained no choices".into()))?;
    let text = choice.message.content.unwrap_or_default();
    info!(?elapsed, response_len = text.len(), "Model response received");
    Ok(text)
  }

  fn fail(&self, message: String) -> QuizError {
    warn!(target: "quizsmith", model = %self.model, error = %message, "Model call failed");
    QuizError::model_invocation(&self.model, message)
  }
}

impl ChatModel for OpenAI {
  fn model_name(&self) -> &str { &self.model }

  async fn complete(&self, system: &str, user: &str, format: ResponseFormat) -> QuizResult<String> {
    self.chat(system, user, format).await
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormatReq>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormatReq { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI-style error body.
/// Gemini's compatibility layer wraps errors in a one-element array.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  if let Ok(w) = serde_json::from_str::<EWrap>(body) {
    return Some(w.error.message);
  }
  serde_json::from_str::<Vec<EWrap>>(body)
    .ok()
    .and_then(|v| v.into_iter().next())
    .map(|w| w.error.message)
}
