//! Quizsmith · quiz generator backend
//!
//! - Axum HTTP API: upload a PDF/TXT document, get back a multiple-choice quiz,
//!   a table view of it and a short review
//! - OpenAI-compatible model service (Gemini by default) via environment variables
//! - Static upload page fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                   : u16 (default 8501)
//!   GEMINI_API_KEY         : enables quiz generation (OPENAI_API_KEY also accepted)
//!   OPENAI_BASE_URL        : default Gemini's OpenAI-compatible endpoint
//!   QUIZ_MODEL             : default "gemini-1.5-flash"
//!   QUIZ_CONFIG_PATH       : path to TOML config (model, prompts, limits)
//!   RESPONSE_TEMPLATE_PATH : output schema template (default response_format_template.json)
//!   LOG_LEVEL              : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT             : "pretty" (default) or "json"
//!   LOG_FILE               : write logs to this file instead of stdout

mod config;
mod domain;
mod error;
mod loader;
mod logic;
mod openai;
mod pipeline;
mod protocol;
mod routes;
mod state;
mod table;
mod telemetry;
mod util;

#[cfg(test)]
mod test_utils;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::{load_quiz_config_from_env, load_response_template_from_env};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  // A missing .env is fine; real environment variables still apply.
  let _ = dotenvy::dotenv();
  telemetry::init_tracing();

  let cfg = load_quiz_config_from_env();
  let template = load_response_template_from_env().map_err(|e| {
    error!(target: "quizsmith", error = %e, "Cannot start without a valid response template");
    e
  })?;

  let state = Arc::new(AppState::new(cfg, template));
  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8501)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "quizsmith", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(target: "quizsmith", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "quizsmith", "Shutting down");
}
