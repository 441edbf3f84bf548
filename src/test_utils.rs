//! Test doubles for the model service.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::{routing::post, Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::error::{QuizError, QuizResult};
use crate::openai::{ChatModel, ResponseFormat};

/// Body of a successful chat.completions answer.
pub fn chat_reply(content: &str) -> Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
    })
}

#[derive(Clone, Debug)]
pub struct SeenRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

pub struct MockChatServer {
    pub base_url: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockChatServer {
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }
}

/// Serve `/chat/completions` on an ephemeral loopback port. Replies are
/// handed out in order; the last one repeats once the queue runs dry.
pub async fn spawn_mock_chat_server(replies: Vec<(StatusCode, Value)>) -> MockChatServer {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let queue = Arc::new(Mutex::new(VecDeque::from(replies)));

    let handler = {
        let seen = seen.clone();
        move |headers: HeaderMap, Json(body): Json<Value>| {
            let seen = seen.clone();
            let queue = queue.clone();
            async move {
                let authorization = headers
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                seen.lock().unwrap().push(SeenRequest { authorization, body });

                let mut q = queue.lock().unwrap();
                let reply = if q.len() > 1 { q.pop_front() } else { q.front().cloned() };
                let (status, body) = reply.unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, json!({})));
                (status, Json(body))
            }
        }
    };

    let app = Router::new().route("/chat/completions", post(handler));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockChatServer {
        base_url: format!("http://{addr}"),
        seen,
    }
}

#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
    pub format: ResponseFormat,
}

/// Scripted in-process model: each call pops the next canned answer.
pub struct FakeModel {
    replies: Mutex<VecDeque<QuizResult<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeModel {
    pub fn new(replies: Vec<QuizResult<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ChatModel for FakeModel {
    fn model_name(&self) -> &str {
        "fake-model"
    }

    async fn complete(&self, system: &str, user: &str, format: ResponseFormat) -> QuizResult<String> {
        self.calls.lock().unwrap().push(RecordedCall {
            system: system.to_string(),
            user: user.to_string(),
            format,
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(QuizError::model_invocation("fake-model", "no scripted reply left")))
    }
}
