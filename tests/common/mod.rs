//! Shared fixtures: in-process stand-ins for the completion, Comet and
//! embedding APIs, plus a helper that runs the chat server on a free port.

#![allow(dead_code)]

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use docs_assistant::config::Config;
use docs_assistant::server::{build_assistant, router, AppState};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Requests received by a mock upstream, plus a switch to make it fail.
#[derive(Clone, Default)]
pub struct Upstream {
    pub requests: Arc<Mutex<Vec<Value>>>,
    pub fail: Arc<Mutex<bool>>,
}

impl Upstream {
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, body: Value) -> bool {
        self.requests.lock().unwrap().push(body);
        *self.fail.lock().unwrap()
    }
}

/// Bind `app` to a free local port and serve it in the background.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

async fn chat_completions(
    State(up): State<Upstream>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let n = up.requests().len() + 1;
    if up.record(body) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": { "message": "model overloaded" } })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "choices": [{ "message": { "role": "assistant", "content": format!("  answer {}  ", n) } }]
        })),
    )
}

/// Mock OpenAI-compatible chat API. Answers are `"answer <n>"`.
pub async fn spawn_completion_api() -> (String, Upstream) {
    let up = Upstream::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .with_state(up.clone());
    (format!("{}/v1", spawn(app).await), up)
}

/// Requests received by the mock Comet REST API, one log per endpoint.
/// Making `experiments` fail rejects every new trace.
#[derive(Clone, Default)]
pub struct CometMock {
    pub experiments: Upstream,
    pub assets: Upstream,
    pub parameters: Upstream,
    pub metrics: Upstream,
}

const COMET_TEST_KEY: &str = "comet-test";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some(COMET_TEST_KEY)
}

/// JSON content of the single file part in a multipart body.
fn multipart_file(body: &[u8]) -> Value {
    let text = String::from_utf8_lossy(body);
    let start = text.find("\r\n\r\n").unwrap() + 4;
    let end = start + text[start..].find("\r\n--").unwrap();
    serde_json::from_str(&text[start..end]).unwrap()
}

async fn create_experiment(
    State(comet): State<CometMock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "msg": "bad key" })));
    }
    let n = comet.experiments.requests().len() + 1;
    if comet.experiments.record(body) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "msg": "boom" })));
    }
    (
        StatusCode::OK,
        Json(json!({ "experimentKey": format!("trace-{}", n), "link": "" })),
    )
}

async fn upload_asset(
    State(comet): State<CometMock>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data"), "{}", content_type);

    let record = json!({
        "experimentKey": query.get("experimentKey"),
        "fileName": query.get("fileName"),
        "type": query.get("type"),
        "data": multipart_file(&body),
    });
    if comet.assets.record(record) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::OK
}

async fn log_parameter(
    State(comet): State<CometMock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    if comet.parameters.record(body) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::OK
}

async fn log_metric(
    State(comet): State<CometMock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    if comet.metrics.record(body) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    StatusCode::OK
}

/// Mock Comet REST v2 experiment API. Experiment keys are `"trace-<n>"`.
pub async fn spawn_trace_api() -> (String, CometMock) {
    let comet = CometMock::default();
    let app = Router::new()
        .route("/write/experiment/create", post(create_experiment))
        .route("/write/experiment/upload-asset", post(upload_asset))
        .route("/write/experiment/parameter", post(log_parameter))
        .route("/write/experiment/metric", post(log_metric))
        .with_state(comet.clone());
    (spawn(app).await, comet)
}

async fn embeddings(State(up): State<Upstream>, Json(body): Json<Value>) -> Json<Value> {
    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    up.record(body);
    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let len = text.as_str().unwrap_or_default().len() as f32;
            json!({ "index": i, "embedding": [len, 1.0, -1.0] })
        })
        .collect();
    Json(json!({ "data": data }))
}

/// Mock embedding API. Each vector is `[text length, 1.0, -1.0]`.
pub async fn spawn_embedding_api() -> (String, Upstream) {
    let up = Upstream::default();
    let app = Router::new()
        .route("/v1/embeddings", post(embeddings))
        .with_state(up.clone());
    (format!("{}/v1", spawn(app).await), up)
}

pub fn write_knowledge(dir: &std::path::Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("panels.json"),
        r#"{"content": "Custom Panels are written in Python and shown in the Comet UI."}"#,
    )
    .unwrap();
    fs::write(
        dir.join("registry.json"),
        r#"{"content": "The Model Registry tracks model versions and stages."}"#,
    )
    .unwrap();
}

/// Config wired to the given mock endpoints. API keys are read from
/// variables unique to `tag` so concurrently running tests do not clash.
pub fn test_config(tmp: &TempDir, tag: &str, completion_url: &str, trace_url: &str) -> Config {
    let knowledge = tmp.path().join("knowledge");
    write_knowledge(&knowledge);

    let openai_env = format!("DOCS_ASSISTANT_TEST_OPENAI_{}", tag);
    let comet_env = format!("DOCS_ASSISTANT_TEST_COMET_{}", tag);
    std::env::set_var(&openai_env, "sk-test");
    std::env::set_var(&comet_env, COMET_TEST_KEY);

    let content = format!(
        r#"
[knowledge]
dir = "{knowledge}"

[completion]
base_url = "{completion_url}"
api_key_env = "{openai_env}"
system_prompt = "You help with Comet."

[trace]
provider = "comet"
base_url = "{trace_url}"
project = "test-project"
api_key_env = "{comet_env}"
"#,
        knowledge = knowledge.display(),
    );
    let config: Config = toml::from_str(&content).unwrap();
    docs_assistant::config::validate(&config).unwrap();
    config
}

/// Build the assistant from `config` and serve it on a free port.
pub async fn spawn_app(config: &Config) -> String {
    spawn_app_with_state(config).await.0
}

/// Like [`spawn_app`], also returning the server's shared state.
pub async fn spawn_app_with_state(config: &Config) -> (String, AppState) {
    let assistant = build_assistant(config).unwrap();
    let state = AppState::new(assistant, &config.server);
    (spawn(router(state.clone())).await, state)
}

/// Minimal cookie-carrying client for the chat API.
pub struct Browser {
    pub base: String,
    client: reqwest::Client,
    cookie: Option<String>,
}

impl Browser {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            client: reqwest::Client::new(),
            cookie: None,
        }
    }

    pub async fn send(&mut self, method: reqwest::Method, path: &str, body: Option<Value>) -> (u16, Value) {
        let mut req = self.client.request(method, format!("{}{}", self.base, path));
        if let Some(cookie) = &self.cookie {
            req = req.header("Cookie", cookie.clone());
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.unwrap();
        if let Some(set) = resp.headers().get("set-cookie") {
            let pair = set.to_str().unwrap().split(';').next().unwrap().to_string();
            self.cookie = Some(pair);
        }
        let status = resp.status().as_u16();
        let body = resp.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn ask(&mut self, message: &str) -> (u16, Value) {
        self.send(
            reqwest::Method::POST,
            "/api/messages",
            Some(json!({ "message": message })),
        )
        .await
    }

    pub async fn conversation(&mut self) -> Value {
        self.send(reqwest::Method::GET, "/api/conversation", None).await.1
    }
}
