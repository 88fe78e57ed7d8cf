//! Browser-facing HTTP server.
//!
//! Serves the chat page and a small JSON API that drives [`Assistant`].
//! Each browser gets its own conversation, keyed by the `assistant_session`
//! cookie. Only `POST /api/messages` with a non-blank message starts a
//! session; the other routes treat a missing or unknown cookie as an empty
//! conversation.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Chat page |
//! | `GET`  | `/api/conversation` | Turns of the caller's session |
//! | `POST` | `/api/messages` | Ask a question: `{ "message": "..." }` |
//! | `POST` | `/api/feedback` | Rate a turn: `{ "turn": 0, "vote": "up" }` |
//! | `POST` | `/api/clear` | Clear the caller's session |
//! | `GET`  | `/health` | Health check (version and knowledge document count) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "turn 4 not found" } }
//! ```
//!
//! Error codes: `not_found` (404), `trace_error` (502). Malformed JSON bodies
//! are rejected by Axum's extractor before reaching a handler.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::assistant::Assistant;
use crate::completion::OpenAIChatClient;
use crate::config::{Config, ServerConfig};
use crate::knowledge::load_knowledge_base;
use crate::models::{Turn, Vote};
use crate::session::{SessionHandle, SessionStore};
use crate::trace::create_trace_logger;
use crate::ui;

const SESSION_COOKIE: &str = "assistant_session";

/// Shared state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<Assistant>,
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(assistant: Assistant, server: &ServerConfig) -> Self {
        Self {
            assistant: Arc::new(assistant),
            sessions: Arc::new(SessionStore::new(
                Duration::from_secs(server.session_idle_secs),
                server.max_sessions,
            )),
        }
    }
}

/// Build the assistant from configuration: load the knowledge base and
/// construct the completion and trace clients. Any failure here aborts
/// startup.
pub fn build_assistant(config: &Config) -> anyhow::Result<Assistant> {
    let knowledge = load_knowledge_base(&config.knowledge.dir)?;
    tracing::info!(
        documents = knowledge.len(),
        dir = %config.knowledge.dir.display(),
        "loaded knowledge base"
    );

    let completion = OpenAIChatClient::new(&config.completion)?;
    let tracer = create_trace_logger(&config.trace)?;

    Ok(Assistant::new(
        Arc::new(knowledge),
        Arc::new(completion),
        tracer,
        config.completion.system_prompt.clone(),
    ))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_index))
        .route("/api/conversation", get(handle_conversation))
        .route("/api/messages", post(handle_message))
        .route("/api/feedback", post(handle_feedback))
        .route("/api/clear", post(handle_clear))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the chat server on `[server].bind` and run until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let assistant = build_assistant(config)?;
    let app = router(AppState::new(assistant, &config.server));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "chat server listening");
    println!("Chat assistant listening on http://{}", config.server.bind);

    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// The trace service is the only upstream whose failures reach the client.
fn trace_error(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "trace logging failed");
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "trace_error".to_string(),
        message: format!("{:#}", err),
    }
}

// ============ Session cookie ============

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// The caller's live session, if the cookie names one. Never creates a
/// session.
fn existing_session(state: &AppState, headers: &HeaderMap) -> Option<(String, SessionHandle)> {
    let id = session_cookie(headers)?;
    let handle = state.sessions.get(&id)?;
    Some((id, handle))
}

/// Attach the session cookie to a response.
fn with_session<T: IntoResponse>(session_id: &str, body: T) -> Response {
    let mut response = body.into_response();
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, session_id);
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
    response
}

// ============ GET / ============

async fn handle_index() -> Html<&'static str> {
    Html(ui::INDEX_HTML)
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    knowledge_documents: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        knowledge_documents: state.assistant.knowledge().len(),
    })
}

// ============ Conversation ============

#[derive(Serialize)]
struct ConversationResponse {
    turns: Vec<Turn>,
}

async fn handle_conversation(State(state): State<AppState>, headers: HeaderMap) -> Response {
    conversation_view(&state, &headers).await
}

/// Turns of the caller's session; empty, and without a cookie, when the
/// caller has none.
async fn conversation_view(state: &AppState, headers: &HeaderMap) -> Response {
    match existing_session(state, headers) {
        Some((id, session)) => {
            let turns = session.lock().await.turns().to_vec();
            with_session(&id, Json(ConversationResponse { turns }))
        }
        None => Json(ConversationResponse { turns: Vec::new() }).into_response(),
    }
}

#[derive(Deserialize)]
struct MessageRequest {
    message: String,
}

/// Handler for `POST /api/messages`.
///
/// Blank messages are accepted and leave the conversation unchanged. This
/// is the only route that starts a session.
async fn handle_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<MessageRequest>,
) -> Result<Response, AppError> {
    if req.message.trim().is_empty() {
        return Ok(conversation_view(&state, &headers).await);
    }

    let (id, session) = state
        .sessions
        .get_or_create(session_cookie(&headers).as_deref());
    let mut session = session.lock().await;

    state
        .assistant
        .submit(&mut session, &req.message)
        .await
        .map_err(trace_error)?;

    let turns = session.turns().to_vec();
    Ok(with_session(&id, Json(ConversationResponse { turns })))
}

#[derive(Deserialize)]
struct FeedbackRequest {
    turn: usize,
    vote: Vote,
}

#[derive(Serialize)]
struct FeedbackResponse {
    trace_id: String,
    score: f64,
}

async fn handle_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<FeedbackRequest>,
) -> Result<Response, AppError> {
    let (id, session) = existing_session(&state, &headers)
        .ok_or_else(|| not_found(format!("turn {} not found", req.turn)))?;
    let session = session.lock().await;

    let trace_id = session
        .turn(req.turn)
        .map(|t| t.trace_id.to_string())
        .ok_or_else(|| not_found(format!("turn {} not found", req.turn)))?;

    state
        .assistant
        .feedback(&session, req.turn, req.vote)
        .await
        .map_err(trace_error)?;

    Ok(with_session(
        &id,
        Json(FeedbackResponse {
            trace_id,
            score: req.vote.score(),
        }),
    ))
}

async fn handle_clear(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let empty = Json(ConversationResponse { turns: Vec::new() });
    match existing_session(&state, &headers) {
        Some((id, session)) => {
            let mut session = session.lock().await;
            state.assistant.clear(&mut session);
            with_session(&id, empty)
        }
        None => empty.into_response(),
    }
}
