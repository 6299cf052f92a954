use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use dashmap::DashMap;
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::protocol::{McpHandler, PARSE_ERROR, RpcError};
use crate::tools::Tools;

pub const SSE_PATH: &str = "/sse";
pub const MESSAGES_PATH: &str = "/messages";

const SESSION_BUFFER: usize = 32;

pub struct McpState {
    handler: McpHandler,
    sessions: DashMap<String, mpsc::Sender<Event>>,
}

impl McpState {
    pub fn new(tools: Arc<Tools>) -> Self {
        Self {
            handler: McpHandler::new(tools),
            sessions: DashMap::new(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}

/// Drops the session from the table once its event stream goes away.
struct SessionGuard {
    state: Arc<McpState>,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.state.sessions.remove(&self.session_id);
        tracing::debug!("mcp session {} closed", self.session_id);
    }
}

pub fn create_mcp_router(tools: Arc<Tools>) -> Router {
    router_with_state(Arc::new(McpState::new(tools)))
}

pub fn router_with_state(state: Arc<McpState>) -> Router {
    Router::new()
        .route(SSE_PATH, get(sse_handler))
        .route(MESSAGES_PATH, post(message_handler))
        .route("/messages/", post(message_handler))
        .with_state(state)
}

pub async fn sse_handler(
    State(state): State<Arc<McpState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4().simple().to_string();
    let (tx, rx) = mpsc::channel::<Event>(SESSION_BUFFER);
    state.sessions.insert(session_id.clone(), tx);
    tracing::info!("mcp session {session_id} opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("{MESSAGES_PATH}?session_id={session_id}"));
    let guard = SessionGuard {
        state: state.clone(),
        session_id,
    };

    let messages = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        rx.recv()
            .await
            .map(|event| (Ok::<_, Infallible>(event), (rx, guard)))
    });

    Sse::new(stream::once(async move { Ok::<_, Infallible>(endpoint) }).chain(messages))
        .keep_alive(KeepAlive::default())
}

/// Accepts one JSON-RPC message; the response goes out on the session's
/// event stream.
pub async fn message_handler(
    State(state): State<Arc<McpState>>,
    Query(query): Query<SessionQuery>,
    body: String,
) -> Response {
    let Some(tx) = state
        .sessions
        .get(&query.session_id)
        .map(|entry| entry.value().clone())
    else {
        return (StatusCode::NOT_FOUND, "session not found").into_response();
    };

    let message: Value = match serde_json::from_str(&body) {
        Ok(message) => message,
        Err(e) => {
            let response = RpcError::new(PARSE_ERROR, e.to_string()).into_response(Value::Null);
            let _ = tx.send(json_event(&response)).await;
            return (StatusCode::BAD_REQUEST, "invalid JSON-RPC message").into_response();
        }
    };

    let handler = state.handler.clone();
    tokio::spawn(async move {
        if let Some(response) = handler.handle(message).await {
            if tx.send(json_event(&response)).await.is_err() {
                tracing::debug!("mcp session went away before its response was sent");
            }
        }
    });

    StatusCode::ACCEPTED.into_response()
}

fn json_event(message: &Value) -> Event {
    Event::default().event("message").data(message.to_string())
}
