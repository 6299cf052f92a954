use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::mcp::create_mcp_router;
use crate::tools::Tools;

pub mod handlers;
pub mod models;

pub fn create_router(tools: Arc<Tools>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/tools", get(handlers::list_tools_handler))
        .route("/tools/:name", post(handlers::call_tool_handler))
        .with_state(tools.clone())
        // MCP over SSE: GET /sse, POST /messages
        .merge(create_mcp_router(tools))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
