use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::tools::{self, ToolDescriptor, ToolError, Tools};

use super::models::{ErrorResponse, HealthResponse};

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn list_tools_handler() -> Json<Vec<ToolDescriptor>> {
    Json(tools::descriptors())
}

/// Runs one tool. Tool-level failures are values and come back as 200; only
/// an unknown tool or unusable arguments are HTTP errors.
pub async fn call_tool_handler(
    State(tools): State<Arc<Tools>>,
    Path(name): Path<String>,
    Json(args): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<ErrorResponse>)> {
    let start = Instant::now();

    let out = tools.call(&name, args).await.map_err(|e| {
        let status = match &e {
            ToolError::UnknownTool(_) => StatusCode::NOT_FOUND,
            ToolError::InvalidArguments { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        };
        (
            status,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })?;

    tracing::info!(
        tool = %name,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "tool call finished"
    );
    Ok(Json(out))
}
