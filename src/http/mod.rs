//! HTTP/JSON binding.
//!
//! Routes:
//!   GET  /                 server info + supported commands
//!   GET  /health           liveness (always 200) + bridge/device reachability
//!   GET  /devices          parsed device table
//!   GET  /commands         JSON Schema for every command
//!   POST /command          `{ "command": <name>, "params": {...} }`
//!   POST /command/{name}   params object as the whole body
//!
//! Status codes: 200 ok, 400 validation, 404 unknown command,
//! 502 bridge failure or missing bridge, 503 device unavailable, 504 timeout.

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{ErrorKind, RelayError};
use crate::relay::{Relay, Reply};

pub fn router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/devices", get(devices))
        .route("/commands", get(commands))
        .route("/command", post(command_envelope))
        .route("/command/{name}", post(command_named))
        .with_state(relay)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(relay: Arc<Relay>, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(listen = %addr, commands = relay.registry().len(), "http relay started");
    axum::serve(listener, router(relay))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
        })
        .await
        .context("http server failed")
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CommandRequest {
    command: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct OkBody {
    status: &'static str,
    #[serde(flatten)]
    reply: Reply,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                status: "error",
                command: None,
                error: "bad_request",
                message: message.into(),
                field: None,
            },
        }
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::UnknownCommand => StatusCode::NOT_FOUND,
        ErrorKind::BridgeNotFound | ErrorKind::ExternalFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::DeviceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        let kind = err.kind();
        Self {
            status: status_for(kind),
            body: ErrorBody {
                status: "error",
                command: Some(err.command().to_string()),
                error: kind.as_str(),
                message: err.to_string(),
                field: err.field().map(str::to_string),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

async fn root(State(relay): State<Arc<Relay>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "bridge": relay.bridge().program(),
        "supported_commands": relay.registry().names(),
    }))
}

async fn health(State(relay): State<Arc<Relay>>) -> Json<Value> {
    let h = relay.health().await;
    Json(serde_json::to_value(&h).unwrap_or_else(|_| json!({"process_live": true})))
}

async fn devices(State(relay): State<Arc<Relay>>) -> Result<Json<Value>, ApiError> {
    let list = relay.devices().await?;
    Ok(Json(json!({
        "status": "ok",
        "count": list.len(),
        "devices": list,
    })))
}

async fn commands(State(relay): State<Arc<Relay>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "commands": relay.registry().describe(),
    }))
}

async fn command_envelope(
    State(relay): State<Arc<Relay>>,
    body: Bytes,
) -> Result<Json<OkBody>, ApiError> {
    let req: CommandRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::bad_request(format!("invalid request body: {e}")))?;
    run(&relay, &req.command, &req.params).await
}

async fn command_named(
    State(relay): State<Arc<Relay>>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<OkBody>, ApiError> {
    let params = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("invalid request body: {e}")))?
    };
    run(&relay, &name, &params).await
}

async fn run(relay: &Relay, command: &str, params: &Value) -> Result<Json<OkBody>, ApiError> {
    let reply = relay.dispatch(command, params).await?;
    Ok(Json(OkBody {
        status: "ok",
        reply,
    }))
}
