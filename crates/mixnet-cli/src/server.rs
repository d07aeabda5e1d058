//! HTTP endpoint.
//!
//! Every route answers `200 OK`; outcomes are carried in the JSON body.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use mixnet_core::{DEFAULT_DESTINATION, MixError, Mixnet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Body returned when no message could be mixed.
pub const FAILED_TO_MIX: &str = "Failed to mix message!";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Network every request is sent through
    pub mixnet: Arc<Mixnet>,
}

/// Request body for `/mix`.
#[derive(Debug, Deserialize)]
pub struct MixRequest {
    /// Message to send
    pub message: Option<String>,
}

/// Response body for `/mix`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixResponse {
    /// Delivered message, or a description of what went wrong
    pub data: String,
    /// Machine-readable error code on session failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MixResponse {
    fn delivered(message: String) -> Self {
        Self {
            data: message,
            error: None,
        }
    }

    fn failed() -> Self {
        Self {
            data: FAILED_TO_MIX.to_string(),
            error: None,
        }
    }

    fn from_error(err: &MixError) -> Self {
        Self {
            data: err.to_string(),
            error: Some(err.kind().to_string()),
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/mix", get(mix).post(mix))
        .route("/", get(empty_ok).post(empty_ok))
        .route("/favicon.ico", get(favicon))
        .with_state(state)
}

/// `GET|POST /mix`: send the `message` field through the network.
///
/// The body is parsed by hand so malformed or missing JSON still answers 200.
async fn mix(State(state): State<AppState>, body: Bytes) -> Json<MixResponse> {
    let Some(message) = parse_message(&body) else {
        debug!("mix request without a message field");
        return Json(MixResponse::failed());
    };

    let mixnet = &state.mixnet;
    let response = match mixnet
        .send_with_timeout(&message, DEFAULT_DESTINATION, mixnet.session_timeout())
        .await
    {
        Ok(delivery) if delivery.message.is_empty() => MixResponse::failed(),
        Ok(delivery) => MixResponse::delivered(delivery.message),
        Err(e) => MixResponse::from_error(&e),
    };

    Json(response)
}

fn parse_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<MixRequest>(body).ok()?.message
}

async fn empty_ok() -> StatusCode {
    StatusCode::OK
}

async fn favicon() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "data": "invalid endpoint" }))
}

/// Serve the router on `addr` until Ctrl+C.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "mix endpoint listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message() {
        assert_eq!(
            parse_message(br#"{"message": "hello"}"#),
            Some("hello".to_string())
        );
        assert_eq!(parse_message(br#"{"other": 1}"#), None);
        assert_eq!(parse_message(br#"{"message": null}"#), None);
        assert_eq!(parse_message(b"not json"), None);
        assert_eq!(parse_message(b""), None);
    }

    #[test]
    fn test_error_response_carries_kind() {
        let response = MixResponse::from_error(&MixError::InsufficientNodes {
            requested: 6,
            available: 3,
        });

        assert_eq!(response.error.as_deref(), Some("insufficient_nodes"));
        assert!(response.data.contains("Insufficient nodes"));
    }

    #[test]
    fn test_success_response_omits_error() {
        let json = serde_json::to_string(&MixResponse::delivered("hi".to_string())).unwrap();
        assert_eq!(json, r#"{"data":"hi"}"#);
    }
}
