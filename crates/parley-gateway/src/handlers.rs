// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the webhook gateway.
//!
//! Handles GET /webhook (subscription verification), POST /webhook
//! (signed receive with fire-and-forget ingestion), GET /healthz.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::server::GatewayState;
use crate::signature;

/// Query parameters of the provider's subscription verification handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode", default)]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token", default)]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge", default)]
    pub challenge: Option<String>,
}

/// Response body for POST /webhook.
#[derive(Debug, Serialize)]
pub struct ReceiveResponse {
    /// Generated delivery id, usable with `reprocess`.
    pub delivery_id: String,
    /// Always "accepted": processing happens after the ACK.
    pub status: String,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// GET /webhook
///
/// Echoes `hub.challenge` when the verify token matches configuration.
pub async fn get_webhook(
    State(state): State<GatewayState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let Some(expected) = state.channel.verify_token.as_deref() else {
        return (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "webhook verification is not configured".to_string(),
            }),
        )
            .into_response();
    };

    let mode_ok = params.mode.as_deref() == Some("subscribe");
    let token_ok = params.verify_token.as_deref() == Some(expected);
    if mode_ok && token_ok {
        let challenge = params.challenge.unwrap_or_default();
        info!("webhook subscription verified");
        (StatusCode::OK, challenge).into_response()
    } else {
        warn!("webhook verification rejected");
        (
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "verification failed".to_string(),
            }),
        )
            .into_response()
    }
}

/// POST /webhook
///
/// Validates the X-Hub-Signature-256 header when an app secret is
/// configured, persists nothing itself, spawns ingestion as a background
/// task, and ACKs immediately so the upstream deadline is always met.
pub async fn post_webhook(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(app_secret) = state.channel.app_secret.as_deref() {
        let header = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !signature::verify_signature(app_secret, &body, header) {
            warn!("webhook signature rejected");
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "invalid signature".to_string(),
                }),
            )
                .into_response();
        }
    }

    let delivery_id = uuid::Uuid::new_v4().to_string();
    let raw = String::from_utf8_lossy(&body).into_owned();
    let pipeline = state.pipeline.clone();
    {
        let delivery_id = delivery_id.clone();
        tokio::spawn(async move {
            match pipeline.ingest(&delivery_id, &raw).await {
                Ok(report) => {
                    if !report.errors.is_empty() {
                        warn!(
                            delivery_id,
                            errors = report.errors.len(),
                            "delivery processed with itemized errors"
                        );
                    }
                }
                Err(e) => {
                    // Delivery stays unprocessed; operators can reprocess.
                    warn!(delivery_id, error = %e, "delivery ingestion failed");
                }
            }
        });
    }

    (
        StatusCode::OK,
        Json(ReceiveResponse {
            delivery_id,
            status: "accepted".to_string(),
        }),
    )
        .into_response()
}

/// GET /healthz
///
/// Liveness probe against the backing store.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    match state.pipeline.health_check().await {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_params_deserialize_from_hub_keys() {
        let params: VerifyParams = serde_urlencoded_from_str(
            "hub.mode=subscribe&hub.verify_token=tok&hub.challenge=12345",
        );
        assert_eq!(params.mode.as_deref(), Some("subscribe"));
        assert_eq!(params.verify_token.as_deref(), Some("tok"));
        assert_eq!(params.challenge.as_deref(), Some("12345"));
    }

    fn serde_urlencoded_from_str(query: &str) -> VerifyParams {
        let uri: axum::http::Uri = format!("/webhook?{query}").parse().unwrap();
        let Query(params) =
            Query::<VerifyParams>::try_from_uri(&uri).expect("query should parse");
        params
    }

    #[test]
    fn receive_response_serializes() {
        let resp = ReceiveResponse {
            delivery_id: "d1".to_string(),
            status: "accepted".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"delivery_id\":\"d1\""));
        assert!(json.contains("\"status\":\"accepted\""));
    }
}
