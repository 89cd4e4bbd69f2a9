use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::Value;
use std::sync::Arc;

use crate::bridge::{deliver, plan};
use crate::config::FailurePolicy;
use crate::publisher::Publisher;
use crate::types::SensorReport;

#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<dyn Publisher>,
    pub on_publish_error: FailurePolicy,
}

pub async fn healthz() -> Json<Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Any POST, whatever the path. Other methods are not implemented.
pub async fn fallback(
    method: Method,
    state: State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if method == Method::POST {
        ingest(state, headers, body).await
    } else {
        respond(StatusCode::NOT_IMPLEMENTED, "not implemented")
    }
}

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request_id = headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    // Only the declared length counts; no header means an empty body.
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    let body = &body[..declared.min(body.len())];

    let report = match SensorReport::from_slice(body) {
        Ok(report) => report,
        Err(e) => {
            tracing::warn!(%request_id, error = %e, "rejected sensor report");
            return respond(e.status(), &e.to_string());
        }
    };

    let sensor = report.sensor_name();
    let messages = match plan(&report) {
        Ok(messages) => messages,
        Err(e) => {
            tracing::error!(%request_id, %sensor, error = %e, "failed to encode mqtt payloads");
            return respond(StatusCode::INTERNAL_SERVER_ERROR, "failed to encode payloads");
        }
    };
    tracing::info!(
        %request_id,
        %sensor,
        measurements = report.measurements.len(),
        "sensor report received"
    );

    match deliver(state.publisher.as_ref(), &messages, state.on_publish_error).await {
        Ok(outcome) if outcome.failed > 0 => {
            tracing::warn!(
                %request_id,
                %sensor,
                delivered = outcome.delivered,
                failed = outcome.failed,
                "sensor report partially forwarded to mqtt"
            );
            respond(StatusCode::OK, "OK")
        }
        Ok(outcome) => {
            tracing::info!(%request_id, %sensor, delivered = outcome.delivered, "sensor report forwarded to mqtt");
            respond(StatusCode::OK, "OK")
        }
        Err(e) => respond(StatusCode::BAD_GATEWAY, &format!("mqtt publish failed: {e}")),
    }
}

fn respond(status: StatusCode, message: &str) -> Response {
    let body = message.to_owned();
    (
        status,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/ascii")),
            (header::CONTENT_LENGTH, HeaderValue::from(body.len())),
        ],
        body,
    )
        .into_response()
}
