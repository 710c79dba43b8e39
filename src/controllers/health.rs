use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::controllers::proxy::ProxyController;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub async fn health_ready(State(controller): State<Arc<ProxyController>>) -> impl IntoResponse {
    if controller.upstream_reachable().await {
        (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "backend": "reachable"
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "not_ready",
                "backend": "unreachable"
            })),
        )
    }
}
