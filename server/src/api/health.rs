use crate::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Query engine in use, e.g. "athena"
    pub engine: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}

/// Liveness check. Does not contact the engine.
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        engine: state.client.engine_name().to_string(),
    })
}

#[derive(OpenApi)]
#[openapi(paths(health), components(schemas(HealthResponse)))]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use crate::api::test_support::{app, get_json};
    use axum::http::StatusCode;
    use foodprint_core::FakeEngine;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health() {
        let engine = Arc::new(FakeEngine::new());
        let (status, body) = get_json(app(engine.clone()), "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "ok", "engine": "fake"}));
        assert!(engine.submitted_queries().is_empty());
    }
}
