//! HTTP front end
//!
//! `GET /health` answers `{"status": "ok"}`. `POST /plan` takes a part
//! specification as JSON and returns the pipeline result as JSON. All
//! requests share the one process-wide knowledge base.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use processkit_camtools::PipelineResult;
use processkit_core::{KnowledgeBase, PartSpec};
use processkit_settings::Config;

use crate::plan_part;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub kb: &'static KnowledgeBase,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(kb: &'static KnowledgeBase, config: Config) -> Self {
        Self {
            kb,
            config: Arc::new(config),
        }
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn plan(
    State(state): State<AppState>,
    Json(spec): Json<PartSpec>,
) -> Result<Json<PipelineResult>, StatusCode> {
    plan_part(&spec, state.kb, &state.config, state.config.llm.enabled)
        .await
        .map(Json)
        .map_err(|err| {
            error!(error = %err, "Planning request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

/// Build the router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/plan", post(plan))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serve until the process is stopped
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|err| {
        error!(%addr, error = %err, "Failed to bind");
        err
    })?;
    info!("ProcessKit server running on http://{}", addr);
    info!("  GET  /health");
    info!("  POST /plan");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use processkit_core::load_knowledge_base;
    use tower::ServiceExt;

    fn app() -> Router {
        let kb = load_knowledge_base(None).unwrap();
        router(AppState::new(kb, Config::default()))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn plan_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/plan")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_plan_returns_pipeline_result() {
        let response = app()
            .oneshot(plan_request(
                r#"{"material": "aluminum_6061", "holes": [{"diameter": 6.0, "depth": 10.0, "position": [0.0, 0.0]}]}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["valid"], true);
        assert_eq!(body["state"], "DONE");
        assert_eq!(body["plan"].as_array().unwrap().len(), 2);
        assert_eq!(body["plan"][0]["operation"], "face_milling");
        assert!(body["program"].as_str().unwrap().ends_with("M30\n"));
    }

    #[tokio::test]
    async fn test_plan_unknown_material_is_a_result_not_an_error() {
        let response = app()
            .oneshot(plan_request(r#"{"material": "unobtainium", "holes": []}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["valid"], false);
        assert_eq!(body["state"], "FAILED");
        assert_eq!(body["errors"][0]["kind"], "UnknownMaterial");
    }

    #[tokio::test]
    async fn test_malformed_spec_is_rejected() {
        let response = app()
            .oneshot(plan_request(r#"{"holes": "none"}"#))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
