use crate::infra::{AppState, Platform};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use std::sync::Arc;
use volunteer_hub::identity::IdentityProvider;
use volunteer_hub::workflows::applications::{application_router, ApplicationState};
use volunteer_hub::workflows::progression::{progression_router, HoursSource, ProgressionState};

/// Intake and progression routes plus the operational endpoints.
pub(crate) fn platform_router(platform: &Platform) -> Router {
    let identity: Arc<dyn IdentityProvider> = platform.identity.clone();
    let hours: Arc<dyn HoursSource> = platform.applications.clone();

    application_router(ApplicationState {
        service: platform.applications.clone(),
        identity: identity.clone(),
    })
    .merge(progression_router(ProgressionState {
        service: platform.progression.clone(),
        identity,
        hours,
    }))
    .route("/health", get(healthcheck))
    .route("/ready", get(readiness_endpoint))
    .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
