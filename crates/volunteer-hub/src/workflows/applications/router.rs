use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::identity::{authenticate, IdentityProvider};

use super::domain::{ApplicationId, ApplicationStatus, NewOpportunity, OpportunityId};
use super::repository::{
    ApplicationRepository, NotificationPublisher, OpportunityDirectory, RepositoryError,
};
use super::service::{ApplicationService, ApplicationServiceError};

/// Handler state shared by the application routes.
pub struct ApplicationState<R, O, N> {
    pub service: Arc<ApplicationService<R, O, N>>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl<R, O, N> Clone for ApplicationState<R, O, N> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            identity: self.identity.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusChange {
    pub(crate) status: ApplicationStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HoursReport {
    pub(crate) hours: f64,
}

/// Router builder exposing opportunity posting, intake, and lifecycle endpoints.
pub fn application_router<R, O, N>(state: ApplicationState<R, O, N>) -> Router
where
    R: ApplicationRepository + 'static,
    O: OpportunityDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/opportunities", post(post_opportunity_handler::<R, O, N>))
        .route(
            "/api/v1/opportunities/:opportunity_id",
            get(opportunity_handler::<R, O, N>),
        )
        .route(
            "/api/v1/opportunities/:opportunity_id/applications",
            post(apply_handler::<R, O, N>).get(list_handler::<R, O, N>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(status_handler::<R, O, N>),
        )
        .route(
            "/api/v1/applications/:application_id/status",
            post(transition_handler::<R, O, N>),
        )
        .route(
            "/api/v1/applications/:application_id/hours",
            post(log_hours_handler::<R, O, N>),
        )
        .route(
            "/api/v1/applications/:application_id/verify",
            post(verify_handler::<R, O, N>),
        )
        .with_state(state)
}

pub(crate) async fn post_opportunity_handler<R, O, N>(
    State(state): State<ApplicationState<R, O, N>>,
    axum::Json(input): axum::Json<NewOpportunity>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OpportunityDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    match state.service.post_opportunity(input) {
        Ok(opportunity) => (StatusCode::CREATED, axum::Json(opportunity)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn opportunity_handler<R, O, N>(
    State(state): State<ApplicationState<R, O, N>>,
    Path(opportunity_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OpportunityDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    match state.service.opportunity(&OpportunityId(opportunity_id)) {
        Ok(opportunity) => (StatusCode::OK, axum::Json(opportunity)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn apply_handler<R, O, N>(
    State(state): State<ApplicationState<R, O, N>>,
    Path(opportunity_id): Path<String>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OpportunityDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    let student = match authenticate(state.identity.as_ref(), &headers) {
        Ok(user) => user,
        Err(error) => return error.into_response(),
    };

    match state
        .service
        .apply(&student, &OpportunityId(opportunity_id))
    {
        Ok(application) => (StatusCode::CREATED, axum::Json(application)).into_response(),
        Err(ApplicationServiceError::Repository(RepositoryError::Conflict)) => {
            let payload = json!({
                "error": "already applied to this opportunity",
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        Err(error) => service_error(error),
    }
}

pub(crate) async fn list_handler<R, O, N>(
    State(state): State<ApplicationState<R, O, N>>,
    Path(opportunity_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OpportunityDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    match state
        .service
        .list_for_opportunity(&OpportunityId(opportunity_id))
    {
        Ok(applications) => (StatusCode::OK, axum::Json(applications)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn status_handler<R, O, N>(
    State(state): State<ApplicationState<R, O, N>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OpportunityDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    match state.service.get(&ApplicationId(application_id)) {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn transition_handler<R, O, N>(
    State(state): State<ApplicationState<R, O, N>>,
    Path(application_id): Path<String>,
    axum::Json(change): axum::Json<StatusChange>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OpportunityDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    match state
        .service
        .transition(&ApplicationId(application_id), change.status)
    {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn log_hours_handler<R, O, N>(
    State(state): State<ApplicationState<R, O, N>>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    axum::Json(report): axum::Json<HoursReport>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OpportunityDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    let student = match authenticate(state.identity.as_ref(), &headers) {
        Ok(user) => user,
        Err(error) => return error.into_response(),
    };

    match state
        .service
        .log_hours(&ApplicationId(application_id), &student, report.hours)
    {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(error) => service_error(error),
    }
}

pub(crate) async fn verify_handler<R, O, N>(
    State(state): State<ApplicationState<R, O, N>>,
    Path(application_id): Path<String>,
    axum::Json(report): axum::Json<HoursReport>,
) -> Response
where
    R: ApplicationRepository + 'static,
    O: OpportunityDirectory + 'static,
    N: NotificationPublisher + 'static,
{
    match state
        .service
        .verify_hours(&ApplicationId(application_id), report.hours)
    {
        Ok(application) => (StatusCode::OK, axum::Json(application)).into_response(),
        Err(error) => service_error(error),
    }
}

fn service_error(error: ApplicationServiceError) -> Response {
    let status = error.status_code();
    if status.is_server_error() {
        warn!(%error, "application request failed");
    }
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
