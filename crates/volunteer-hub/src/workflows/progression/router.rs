use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::warn;

use crate::identity::{authenticate, IdentityProvider};

use super::domain::{QuestFacts, QuestKey};
use super::repository::{BadgeStore, ClaimStore, HoursSource, XpLedger};
use super::service::{ProgressionError, ProgressionService};

/// Handler state: the service plus the collaborators the routes resolve per request.
pub struct ProgressionState<C, B, L> {
    pub service: Arc<ProgressionService<C, B, L>>,
    pub identity: Arc<dyn IdentityProvider>,
    pub hours: Arc<dyn HoursSource>,
}

impl<C, B, L> Clone for ProgressionState<C, B, L> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            identity: self.identity.clone(),
            hours: self.hours.clone(),
        }
    }
}

/// Router exposing quest listing, claiming, and XP progress.
pub fn progression_router<C, B, L>(state: ProgressionState<C, B, L>) -> Router
where
    C: ClaimStore + 'static,
    B: BadgeStore + 'static,
    L: XpLedger + 'static,
{
    Router::new()
        .route("/api/v1/quests", post(quests_handler::<C, B, L>))
        .route(
            "/api/v1/quests/:quest_key/claim",
            post(claim_handler::<C, B, L>),
        )
        .route("/api/v1/progress", get(progress_handler::<C, B, L>))
        .with_state(state)
}

pub(crate) async fn quests_handler<C, B, L>(
    State(state): State<ProgressionState<C, B, L>>,
    headers: HeaderMap,
    axum::Json(facts): axum::Json<QuestFacts>,
) -> Response
where
    C: ClaimStore + 'static,
    B: BadgeStore + 'static,
    L: XpLedger + 'static,
{
    let user = match authenticate(state.identity.as_ref(), &headers) {
        Ok(user) => user,
        Err(error) => return error.into_response(),
    };

    match state.service.quests(&user, &facts) {
        Ok(quests) => (StatusCode::OK, axum::Json(quests)).into_response(),
        Err(error) => progression_error(error),
    }
}

pub(crate) async fn claim_handler<C, B, L>(
    State(state): State<ProgressionState<C, B, L>>,
    Path(quest_key): Path<String>,
    headers: HeaderMap,
    axum::Json(facts): axum::Json<QuestFacts>,
) -> Response
where
    C: ClaimStore + 'static,
    B: BadgeStore + 'static,
    L: XpLedger + 'static,
{
    let user = match authenticate(state.identity.as_ref(), &headers) {
        Ok(user) => user,
        Err(error) => return error.into_response(),
    };

    match state.service.claim(&user, &QuestKey(quest_key), &facts) {
        Ok(receipt) if receipt.claimed => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Ok(receipt) => (StatusCode::CONFLICT, axum::Json(receipt)).into_response(),
        Err(error) => progression_error(error),
    }
}

pub(crate) async fn progress_handler<C, B, L>(
    State(state): State<ProgressionState<C, B, L>>,
    headers: HeaderMap,
) -> Response
where
    C: ClaimStore + 'static,
    B: BadgeStore + 'static,
    L: XpLedger + 'static,
{
    let user = match authenticate(state.identity.as_ref(), &headers) {
        Ok(user) => user,
        Err(error) => return error.into_response(),
    };

    let total_hours = match state.hours.verified_hours(&user) {
        Ok(hours) => hours,
        Err(error) => return progression_error(error.into()),
    };

    let progress = match state.service.progress(&user, total_hours) {
        Ok(progress) => progress,
        Err(error) => return progression_error(error),
    };

    match state.service.badges(&user) {
        Ok(badges) => {
            let payload = json!({
                "user_id": user,
                "total_hours": total_hours,
                "progress": progress,
                "badges": badges,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => progression_error(error),
    }
}

fn progression_error(error: ProgressionError) -> Response {
    let status = error.status_code();
    if status.is_server_error() {
        warn!(%error, "progression request failed");
    }
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
