//! HTTP surface of the matching service.
//!
//! # Routes
//!
//! | Path | Method | Description |
//! |------|--------|-------------|
//! | /matching/time-slots/{id}/match | POST | Trigger a matching run |
//! | /matching/time-slots/{id}/groups | GET | Read persisted groups |
//! | /matching/services/health | GET | Probe collaborator liveness |

use crate::orchestrator::{CoordinatorError, MatchingCoordinator, MatchingOutcome};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use roster::RosterError;
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use store::{DinnerGroup, MatchStore, StoreError, TimeSlotId, UserId};
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<MatchingCoordinator>,
    pub store: Arc<MatchStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/matching/time-slots/{id}/match", post(trigger_match))
        .route("/matching/time-slots/{id}/groups", get(slot_groups))
        .route("/matching/services/health", get(services_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error envelope: `{ "success": false, "error": "..." }` with a status
/// chosen per error class.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<CoordinatorError> for ApiError {
    fn from(e: CoordinatorError) -> Self {
        let status = match &e {
            // Precondition failures: recoverable by the caller.
            CoordinatorError::UnhealthyServices(_) => StatusCode::SERVICE_UNAVAILABLE,
            CoordinatorError::Roster(RosterError::SlotNotFound(_)) => StatusCode::NOT_FOUND,
            CoordinatorError::Roster(RosterError::InsufficientSignups { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            CoordinatorError::Store(StoreError::SlotNotFound(_)) => StatusCode::NOT_FOUND,
            CoordinatorError::Store(StoreError::AlreadyGrouped(_))
            | CoordinatorError::Store(StoreError::GroupingInProgress(_)) => StatusCode::CONFLICT,
            // Upstream scoring failures.
            CoordinatorError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            // Everything else is on us.
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!("Matching run failed: {e}");
        }
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "success": false, "error": self.message })),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct MatchRunResponse {
    success: bool,
    #[serde(flatten)]
    outcome: MatchingOutcome,
}

/// POST /matching/time-slots/{id}/match
async fn trigger_match(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MatchRunResponse>, ApiError> {
    let outcome = state.coordinator.run_complete_matching(id).await?;
    Ok(Json(MatchRunResponse {
        success: true,
        outcome,
    }))
}

#[derive(Serialize)]
struct GroupWithMembers {
    #[serde(flatten)]
    group: DinnerGroup,
    members: Vec<UserId>,
}

#[derive(Serialize)]
struct SlotGroupsResponse {
    time_slot_id: TimeSlotId,
    slot_status: store::SlotStatus,
    groups: Vec<GroupWithMembers>,
}

/// GET /matching/time-slots/{id}/groups
async fn slot_groups(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SlotGroupsResponse>, ApiError> {
    let slot = state
        .store
        .time_slot(id)
        .await
        .ok_or_else(|| ApiError::not_found(format!("Time slot {id} not found")))?;

    let mut groups = Vec::new();
    for group in state.store.groups_for_slot(id).await {
        let members = state
            .store
            .members_for_group(&group.id)
            .await
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        groups.push(GroupWithMembers { group, members });
    }

    Ok(Json(SlotGroupsResponse {
        time_slot_id: slot.id,
        slot_status: slot.status,
        groups,
    }))
}

#[derive(Serialize)]
struct HealthMapResponse {
    all_healthy: bool,
    services: HashMap<String, bool>,
}

/// GET /matching/services/health
async fn services_health(State(state): State<AppState>) -> Json<HealthMapResponse> {
    let services = state.coordinator.services_health().await;
    let all_healthy = services.values().all(|healthy| *healthy);
    Json(HealthMapResponse {
        all_healthy,
        services,
    })
}
