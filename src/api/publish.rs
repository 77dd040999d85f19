//! Publish-state endpoints for events and sessions.
//!
//! All endpoints require the ORGANIZATION role and ownership of the item
//! through its organization.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State, rejection::PathRejection},
    routing::put,
};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ResultExt};
use crate::auth::{AuthBackend, Principal, protected};
use crate::db::{ContentKind, Database, PublishState, PublishStatus, Role};

/// State for publish endpoints. One router per content kind.
#[derive(Clone)]
pub struct PublishApiState {
    pub db: Database,
    pub kind: ContentKind,
}

pub fn router(state: PublishApiState, auth: AuthBackend) -> Router {
    let router = Router::new()
        .route("/{id}/publish", put(publish))
        .route("/{id}/unpublish", put(unpublish))
        .route("/{id}/schedule", put(schedule));
    protected(router, auth, &[Role::Organization]).with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct ScheduleRequest {
    publish_at: Option<String>,
}

#[derive(Serialize)]
struct PublishStateResponse {
    id: i64,
    publish_status: PublishStatus,
    publish_at: Option<String>,
}

// --- Handlers ---

async fn publish(
    State(state): State<PublishApiState>,
    principal: Principal,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<PublishStateResponse>, ApiError> {
    let Path(id) = id?;
    apply(&state, &principal, id, PublishState::published()).await
}

async fn unpublish(
    State(state): State<PublishApiState>,
    principal: Principal,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<PublishStateResponse>, ApiError> {
    let Path(id) = id?;
    apply(&state, &principal, id, PublishState::draft()).await
}

/// Body: `{"publish_at": "<ISO-8601 timestamp>"}`.
async fn schedule(
    State(state): State<PublishApiState>,
    principal: Principal,
    id: Result<Path<i64>, PathRejection>,
    body: Bytes,
) -> Result<Json<PublishStateResponse>, ApiError> {
    let Path(id) = id?;
    let request: ScheduleRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::bad_request("Invalid JSON body"))?;
    let publish_at = request
        .publish_at
        .ok_or_else(|| ApiError::bad_request("Missing publish_at"))?;
    let publish_at = parse_timestamp(&publish_at)
        .ok_or_else(|| ApiError::bad_request("publish_at must be an ISO-8601 timestamp"))?;

    apply(&state, &principal, id, PublishState::scheduled(publish_at)).await
}

async fn apply(
    state: &PublishApiState,
    principal: &Principal,
    id: i64,
    target: PublishState,
) -> Result<Json<PublishStateResponse>, ApiError> {
    let kind = state.kind;
    let content = state.db.content();

    let owner = content
        .owner_of(kind, id)
        .await
        .db_err("Failed to look up owner")?
        .ok_or_else(|| ApiError::not_found(format!("{} not found", kind.label())))?;

    if owner != principal.user_id {
        return Err(ApiError::forbidden("Not the owner of this item"));
    }

    // The update repeats the ownership join, so a concurrent transfer or
    // delete between the two queries leaves the item untouched.
    let updated = content
        .set_state(kind, id, principal.user_id, target)
        .await
        .db_err("Failed to update publish state")?;
    if !updated {
        return Err(ApiError::not_found(format!("{} not found", kind.label())));
    }

    tracing::info!(
        kind = kind.as_str(),
        id,
        user_id = principal.user_id,
        status = target.status.as_str(),
        publish_at = target.publish_at,
        "Publish state changed"
    );

    Ok(Json(PublishStateResponse {
        id,
        publish_status: target.status,
        publish_at: target.publish_at.and_then(format_timestamp),
    }))
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc().timestamp())
}

/// Format Unix seconds as RFC 3339 in UTC.
pub fn format_timestamp(secs: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339() {
        assert_eq!(parse_timestamp("2024-01-01T00:00:00Z"), Some(1_704_067_200));
        assert_eq!(parse_timestamp("2024-01-01T02:00:00+02:00"), Some(1_704_067_200));
    }

    #[test]
    fn test_parse_without_offset_is_utc() {
        assert_eq!(parse_timestamp("2024-01-01T00:00:00"), Some(1_704_067_200));
        assert_eq!(parse_timestamp("2024-01-01T00:00"), Some(1_704_067_200));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_timestamp("tomorrow"), None);
        assert_eq!(parse_timestamp("2024-13-01T00:00:00Z"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(1_704_067_200).as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
    }
}
