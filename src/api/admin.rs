//! Admin API endpoints.
//!
//! All endpoints require admin role.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde::Serialize;

use super::error::{ApiError, ResultExt};
use super::publish::format_timestamp;
use crate::auth::{AuthBackend, protected};
use crate::db::{Database, Role};

/// State for admin endpoints.
#[derive(Clone)]
pub struct AdminState {
    pub db: Database,
}

pub fn router(state: AdminState, auth: AuthBackend) -> Router {
    let router = Router::new().route("/scheduled", get(list_scheduled));
    protected(router, auth, &[Role::Admin]).with_state(state)
}

#[derive(Serialize)]
struct ScheduledResponse {
    kind: String,
    id: i64,
    title: String,
    publish_at: Option<String>,
}

/// List events and sessions waiting for the publisher, soonest first.
async fn list_scheduled(State(state): State<AdminState>) -> Result<impl IntoResponse, ApiError> {
    let items = state
        .db
        .content()
        .list_scheduled()
        .await
        .db_err("Failed to list scheduled content")?;

    let items: Vec<ScheduledResponse> = items
        .into_iter()
        .map(|item| ScheduledResponse {
            kind: item.kind,
            id: item.id,
            title: item.title,
            publish_at: format_timestamp(item.publish_at),
        })
        .collect();

    Ok(Json(items))
}
