//! Session media: signed link issuance and the stream gate.
//!
//! Issuing a link requires authentication and entitlement to the media.
//! Streaming is a public route; the signed link itself is the credential and
//! is checked before any storage access. Bytes are always served by the gate,
//! whatever the backend.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{
        Path, Query, Request, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use object_store::{ObjectStore, path::Path as ObjectPath};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use super::error::{ApiError, ResultExt};
use crate::auth::{AuthBackend, Principal, protected};
use crate::clock::Clock;
use crate::db::{Database, Role, Session};
use crate::media::{
    MediaKind, MediaLinkError, MediaLocation, MediaSigner, MediaStorage, is_external_ref,
    is_safe_filename,
};

/// State for media endpoints.
#[derive(Clone)]
pub struct MediaState {
    pub db: Database,
    pub signer: Arc<MediaSigner>,
    pub storage: MediaStorage,
    pub clock: Clock,
}

pub fn router(state: MediaState, auth: AuthBackend) -> Router {
    let links = Router::new()
        .route("/signed-video/{filename}", get(signed_video))
        .route("/signed-file/{filename}", get(signed_file));
    let links = protected(links, auth, &[]).with_state(state.clone());

    let streams = Router::new()
        .route("/video/{filename}", get(stream_video))
        .route("/file/{filename}", get(stream_file))
        .with_state(state);

    Router::new().merge(links).merge(streams)
}

// --- Link issuance ---

#[derive(Serialize)]
struct SignedUrlResponse {
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
}

async fn signed_video(
    State(state): State<MediaState>,
    principal: Principal,
    filename: Result<Path<String>, PathRejection>,
) -> Result<Json<SignedUrlResponse>, ApiError> {
    let Path(filename) = filename?;
    signed_url(&state, &principal, MediaKind::Video, &filename).await
}

async fn signed_file(
    State(state): State<MediaState>,
    principal: Principal,
    filename: Result<Path<String>, PathRejection>,
) -> Result<Json<SignedUrlResponse>, ApiError> {
    let Path(filename) = filename?;
    signed_url(&state, &principal, MediaKind::File, &filename).await
}

async fn signed_url(
    state: &MediaState,
    principal: &Principal,
    kind: MediaKind,
    filename: &str,
) -> Result<Json<SignedUrlResponse>, ApiError> {
    let sessions = match kind {
        MediaKind::Video => state.db.content().sessions_by_video_ref(filename).await,
        MediaKind::File => state.db.content().sessions_by_file_ref(filename).await,
    }
    .db_err("Failed to look up sessions")?;

    if sessions.is_empty() {
        return Err(ApiError::not_found("Media not found"));
    }

    if !is_entitled(&state.db, principal, &sessions).await? {
        tracing::info!(
            user_id = principal.user_id,
            filename,
            "Denied media link to user without entitlement"
        );
        return Err(ApiError::forbidden("Not entitled to this media"));
    }

    if is_external_ref(filename) {
        return Ok(Json(SignedUrlResponse {
            url: filename.to_string(),
            expires_at: None,
        }));
    }

    if !is_safe_filename(filename) {
        return Err(ApiError::not_found("Media not found"));
    }

    let link = state
        .signer
        .issue_link(kind, principal.user_id, filename, state.clock.now())?;

    tracing::debug!(
        user_id = principal.user_id,
        filename,
        expires_at = link.expires_at,
        "Issued media link"
    );

    Ok(Json(SignedUrlResponse {
        url: link.url.into(),
        expires_at: Some(link.expires_at),
    }))
}

/// Admins, the owning organization and buyers of any session using the media.
async fn is_entitled(
    db: &Database,
    principal: &Principal,
    sessions: &[Session],
) -> Result<bool, ApiError> {
    if principal.has_role(Role::Admin) {
        return Ok(true);
    }
    if sessions.iter().any(|s| s.owner_user_id == principal.user_id) {
        return Ok(true);
    }
    for session in sessions {
        if db
            .purchases()
            .has_purchased(principal.user_id, session.id)
            .await
            .db_err("Failed to check purchase")?
        {
            return Ok(true);
        }
    }
    Ok(false)
}

// --- Stream gate ---

/// Link parameters as presented. Every field is optional and a query that
/// does not deserialize at all (e.g. a repeated `token`) is an invalid
/// signature rather than a query rejection.
#[derive(Deserialize)]
struct LinkParams {
    token: Option<String>,
    exp: Option<String>,
    uid: Option<String>,
}

struct ValidLink {
    user_id: i64,
    token: String,
    exp: i64,
}

impl LinkParams {
    fn parse(query: Result<Query<Self>, QueryRejection>) -> Result<ValidLink, MediaLinkError> {
        let Query(params) = query.map_err(|_| MediaLinkError::InvalidSignature)?;
        let token = params.token.ok_or(MediaLinkError::InvalidSignature)?;
        let exp = params
            .exp
            .and_then(|v| v.parse().ok())
            .ok_or(MediaLinkError::InvalidSignature)?;
        let user_id = params
            .uid
            .and_then(|v| v.parse().ok())
            .ok_or(MediaLinkError::InvalidSignature)?;
        Ok(ValidLink {
            user_id,
            token,
            exp,
        })
    }
}

async fn stream_video(
    State(state): State<MediaState>,
    filename: Result<Path<String>, PathRejection>,
    params: Result<Query<LinkParams>, QueryRejection>,
    request: Request,
) -> Result<Response, ApiError> {
    let Path(filename) = filename?;
    stream(&state, MediaKind::Video, &filename, params, request).await
}

async fn stream_file(
    State(state): State<MediaState>,
    filename: Result<Path<String>, PathRejection>,
    params: Result<Query<LinkParams>, QueryRejection>,
    request: Request,
) -> Result<Response, ApiError> {
    let Path(filename) = filename?;
    stream(&state, MediaKind::File, &filename, params, request).await
}

async fn stream(
    state: &MediaState,
    kind: MediaKind,
    filename: &str,
    params: Result<Query<LinkParams>, QueryRejection>,
    request: Request,
) -> Result<Response, ApiError> {
    let link = LinkParams::parse(params).inspect_err(|_| {
        tracing::debug!(filename, "Media link with missing parameters");
    })?;

    state
        .signer
        .verify(link.user_id, filename, link.exp, &link.token, state.clock.now())
        .inspect_err(|e| {
            tracing::debug!(user_id = link.user_id, filename, error = %e, "Rejected media link");
        })?;

    let location = state
        .storage
        .locate(kind, filename)
        .await
        .io_err("Failed to resolve media")?
        .ok_or_else(|| ApiError::not_found("File not found"))?;

    match location {
        MediaLocation::File(path) => Ok(serve_file(path, request).await),
        MediaLocation::Object { store, path, size } => {
            serve_object(store.as_ref(), &path, size, filename).await
        }
    }
}

/// Stream a local file with its content type guessed from the extension.
/// Range requests are honoured.
async fn serve_file(path: std::path::PathBuf, request: Request) -> Response {
    let result: Result<_, Infallible> = ServeFile::new(path).oneshot(request).await;
    match result {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

/// Stream an object through the gate with its content type guessed from the
/// filename.
async fn serve_object(
    store: &dyn ObjectStore,
    path: &ObjectPath,
    size: u64,
    filename: &str,
) -> Result<Response, ApiError> {
    let object = match store.get(path).await {
        Ok(object) => object,
        // Deleted between the lookup and the read.
        Err(object_store::Error::NotFound { .. }) => {
            return Err(ApiError::not_found("File not found"));
        }
        Err(e) => return Err(ApiError::storage_error("Failed to read media", e)),
    };

    let content_type = mime_guess::from_path(filename).first_or_octet_stream();
    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
        ],
        Body::from_stream(object.into_stream()),
    )
        .into_response())
}
