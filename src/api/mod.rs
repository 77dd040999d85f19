mod admin;
mod error;
mod media;
mod publish;
mod whoami;

use axum::Router;
use std::sync::Arc;

use crate::auth::AuthBackend;
use crate::db::{ContentKind, Database};
use crate::media::{MediaSigner, MediaStorage};

pub use error::ApiError;
pub use publish::{format_timestamp, parse_timestamp};

/// Create the API router.
pub fn create_api_router(
    db: Database,
    auth: AuthBackend,
    signer: Arc<MediaSigner>,
    storage: MediaStorage,
) -> Router {
    let media_state = media::MediaState {
        db: db.clone(),
        signer,
        storage,
        clock: auth.clock.clone(),
    };

    let events_state = publish::PublishApiState {
        db: db.clone(),
        kind: ContentKind::Event,
    };

    let sessions_state = publish::PublishApiState {
        db: db.clone(),
        kind: ContentKind::Session,
    };

    let admin_state = admin::AdminState { db };

    let sessions = Router::new()
        .merge(media::router(media_state, auth.clone()))
        .merge(publish::router(sessions_state, auth.clone()));

    Router::new()
        .nest("/auth", whoami::router(auth.clone()))
        .nest("/events", publish::router(events_state, auth.clone()))
        .nest("/sessions", sessions)
        .nest("/admin", admin::router(admin_state, auth))
}
