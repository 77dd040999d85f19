pub mod api;
pub mod auth;
pub mod cli;
pub mod clock;
pub mod db;
pub mod jwt;
pub mod media;
pub mod publisher;

use api::create_api_router;
use auth::AuthBackend;
use axum::Router;
use clock::Clock;
use db::Database;
use jwt::{JwtConfig, JwtError};
use media::{MediaLinkError, MediaSigner, MediaStorage};
use std::fmt;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use url::Url;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Process secret for identity tokens and media links
    pub jwt_secret: Vec<u8>,
    /// Externally visible origin, used to build signed media links
    pub public_url: Url,
    /// Where session media is stored
    pub media: MediaStorage,
    /// Time source for token and link expiry
    pub clock: Clock,
}

/// Errors raised while assembling the application from its configuration.
#[derive(Debug)]
pub enum StartupError {
    Jwt(JwtError),
    MediaLink(MediaLinkError),
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::Jwt(e) => write!(f, "identity tokens: {}", e),
            StartupError::MediaLink(e) => write!(f, "media links: {}", e),
        }
    }
}

impl std::error::Error for StartupError {}

impl From<JwtError> for StartupError {
    fn from(e: JwtError) -> Self {
        StartupError::Jwt(e)
    }
}

impl From<MediaLinkError> for StartupError {
    fn from(e: MediaLinkError) -> Self {
        StartupError::MediaLink(e)
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Result<Router, StartupError> {
    let jwt = Arc::new(JwtConfig::new(&config.jwt_secret)?);
    let signer = Arc::new(MediaSigner::new(
        &config.jwt_secret,
        config.public_url.clone(),
    )?);
    let auth = AuthBackend::new(jwt, config.clock.clone());

    let api_router = create_api_router(config.db.clone(), auth, signer, config.media.clone());

    Ok(Router::new()
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http()))
}

/// Run the server on the given listener until `shutdown` resolves.
pub async fn run_server<F>(
    config: ServerConfig,
    listener: TcpListener,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_app(&config).map_err(std::io::Error::other)?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
