//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::clock::Clock;
use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::media::MediaStorage;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "Lectern",
    about = "Course platform backend: identity tokens, signed media links and scheduled publishing"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "LECTERN_PORT", default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "LECTERN_DATABASE", default_value = "lectern.db")]
    pub database: String,

    /// Externally visible origin; signed media links point here
    #[arg(long, env = "LECTERN_PUBLIC_URL", default_value = "http://localhost:7291")]
    pub public_url: String,

    /// Directory holding `videos/` and `files/` for session media
    #[arg(long, env = "LECTERN_MEDIA_DIR", default_value = "media")]
    pub media_dir: PathBuf,

    /// Serve media from an object store instead of --media-dir,
    /// e.g. s3://bucket/media, gs://bucket/media or memory:///
    #[arg(long, env = "LECTERN_MEDIA_STORE_URL")]
    pub media_store_url: Option<String>,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Print an identity token for an existing user and exit
    #[arg(long, value_name = "USER_ID")]
    pub issue_token: Option<i64>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    check_secret_length(secret)
}

fn check_secret_length(secret: String) -> Option<String> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }
    Some(secret)
}

/// Parse and validate the public URL.
/// Returns None and logs an error if validation fails.
pub fn validate_public_url(public_url: &str) -> Option<Url> {
    let url = match Url::parse(public_url) {
        Ok(url) => url,
        Err(e) => {
            error!(url = %public_url, error = %e, "Invalid public URL");
            return None;
        }
    };

    let is_https = url.scheme() == "https";
    let is_localhost = url.host_str() == Some("localhost");

    if !is_https && !is_localhost {
        error!("public-url must use HTTPS for non-localhost deployments");
        return None;
    }

    Some(url)
}

/// Pick the media backend: the object store when a store URL is given,
/// otherwise the local directory.
pub fn media_storage(media_dir: PathBuf, media_store_url: Option<&str>) -> Option<MediaStorage> {
    let Some(store_url) = media_store_url else {
        return Some(MediaStorage::Local { root: media_dir });
    };

    let url = match Url::parse(store_url) {
        Ok(url) => url,
        Err(e) => {
            error!(url = %store_url, error = %e, "Invalid media-store-url");
            return None;
        }
    };

    match MediaStorage::from_url(&url) {
        Ok(storage) => {
            info!(scheme = url.scheme(), "Serving media from object store");
            Some(storage)
        }
        Err(e) => {
            error!(url = %store_url, error = %e, "Unsupported media-store-url");
            None
        }
    }
}

/// Handle the --issue-token flag: print a fresh identity token for an existing user.
pub async fn handle_issue_token(db: &Database, jwt_secret: &str, user_id: i64) {
    let user = match db.users().get_by_id(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            error!(user_id, "User not found");
            std::process::exit(1);
        }
        Err(e) => {
            error!(user_id, error = %e, "Failed to look up user");
            std::process::exit(1);
        }
    };

    let issued = JwtConfig::new(jwt_secret.as_bytes()).and_then(|jwt| jwt.issue(user.id, &user.roles));
    match issued {
        Ok(issued) => {
            println!();
            println!("Token for {} <{}>:", user.name, user.email);
            println!("{}", issued.token);
            println!("Expires at: {}", issued.expires_at);
            println!();
        }
        Err(e) => {
            error!(user_id, error = %e, "Failed to issue token");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    public_url: Url,
    media: MediaStorage,
    jwt_secret: String,
) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        public_url,
        media,
        clock: Clock::System,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
