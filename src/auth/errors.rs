//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Why a request was turned away at the authentication boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Missing, malformed, tampered or expired token. Deliberately one kind.
    NotAuthenticated,
    /// Valid identity without the required role.
    InsufficientRole,
}

/// Authentication errors rendered as JSON.
#[derive(Debug)]
pub struct AuthError {
    pub kind: AuthErrorKind,
}

impl AuthError {
    pub fn not_authenticated() -> Self {
        Self {
            kind: AuthErrorKind::NotAuthenticated,
        }
    }

    pub fn insufficient_role() -> Self {
        Self {
            kind: AuthErrorKind::InsufficientRole,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self.kind {
            AuthErrorKind::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AuthErrorKind::InsufficientRole => StatusCode::FORBIDDEN,
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotAuthenticated => "Not authenticated",
            AuthErrorKind::InsufficientRole => "Insufficient permissions",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
