//! Identity resolution and role gates as axum middleware.

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
};

use super::bearer::bearer_token;
use super::errors::AuthError;
use super::state::AuthBackend;
use super::types::Principal;
use crate::db::Role;

/// Resolve the caller from the bearer token and attach the `Principal` to the request.
/// Missing and invalid tokens are indistinguishable to the client.
pub async fn authenticate(
    State(backend): State<AuthBackend>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let Some(token) = bearer_token(request.headers()) else {
        tracing::debug!(path = %request.uri().path(), "No bearer token");
        return Err(AuthError::not_authenticated());
    };

    let claims = backend
        .jwt
        .validate_at(token, backend.clock.now())
        .map_err(|_| AuthError::not_authenticated())?;

    request.extensions_mut().insert(Principal::from(claims));
    Ok(next.run(request).await)
}

/// Reject callers that do not hold `role`. Must run inside `authenticate`.
pub async fn require_role(
    State(role): State<Role>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .ok_or_else(AuthError::not_authenticated)?;

    if !principal.has_role(role) {
        tracing::debug!(
            user_id = principal.user_id,
            required = role.as_str(),
            "Missing required role"
        );
        return Err(AuthError::insufficient_role());
    }

    Ok(next.run(request).await)
}

/// Wrap every route registered on `router` so far: identity resolution first,
/// then one gate per required role, then the handler.
pub fn protected<S>(router: Router<S>, backend: AuthBackend, roles: &[Role]) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // Layers added later run earlier, so gates go on before authentication.
    let router = roles.iter().fold(router, |router, role| {
        router.route_layer(middleware::from_fn_with_state(*role, require_role))
    });
    router.route_layer(middleware::from_fn_with_state(backend, authenticate))
}
