//! Identity introspection for the bearer of a token.

use axum::{Json, Router, routing::get};

use crate::auth::{AuthBackend, Principal, protected};

pub fn router(auth: AuthBackend) -> Router {
    protected(Router::new().route("/me", get(me)), auth, &[])
}

async fn me(principal: Principal) -> Json<Principal> {
    Json(principal)
}
