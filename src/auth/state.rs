//! Shared state for the authentication layers.

use std::sync::Arc;

use crate::clock::Clock;
use crate::jwt::JwtConfig;

/// What the authentication middleware needs to validate identity tokens.
#[derive(Clone)]
pub struct AuthBackend {
    pub jwt: Arc<JwtConfig>,
    pub clock: Clock,
}

impl AuthBackend {
    pub fn new(jwt: Arc<JwtConfig>, clock: Clock) -> Self {
        Self { jwt, clock }
    }
}
