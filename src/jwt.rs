//! Identity token generation and validation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::clock::unix_now;
use crate::db::RoleSet;

/// Issuer label written into every identity token.
pub const TOKEN_ISSUER: &str = "lectern";

/// Identity token duration: 24 hours
pub const TOKEN_DURATION_SECS: i64 = 24 * 60 * 60;

/// JWT claims for identity tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Subject (user ID)
    pub sub: i64,
    /// Roles held by the user when the token was issued
    pub roles: RoleSet,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

/// Result of issuing an identity token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: i64,
}

/// Signing and verification keys derived from the process-wide secret.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret.
    /// An empty secret is a startup misconfiguration.
    pub fn new(secret: &[u8]) -> Result<Self, JwtError> {
        if secret.is_empty() {
            return Err(JwtError::EmptySecret);
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    /// Issue a token for a user, valid for 24 hours from now.
    pub fn issue(&self, user_id: i64, roles: &RoleSet) -> Result<IssuedToken, JwtError> {
        self.issue_at(user_id, roles, unix_now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        user_id: i64,
        roles: &RoleSet,
        now: i64,
    ) -> Result<IssuedToken, JwtError> {
        let exp = now + TOKEN_DURATION_SECS;
        let claims = IdentityClaims {
            sub: user_id,
            roles: roles.clone(),
            iat: now,
            exp,
            iss: TOKEN_ISSUER.to_string(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            expires_at: exp,
        })
    }

    /// Validate and decode a token against the current time.
    pub fn validate(&self, token: &str) -> Result<IdentityClaims, JwtError> {
        self.validate_at(token, unix_now())
    }

    /// Validate and decode a token as if the current time were `now`.
    /// A token is expired from the second its `exp` is reached.
    pub fn validate_at(&self, token: &str, now: i64) -> Result<IdentityClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the supplied clock.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[TOKEN_ISSUER]);

        let token_data =
            jsonwebtoken::decode::<IdentityClaims>(token, &self.decoding_key, &validation)
                .map_err(|e| {
                    tracing::debug!(error = %e, "Rejected identity token");
                    JwtError::InvalidToken
                })?;

        if token_data.claims.exp <= now {
            tracing::debug!(exp = token_data.claims.exp, now, "Identity token expired");
            return Err(JwtError::InvalidToken);
        }

        Ok(token_data.claims)
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// No signing secret configured
    EmptySecret,
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Malformed, tampered, foreign or expired token
    InvalidToken,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::EmptySecret => write!(f, "JWT secret is empty"),
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::InvalidToken => write!(f, "Invalid or expired token"),
        }
    }
}

impl std::error::Error for JwtError {}
