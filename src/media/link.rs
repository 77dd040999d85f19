//! Signed media links.
//!
//! A link binds `{user id, filename, expiry}` under an HMAC-SHA256 tag and
//! carries them as `token`, `exp` and `uid` query parameters. Nothing is
//! persisted: the gate recomputes the tag from the presented parameters.
//! Links are not single use and stay valid until they expire.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

use super::MediaKind;

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of a signed media link: 10 minutes
pub const MEDIA_LINK_TTL_SECS: i64 = 10 * 60;

/// Label mixed into the process secret so link tags and identity tokens
/// never share a key.
const KEY_DERIVATION_LABEL: &[u8] = b"lectern/media-link/v1";

/// A freshly issued link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedLink {
    pub url: Url,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: i64,
}

/// Issues and verifies signed media links.
#[derive(Clone)]
pub struct MediaSigner {
    /// Keyed with the derived link key; cloned for every tag.
    keyed: HmacSha256,
    public_url: Url,
}

impl MediaSigner {
    /// `public_url` is the externally visible origin the links point at.
    pub fn new(secret: &[u8], public_url: Url) -> Result<Self, MediaLinkError> {
        if secret.is_empty() {
            return Err(MediaLinkError::EmptySecret);
        }
        if public_url.cannot_be_a_base() {
            return Err(MediaLinkError::InvalidBaseUrl);
        }

        let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| MediaLinkError::EmptySecret)?;
        mac.update(KEY_DERIVATION_LABEL);
        let key = mac.finalize().into_bytes();
        let keyed = HmacSha256::new_from_slice(&key).map_err(|_| MediaLinkError::EmptySecret)?;

        Ok(Self {
            keyed,
            public_url,
        })
    }

    fn mac(&self, user_id: i64, filename: &str, exp: i64) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(format!("{}:{}:{}", user_id, filename, exp).as_bytes());
        mac
    }

    /// Signature over the bound fields, base64url without padding.
    pub fn sign(&self, user_id: i64, filename: &str, exp: i64) -> String {
        URL_SAFE_NO_PAD.encode(self.mac(user_id, filename, exp).finalize().into_bytes())
    }

    /// Issue a link to `filename` for `user_id`, expiring `MEDIA_LINK_TTL_SECS` after `now`.
    /// The caller must already have checked that the user is entitled to the file.
    pub fn issue_link(
        &self,
        kind: MediaKind,
        user_id: i64,
        filename: &str,
        now: i64,
    ) -> Result<SignedLink, MediaLinkError> {
        let exp = now + MEDIA_LINK_TTL_SECS;
        let token = self.sign(user_id, filename, exp);

        let mut url = self.public_url.clone();
        url.path_segments_mut()
            .map_err(|_| MediaLinkError::InvalidBaseUrl)?
            .pop_if_empty()
            .extend(["api", "sessions", kind.route_segment(), filename]);
        url.query_pairs_mut()
            .append_pair("token", &token)
            .append_pair("exp", &exp.to_string())
            .append_pair("uid", &user_id.to_string());

        Ok(SignedLink {
            url,
            expires_at: exp,
        })
    }

    /// Check a presented link. The signature is checked before the expiry so a
    /// forged link never learns whether its timestamp would have been accepted.
    pub fn verify(
        &self,
        user_id: i64,
        filename: &str,
        exp: i64,
        token: &str,
        now: i64,
    ) -> Result<(), MediaLinkError> {
        let tag = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| MediaLinkError::InvalidSignature)?;

        self.mac(user_id, filename, exp)
            .verify_slice(&tag)
            .map_err(|_| MediaLinkError::InvalidSignature)?;

        if exp <= now {
            return Err(MediaLinkError::LinkExpired);
        }

        Ok(())
    }
}

/// Errors from issuing or checking signed media links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaLinkError {
    /// No signing secret configured
    EmptySecret,
    /// Public URL cannot carry path segments
    InvalidBaseUrl,
    /// Tag missing, malformed or not matching the bound fields
    InvalidSignature,
    /// Link used at or after its expiry
    LinkExpired,
}

impl std::fmt::Display for MediaLinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaLinkError::EmptySecret => write!(f, "Media link secret is empty"),
            MediaLinkError::InvalidBaseUrl => write!(f, "Public URL cannot be used as a base"),
            MediaLinkError::InvalidSignature => write!(f, "Invalid signature"),
            MediaLinkError::LinkExpired => write!(f, "Link expired"),
        }
    }
}

impl std::error::Error for MediaLinkError {}
