//! Bearer-token authentication with role-based access control.
//!
//! Protected routes are wrapped in two middleware layers: `authenticate`
//! resolves the caller's `Principal` from the identity token, then each
//! `require_role` gate checks the resolved role set. Handlers read the
//! principal through its extractor.

mod bearer;
mod errors;
mod extractors;
mod middleware;
mod state;
mod types;

pub use bearer::bearer_token;
pub use errors::{AuthError, AuthErrorKind};
pub use middleware::{authenticate, protected, require_role};
pub use state::AuthBackend;
pub use types::Principal;
