//! Authentication user types.

use serde::Serialize;

use crate::db::{Role, RoleSet};
use crate::jwt::IdentityClaims;

/// The caller of a protected request, resolved from a valid identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: i64,
    pub roles: RoleSet,
}

impl Principal {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(role)
    }
}

impl From<IdentityClaims> for Principal {
    fn from(claims: IdentityClaims) -> Self {
        Self {
            user_id: claims.sub,
            roles: claims.roles,
        }
    }
}
