use std::collections::BTreeSet;

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// Role label carried in identity tokens.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Organization,
    Admin,
    Affiliate,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Organization => "ORGANIZATION",
            Role::Admin => "ADMIN",
            Role::Affiliate => "AFFILIATE",
        }
    }

    /// Parse a stored role label. Unknown labels yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Some(Role::User),
            "ORGANIZATION" => Some(Role::Organization),
            "ADMIN" => Some(Role::Admin),
            "AFFILIATE" => Some(Role::Affiliate),
            _ => None,
        }
    }
}

/// Set of roles held by one user. A user may hold several (e.g. USER + AFFILIATE).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    /// Comma separated form used in the `users.roles` column.
    pub fn to_column(&self) -> String {
        self.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(",")
    }

    /// Parse the `users.roles` column, skipping unknown labels.
    pub fn from_column(s: &str) -> Self {
        s.split(',').filter_map(Role::parse).collect()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Role; N]> for RoleSet {
    fn from(roles: [Role; N]) -> Self {
        roles.into_iter().collect()
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub roles: RoleSet,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    name: String,
    roles: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            name: row.name,
            roles: RoleSet::from_column(&row.roles),
        }
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a user with the given roles. Returns the user ID.
    pub async fn create(
        &self,
        email: &str,
        name: &str,
        roles: &RoleSet,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO users (email, name, roles) VALUES (?, ?, ?)")
            .bind(email)
            .bind(name)
            .bind(roles.to_column())
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, email, name, roles FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Replace the roles of a user.
    pub async fn set_roles(&self, id: i64, roles: &RoleSet) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET roles = ? WHERE id = ?")
            .bind(roles.to_column())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
