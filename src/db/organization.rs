use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct OrganizationStore {
    pool: SqlitePool,
}

impl OrganizationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an organization owned by a user. Returns the organization ID.
    pub async fn create(&self, owner_user_id: i64, name: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO organizations (owner_user_id, name) VALUES (?, ?)")
            .bind(owner_user_id)
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }
}
