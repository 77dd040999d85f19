//! Purchase records. Checkout and payment live elsewhere; this store only
//! answers "has this user bought this session".

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct PurchaseStore {
    pool: SqlitePool,
}

impl PurchaseStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a completed purchase. Recording the same purchase twice is a no-op.
    pub async fn record(&self, user_id: i64, session_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT OR IGNORE INTO purchases (user_id, session_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn has_purchased(&self, user_id: i64, session_id: i64) -> Result<bool, sqlx::Error> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM purchases WHERE user_id = ? AND session_id = ?")
                .bind(user_id)
                .bind(session_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }
}
