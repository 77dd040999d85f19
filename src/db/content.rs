//! Events and sessions: the publishable content items.
//!
//! Both tables share the `publish_status` / `publish_at` columns. Ownership is
//! never stored on the item itself; it is resolved by joining through the
//! owning organization.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct ContentStore {
    pool: SqlitePool,
}

/// Which content table an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Event,
    Session,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Event => "event",
            ContentKind::Session => "session",
        }
    }

    /// Human readable name for messages.
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Event => "Event",
            ContentKind::Session => "Session",
        }
    }

    fn owner_query(&self) -> &'static str {
        match self {
            ContentKind::Event => {
                "SELECT o.owner_user_id FROM events e
                 JOIN organizations o ON o.id = e.organization_id
                 WHERE e.id = ?"
            }
            ContentKind::Session => {
                "SELECT o.owner_user_id FROM sessions s
                 JOIN events e ON e.id = s.event_id
                 JOIN organizations o ON o.id = e.organization_id
                 WHERE s.id = ?"
            }
        }
    }

    fn state_query(&self) -> &'static str {
        match self {
            ContentKind::Event => "SELECT publish_status, publish_at FROM events WHERE id = ?",
            ContentKind::Session => "SELECT publish_status, publish_at FROM sessions WHERE id = ?",
        }
    }

    fn owned_update_query(&self) -> &'static str {
        match self {
            ContentKind::Event => {
                "UPDATE events SET publish_status = ?, publish_at = ?
                 WHERE id = ? AND organization_id IN (
                     SELECT id FROM organizations WHERE owner_user_id = ?
                 )"
            }
            ContentKind::Session => {
                "UPDATE sessions SET publish_status = ?, publish_at = ?
                 WHERE id = ? AND event_id IN (
                     SELECT e.id FROM events e
                     JOIN organizations o ON o.id = e.organization_id
                     WHERE o.owner_user_id = ?
                 )"
            }
        }
    }
}

/// Publication lifecycle of an event or session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PublishStatus {
    Draft,
    Scheduled,
    Published,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Draft => "DRAFT",
            PublishStatus::Scheduled => "SCHEDULED",
            PublishStatus::Published => "PUBLISHED",
        }
    }
}

impl std::str::FromStr for PublishStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(PublishStatus::Draft),
            "SCHEDULED" => Ok(PublishStatus::Scheduled),
            "PUBLISHED" => Ok(PublishStatus::Published),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A `publish_status` value outside DRAFT / SCHEDULED / PUBLISHED.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl std::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown publish status {:?}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

/// Current publication state of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishState {
    pub status: PublishStatus,
    /// Unix seconds. Always set while SCHEDULED.
    pub publish_at: Option<i64>,
}

impl PublishState {
    pub fn draft() -> Self {
        Self {
            status: PublishStatus::Draft,
            publish_at: None,
        }
    }

    pub fn published() -> Self {
        Self {
            status: PublishStatus::Published,
            publish_at: None,
        }
    }

    pub fn scheduled(publish_at: i64) -> Self {
        Self {
            status: PublishStatus::Scheduled,
            publish_at: Some(publish_at),
        }
    }
}

/// A session together with the user that owns it through its organization.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    pub id: i64,
    pub event_id: i64,
    pub title: String,
    pub video_ref: Option<String>,
    pub file_ref: Option<String>,
    pub owner_user_id: i64,
}

/// A scheduled item waiting for the publisher.
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct ScheduledItem {
    pub kind: String,
    pub id: i64,
    pub title: String,
    pub publish_at: i64,
}

impl ContentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a draft event. Returns the event ID.
    pub async fn create_event(&self, organization_id: i64, title: &str) -> Result<i64, sqlx::Error> {
        let result = sqlx::query("INSERT INTO events (organization_id, title) VALUES (?, ?)")
            .bind(organization_id)
            .bind(title)
            .execute(&self.pool)
            .await?;
        Ok(result.last_insert_rowid())
    }

    /// Create a draft session. Media references are either stored filenames or
    /// external URLs. Returns the session ID.
    pub async fn create_session(
        &self,
        event_id: i64,
        title: &str,
        video_ref: Option<&str>,
        file_ref: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO sessions (event_id, title, video_ref, file_ref) VALUES (?, ?, ?, ?)",
        )
        .bind(event_id)
        .bind(title)
        .bind(video_ref)
        .bind(file_ref)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get the user ID owning an item, or `None` if the item does not exist.
    pub async fn owner_of(&self, kind: ContentKind, id: i64) -> Result<Option<i64>, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(kind.owner_query())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }

    /// Get the publication state of an item.
    pub async fn get_state(
        &self,
        kind: ContentKind,
        id: i64,
    ) -> Result<Option<PublishState>, sqlx::Error> {
        let row: Option<(String, Option<i64>)> = sqlx::query_as(kind.state_query())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|(status, publish_at)| -> Result<PublishState, sqlx::Error> {
            let status = status
                .parse::<PublishStatus>()
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
            Ok(PublishState { status, publish_at })
        })
        .transpose()
    }

    /// Set the publication state of an item owned by `owner_user_id`.
    /// Returns false if the item does not exist or belongs to someone else.
    pub async fn set_state(
        &self,
        kind: ContentKind,
        id: i64,
        owner_user_id: i64,
        state: PublishState,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(kind.owned_update_query())
            .bind(state.status.as_str())
            .bind(state.publish_at)
            .bind(id)
            .bind(owner_user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Publish every scheduled event and session whose time has come.
    ///
    /// One set-based UPDATE per table inside a single transaction; only
    /// `publish_status` is written. Returns (events, sessions) published.
    pub async fn publish_due(&self, now: i64) -> Result<(u64, u64), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let events = sqlx::query(
            "UPDATE events SET publish_status = 'PUBLISHED'
             WHERE publish_status = 'SCHEDULED' AND publish_at <= ?",
        )
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let sessions = sqlx::query(
            "UPDATE sessions SET publish_status = 'PUBLISHED'
             WHERE publish_status = 'SCHEDULED' AND publish_at <= ?",
        )
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;
        Ok((events, sessions))
    }

    /// List items still waiting to be published, soonest first.
    pub async fn list_scheduled(&self) -> Result<Vec<ScheduledItem>, sqlx::Error> {
        sqlx::query_as(
            "SELECT 'event' AS kind, id, title, publish_at FROM events
             WHERE publish_status = 'SCHEDULED' AND publish_at IS NOT NULL
             UNION ALL
             SELECT 'session' AS kind, id, title, publish_at FROM sessions
             WHERE publish_status = 'SCHEDULED' AND publish_at IS NOT NULL
             ORDER BY publish_at, kind, id",
        )
        .fetch_all(&self.pool)
        .await
    }

    /// Sessions whose video reference equals `reference`.
    pub async fn sessions_by_video_ref(&self, reference: &str) -> Result<Vec<Session>, sqlx::Error> {
        sqlx::query_as(
            "SELECT s.id, s.event_id, s.title, s.video_ref, s.file_ref, o.owner_user_id
             FROM sessions s
             JOIN events e ON e.id = s.event_id
             JOIN organizations o ON o.id = e.organization_id
             WHERE s.video_ref = ?
             ORDER BY s.id",
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await
    }

    /// Sessions whose downloadable file reference equals `reference`.
    pub async fn sessions_by_file_ref(&self, reference: &str) -> Result<Vec<Session>, sqlx::Error> {
        sqlx::query_as(
            "SELECT s.id, s.event_id, s.title, s.video_ref, s.file_ref, o.owner_user_id
             FROM sessions s
             JOIN events e ON e.id = s.event_id
             JOIN organizations o ON o.id = e.organization_id
             WHERE s.file_ref = ?
             ORDER BY s.id",
        )
        .bind(reference)
        .fetch_all(&self.pool)
        .await
    }
}
