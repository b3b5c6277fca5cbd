use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

/// A live session row. `email` is a cached copy of the user's email at
/// login time; the profile view reconciles it against the record.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub token: String,
    pub username: String,
    pub email: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// Durable session store over the `sessions` table. Tokens are opaque UUIDs
/// carried in a cookie; rows expire `ttl_hours` after creation and are
/// removed lazily when a stale token is presented.
#[derive(Clone)]
pub struct SessionStore {
    db: PgPool,
    ttl_hours: i64,
}

impl SessionStore {
    pub fn new(db: PgPool, ttl_hours: i64) -> Self {
        Self { db, ttl_hours }
    }

    /// Create a fresh session for a user. Login and signup both call this,
    /// so every authentication gets a new token and a full TTL.
    pub async fn create(&self, username: &str, email: &str) -> sqlx::Result<Session> {
        let token = Uuid::new_v4().to_string();
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (token, username, email, expires_at)
            VALUES ($1, $2, $3, now() + make_interval(hours => $4))
            RETURNING token, username, email, created_at, expires_at
            "#,
        )
        .bind(&token)
        .bind(username)
        .bind(email)
        .bind(self.ttl_hours as i32)
        .fetch_one(&self.db)
        .await?;
        debug!(username, "session created");
        Ok(session)
    }

    /// Look up a non-expired session. Expired rows for this token are
    /// deleted on the way out.
    pub async fn get(&self, token: &str) -> sqlx::Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT token, username, email, created_at, expires_at
            FROM sessions
            WHERE token = $1 AND expires_at > now()
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await?;

        if session.is_none() {
            // Token unknown or past its TTL; drop whatever is there.
            sqlx::query("DELETE FROM sessions WHERE token = $1")
                .bind(token)
                .execute(&self.db)
                .await?;
        }
        Ok(session)
    }

    pub async fn destroy(&self, token: &str) -> sqlx::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.db)
            .await?;
        debug!("session destroyed");
        Ok(())
    }

    /// Refresh the cached email after the live record changed.
    pub async fn update_email(&self, token: &str, email: &str) -> sqlx::Result<()> {
        sqlx::query("UPDATE sessions SET email = $2 WHERE token = $1")
            .bind(token)
            .bind(email)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
