use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

/// User record. `username` is the primary key, so a rename is a
/// delete-plus-insert performed inside one transaction (see [`User::rename`]).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub profile_picture: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const USER_COLUMNS: &str =
    "username, email, password_hash, profile_picture, created_at, updated_at";

impl User {
    pub async fn find_by_username(db: &PgPool, username: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(db)
            .await
    }

    pub async fn username_exists(db: &PgPool, username: &str) -> sqlx::Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(db)
                .await?;
        Ok(exists)
    }

    pub async fn email_exists(db: &PgPool, email: &str) -> sqlx::Result<bool> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(db)
                .await?;
        Ok(exists)
    }

    pub async fn list_all(db: &PgPool) -> sqlx::Result<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(db)
        .await
    }

    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    pub async fn update_password(
        db: &PgPool,
        username: &str,
        password_hash: &str,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET password_hash = $2, updated_at = now()
            WHERE username = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(username)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    /// Change the primary key. The delete and the insert commit together, so
    /// a concurrent reader never observes the email without a record.
    /// `created_at` and the picture reference are carried over; the picture
    /// object is not moved, so a carried key keeps the old username in its
    /// path. It still points at a live object, and the next upload re-keys
    /// it under the new name.
    pub async fn rename(
        db: &PgPool,
        user: &User,
        new_username: &str,
        new_password_hash: &str,
    ) -> sqlx::Result<User> {
        let mut tx = db.begin().await?;

        sqlx::query("DELETE FROM users WHERE username = $1")
            .bind(&user.username)
            .execute(&mut *tx)
            .await?;

        let renamed = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, profile_picture, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, now())
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new_username)
        .bind(&user.email)
        .bind(new_password_hash)
        .bind(&user.profile_picture)
        .bind(user.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(renamed)
    }

    /// Delete by email, returning the removed record when one existed.
    pub async fn delete_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "DELETE FROM users WHERE email = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn set_profile_picture(
        db: &PgPool,
        username: &str,
        key: Option<&str>,
    ) -> sqlx::Result<()> {
        sqlx::query("UPDATE users SET profile_picture = $2, updated_at = now() WHERE username = $1")
            .bind(username)
            .bind(key)
            .execute(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            username: "alice".into(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$fake".into(),
            profile_picture: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let json = serde_json::to_string(&sample_user()).unwrap();
        assert!(json.contains("alice"));
        assert!(json.contains("a@x.com"));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2"));
    }
}
