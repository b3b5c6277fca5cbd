use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::auth::password::hash_password;
use crate::error::AppError;
use crate::users::repo::User;

pub const MAX_USERNAME_LEN: usize = 50;
pub const MAX_PASSWORD_LEN: usize = 12;

pub const MSG_FIELDS_REQUIRED: &str = "All fields are required.";
pub const MSG_EMAIL_TAKEN: &str = "Email already exists. Please use a different email.";
pub const MSG_USERNAME_TAKEN: &str = "Username already exists. Please choose a different username.";
pub const MSG_USERNAME_CONFLICT: &str = "Username already exists";
pub const MSG_INVALID_EMAIL: &str = "Enter a valid email address.";

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Field-level checks shared by the web and JSON signup paths.
pub fn validate_signup(username: &str, email: &str, password: &str) -> Result<(), AppError> {
    if username.is_empty() || email.is_empty() || password.is_empty() {
        return Err(AppError::Validation(MSG_FIELDS_REQUIRED.into()));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(AppError::Validation(format!(
            "Username must be at most {MAX_USERNAME_LEN} characters."
        )));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at most {MAX_PASSWORD_LEN} characters."
        )));
    }
    if !is_valid_email(email) {
        return Err(AppError::Validation(MSG_INVALID_EMAIL.into()));
    }
    Ok(())
}

/// Create a user after uniqueness checks. The pre-checks give the
/// user-facing messages; the constraint mapping below catches the race where
/// a concurrent signup wins between check and insert.
pub async fn create_user(
    db: &PgPool,
    username: &str,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    validate_signup(username, email, password)?;

    if User::email_exists(db, email).await? {
        warn!(email, "signup rejected: email taken");
        return Err(AppError::Conflict(MSG_EMAIL_TAKEN.into()));
    }
    if User::username_exists(db, username).await? {
        warn!(username, "signup rejected: username taken");
        return Err(AppError::Conflict(MSG_USERNAME_TAKEN.into()));
    }

    let hash = hash_password(password)?;
    let user = User::create(db, username, email, &hash)
        .await
        .map_err(map_unique_violation)?;

    info!(username = %user.username, email = %user.email, "user created");
    Ok(user)
}

/// Apply an update request: optional new username, optional new password.
/// A username change re-keys the record inside one transaction; a
/// password-only change is a plain field update.
pub async fn apply_update(
    db: &PgPool,
    user: User,
    new_username: Option<String>,
    new_password: Option<String>,
) -> Result<User, AppError> {
    let new_username = new_username.unwrap_or_else(|| user.username.clone());
    if new_username.is_empty() || new_username.len() > MAX_USERNAME_LEN {
        return Err(AppError::Validation(format!(
            "Username must be between 1 and {MAX_USERNAME_LEN} characters."
        )));
    }
    if let Some(p) = &new_password {
        if p.is_empty() || p.len() > MAX_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be between 1 and {MAX_PASSWORD_LEN} characters."
            )));
        }
    }

    let new_hash = match &new_password {
        Some(p) => hash_password(p)?,
        None => user.password_hash.clone(),
    };

    if new_username != user.username {
        if User::username_exists(db, &new_username).await? {
            return Err(AppError::Conflict(MSG_USERNAME_CONFLICT.into()));
        }
        let renamed = User::rename(db, &user, &new_username, &new_hash)
            .await
            .map_err(map_unique_violation)?;
        info!(old = %user.username, new = %renamed.username, "user renamed");
        return Ok(renamed);
    }

    if new_password.is_some() {
        let updated = User::update_password(db, &user.username, &new_hash).await?;
        info!(username = %updated.username, "password updated");
        return Ok(updated);
    }

    Ok(user)
}

/// Translate a unique-key violation into the conflict the caller would have
/// reported, instead of surfacing a raw storage error.
fn map_unique_violation(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            let msg = match db_err.constraint() {
                Some("users_email_key") => MSG_EMAIL_TAKEN,
                _ => MSG_USERNAME_TAKEN,
            };
            return AppError::Conflict(msg.into());
        }
    }
    AppError::Database(e)
}
