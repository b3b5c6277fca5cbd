use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::{
    error::AppError,
    state::AppState,
    users::{
        dto::{UpdateUserRequest, UserOut},
        repo::User,
        services,
    },
};

fn not_found(email: &str) -> AppError {
    AppError::NotFound(format!("User with email {email} not found"))
}

/// GET /users/
#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let users = User::list_all(&state.db).await?;
    let users: Vec<UserOut> = users.iter().map(UserOut::from).collect();
    Ok(Json(json!({
        "status": "success",
        "count": users.len(),
        "users": users,
    })))
}

/// GET /user/:email/ - the router percent-decodes the path segment, so
/// `a%40x.com` arrives here as `a@x.com`.
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| not_found(&email))?;
    Ok(Json(json!({
        "status": "success",
        "user": UserOut::from(user),
    })))
}

/// GET /user/:email/update/ - echoes current state plus a usage hint.
#[instrument(skip(state))]
pub async fn get_user_for_update(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| not_found(&email))?;
    Ok(Json(json!({
        "status": "success",
        "user": UserOut::from(user),
        "message": "Use POST/PUT to update this user",
    })))
}

/// POST|PUT /user/:email/update/ - optional `username` and/or `password`.
#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(req) = payload.map_err(|_| AppError::Validation("Invalid JSON data".into()))?;

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| not_found(&email))?;

    let updated = services::apply_update(&state.db, user, req.username, req.password).await?;

    Ok(Json(json!({
        "status": "success",
        "message": "User updated successfully",
        "user": UserOut::from(updated),
    })))
}

/// DELETE|POST /user/:email/delete/
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user = User::delete_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| not_found(&email))?;

    info!(username = %user.username, email = %user.email, "user deleted");
    Ok(Json(json!({
        "status": "success",
        "message": format!(
            "User {} with email {} deleted successfully",
            user.username, user.email
        ),
    })))
}
