use axum::{extract::DefaultBodyLimit, routing::post, Router};

use crate::state::AppState;

pub mod handlers;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload-picture/", post(handlers::upload_picture))
        .route("/remove-picture/", post(handlers::remove_picture))
        // Above the 5 MiB image cap so oversized uploads still reach the
        // validator and get a displayable rejection.
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
}
