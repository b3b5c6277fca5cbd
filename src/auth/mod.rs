use axum::{routing::get, Router};

use crate::state::AppState;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod password;
pub mod session;

pub const SESSION_COOKIE: &str = "loginify_session";

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/signup/",
            get(handlers::signup_form).post(handlers::signup),
        )
        .route("/login/", get(handlers::login_form).post(handlers::login))
        .route("/logout/", get(handlers::logout))
        .route("/dashboard/", get(handlers::dashboard))
        .route("/profile/", get(handlers::profile))
}
