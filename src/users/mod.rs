use axum::{
    routing::{delete, get},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/", get(handlers::list_users))
        .route("/user/:email/", get(handlers::get_user))
        .route(
            "/user/:email/update/",
            get(handlers::get_user_for_update)
                .post(handlers::update_user)
                .put(handlers::update_user),
        )
        .route(
            "/user/:email/delete/",
            delete(handlers::delete_user).post(handlers::delete_user),
        )
}
