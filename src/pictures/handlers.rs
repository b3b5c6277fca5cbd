use axum::{
    extract::{Multipart, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{error, instrument};

use crate::{
    auth::extractors::CurrentUser,
    error::AppError,
    pictures::services,
    state::AppState,
    templates,
};

fn picture_error(message: &str) -> Response {
    Html(templates::message_page("Upload failed", message, "/profile/")).into_response()
}

/// POST /upload-picture/ [session-gated, multipart]. Expects a `picture`
/// field; validation failures come back as a page with the reason.
#[instrument(skip_all)]
pub async fn upload_picture(
    State(state): State<AppState>,
    gate: CurrentUser,
    mut multipart: Multipart,
) -> Response {
    let mut upload: Option<(String, bytes::Bytes)> = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("picture") {
            let filename = field.file_name().unwrap_or_default().to_string();
            match field.bytes().await {
                Ok(bytes) => upload = Some((filename, bytes)),
                Err(e) => {
                    error!(error = %e, "reading multipart field failed");
                    return picture_error("Failed to read the uploaded file.");
                }
            }
            break;
        }
    }

    let Some((filename, bytes)) = upload else {
        return picture_error("No file selected.");
    };

    match services::store_picture(&state, &gate.user, &filename, bytes).await {
        Ok(_) => Redirect::to("/profile/").into_response(),
        Err(AppError::Validation(reason)) => picture_error(&reason),
        Err(e) => {
            error!(error = %e, username = %gate.user.username, "picture upload failed");
            picture_error("Failed to store the picture. Please try again.")
        }
    }
}

/// POST /remove-picture/ [session-gated]. No-op with a message when there
/// is no picture to remove.
#[instrument(skip_all)]
pub async fn remove_picture(State(state): State<AppState>, gate: CurrentUser) -> Response {
    match services::remove_picture(&state, &gate.user).await {
        Ok(true) => Redirect::to("/profile/").into_response(),
        Ok(false) => Html(templates::message_page(
            "Nothing to remove",
            "You do not have a profile picture set.",
            "/profile/",
        ))
        .into_response(),
        Err(e) => {
            error!(error = %e, username = %gate.user.username, "picture removal failed");
            picture_error("Failed to remove the picture. Please try again.")
        }
    }
}
