use axum::{
    extract::{FromRequest, Query, Request, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use serde_json::json;
use tower_cookies::{Cookie, Cookies};
use tracing::{error, info, instrument};

use crate::{
    auth::{
        dto::{LoginForm, ResponseMode, SignupQuery, SignupRequest},
        password::verify_password,
        session::Session,
        SESSION_COOKIE,
    },
    error::AppError,
    state::AppState,
    templates,
    users::{repo::User, services},
};

const MSG_LOGIN_FIELDS: &str = "Both email and password are required.";
const MSG_BAD_CREDENTIALS: &str = "Invalid email or password. Please try again.";
const MSG_SIGNUP_FAILED: &str = "An error occurred during signup. Please try again.";
const MSG_LOGIN_FAILED: &str = "An error occurred during login. Please try again.";

/// GET /signup/ - HTML form, or a usage hint for JSON callers.
#[instrument(skip_all)]
pub async fn signup_form(headers: HeaderMap, Query(q): Query<SignupQuery>) -> Response {
    let wants_json = ResponseMode::detect(&headers) == ResponseMode::Json
        || q.format.as_deref() == Some("json");
    if wants_json {
        return Json(json!({
            "message":
                "Send POST request with JSON data: {\"username\": \"...\", \"email\": \"...\", \"password\": \"...\"}"
        }))
        .into_response();
    }
    Html(templates::signup_page(None)).into_response()
}

/// POST /signup/ - accepts form fields or a JSON body. The response shape
/// (HTML flow vs JSON envelope) is picked once from the Content-Type.
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    cookies: Cookies,
    req: Request,
) -> Response {
    let mode = ResponseMode::detect(req.headers());

    let payload = match mode {
        ResponseMode::Json => match Json::<SignupRequest>::from_request(req, &state).await {
            Ok(Json(p)) => p,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"status": "error", "message": "Invalid JSON data"})),
                )
                    .into_response();
            }
        },
        ResponseMode::Html => match Form::<SignupRequest>::from_request(req, &state).await {
            Ok(Form(p)) => p,
            Err(_) => return Html(templates::signup_page(Some(services::MSG_FIELDS_REQUIRED)))
                .into_response(),
        },
    };

    let username = payload.username.unwrap_or_default();
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    match services::create_user(&state.db, &username, &email, &password).await {
        Ok(user) => match mode {
            ResponseMode::Json => (
                StatusCode::CREATED,
                Json(json!({
                    "status": "success",
                    "message": "User created successfully",
                    "user": {"username": user.username, "email": user.email},
                })),
            )
                .into_response(),
            ResponseMode::Html => match establish_session(&state, &cookies, &user).await {
                Ok(()) => Redirect::to("/dashboard/").into_response(),
                Err(e) => {
                    error!(error = %e, "session creation after signup failed");
                    Html(templates::signup_page(Some(MSG_SIGNUP_FAILED))).into_response()
                }
            },
        },
        Err(err) => signup_error(mode, err),
    }
}

fn signup_error(mode: ResponseMode, err: AppError) -> Response {
    let (status, message) = match &err {
        AppError::Validation(m) | AppError::Conflict(m) => {
            (StatusCode::BAD_REQUEST, m.clone())
        }
        other => {
            error!(error = %other, "signup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, MSG_SIGNUP_FAILED.to_string())
        }
    };
    match mode {
        ResponseMode::Json => (
            status,
            Json(json!({"status": "error", "message": message})),
        )
            .into_response(),
        ResponseMode::Html => Html(templates::signup_page(Some(&message))).into_response(),
    }
}

/// GET /login/
#[instrument(skip_all)]
pub async fn login_form(State(state): State<AppState>, cookies: Cookies) -> Response {
    if let Some(session) = current_session(&state, &cookies).await {
        return Html(templates::already_logged_in_page(&session.username)).into_response();
    }
    Html(templates::login_page(None)).into_response()
}

/// POST /login/ - form fields only. A live session short-circuits without
/// reauthenticating; failures are deliberately undifferentiated.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Response {
    if let Some(session) = current_session(&state, &cookies).await {
        return Html(templates::already_logged_in_page(&session.username)).into_response();
    }

    let email = form.email.unwrap_or_default();
    let password = form.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return Html(templates::login_page(Some(MSG_LOGIN_FIELDS))).into_response();
    }

    let user = match User::find_by_email(&state.db, &email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            return Html(templates::login_page(Some(MSG_BAD_CREDENTIALS))).into_response();
        }
        Err(e) => {
            // A storage outage is not a credentials problem; say so
            // generically instead of blaming the caller.
            error!(error = %e, "login lookup failed");
            return Html(templates::login_page(Some(MSG_LOGIN_FAILED))).into_response();
        }
    };

    match verify_password(&password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return Html(templates::login_page(Some(MSG_BAD_CREDENTIALS))).into_response();
        }
        Err(e) => {
            error!(error = %e, username = %user.username, "password verify failed");
            return Html(templates::login_page(Some(MSG_LOGIN_FAILED))).into_response();
        }
    }

    match establish_session(&state, &cookies, &user).await {
        Ok(()) => {
            info!(username = %user.username, "user logged in");
            Redirect::to("/dashboard/").into_response()
        }
        Err(e) => {
            error!(error = %e, "session creation failed");
            Html(templates::login_page(Some(MSG_LOGIN_FAILED))).into_response()
        }
    }
}

/// GET /logout/ - clears the session and cookie; safe to call twice.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Redirect {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        if let Err(e) = state.sessions.destroy(cookie.value()).await {
            error!(error = %e, "session destroy failed");
        }
        let mut removal = Cookie::from(SESSION_COOKIE);
        removal.set_path("/");
        cookies.remove(removal);
        info!("user logged out");
    }
    Redirect::to("/login/")
}

/// GET /dashboard/ [session-gated]
#[instrument(skip_all)]
pub async fn dashboard(gate: crate::auth::extractors::CurrentUser) -> Html<String> {
    Html(templates::dashboard_page(&gate.user.username))
}

/// GET /profile/ [session-gated]. Reconciles the session's cached email
/// against the live record before rendering.
#[instrument(skip_all)]
pub async fn profile(
    State(state): State<AppState>,
    gate: crate::auth::extractors::CurrentUser,
) -> Html<String> {
    let user = gate.user;

    if user.email != gate.session.email {
        if let Err(e) = state.sessions.update_email(&gate.session.token, &user.email).await {
            error!(error = %e, "session email refresh failed");
        }
    }

    let picture_url = match &user.profile_picture {
        Some(key) => state.storage.presign_get(key, 600).await.ok(),
        None => None,
    };

    Html(templates::profile_page(
        &user.username,
        &user.email,
        picture_url.as_deref(),
    ))
}

async fn current_session(state: &AppState, cookies: &Cookies) -> Option<Session> {
    let cookie = cookies.get(SESSION_COOKIE)?;
    state.sessions.get(cookie.value()).await.ok().flatten()
}

async fn establish_session(
    state: &AppState,
    cookies: &Cookies,
    user: &User,
) -> anyhow::Result<()> {
    let session = state.sessions.create(&user.username, &user.email).await?;
    let mut cookie = Cookie::new(SESSION_COOKIE, session.token);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookies.add(cookie);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_error_json_keeps_conflict_message() {
        let res = signup_error(
            ResponseMode::Json,
            AppError::Conflict(services::MSG_EMAIL_TAKEN.into()),
        );
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn signup_error_hides_internal_details() {
        let res = signup_error(
            ResponseMode::Json,
            AppError::Internal(anyhow::anyhow!("pool exhausted")),
        );
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn signup_error_html_renders_form_again() {
        let res = signup_error(
            ResponseMode::Html,
            AppError::Validation(services::MSG_FIELDS_REQUIRED.into()),
        );
        assert_eq!(res.status(), StatusCode::OK);
    }
}
