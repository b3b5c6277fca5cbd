use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_cookies::{Cookie, Cookies};
use tracing::warn;

use crate::auth::session::Session;
use crate::auth::SESSION_COOKIE;
use crate::state::AppState;
use crate::users::repo::User;

/// Session gate for protected handlers. Resolves the cookie to a session and
/// the session to a live user record; any failure clears the stale cookie
/// and redirects to the login page before the handler body runs.
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
}

fn login_redirect(cookies: &Cookies) -> Response {
    let mut removal = Cookie::from(SESSION_COOKIE);
    removal.set_path("/");
    cookies.remove(removal);
    Redirect::to("/login/").into_response()
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|e| e.into_response())?;

        let Some(cookie) = cookies.get(SESSION_COOKIE) else {
            return Err(Redirect::to("/login/").into_response());
        };
        let token = cookie.value().to_string();

        let session = match state.sessions.get(&token).await {
            Ok(Some(s)) => s,
            Ok(None) => return Err(login_redirect(&cookies)),
            Err(e) => {
                warn!(error = %e, "session lookup failed");
                return Err(login_redirect(&cookies));
            }
        };

        // The record may have been deleted or renamed since login;
        // invalidate the session lazily rather than serving a ghost user.
        let user = match User::find_by_username(&state.db, &session.username).await {
            Ok(Some(u)) => u,
            Ok(None) => {
                warn!(username = %session.username, "session user no longer exists");
                let _ = state.sessions.destroy(&token).await;
                return Err(login_redirect(&cookies));
            }
            Err(e) => {
                warn!(error = %e, "user lookup failed");
                return Err(login_redirect(&cookies));
            }
        };

        Ok(CurrentUser { user, session })
    }
}
