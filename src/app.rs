use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{auth, pictures, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Hello, world!" }))
        .merge(auth::router())
        .merge(pictures::router())
        .merge(users::router())
        .with_state(state)
        .layer(CookieManagerLayer::new())
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use crate::state::AppState;

    async fn body_string(res: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    // Panics on conflicting route registrations, so building the full
    // router is itself the assertion.
    #[tokio::test]
    async fn router_builds_with_fake_state() {
        let _app = build_app(AppState::fake());
    }

    #[tokio::test]
    async fn root_returns_greeting() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_string(res).await, "Hello, world!");
    }

    #[tokio::test]
    async fn signup_get_returns_usage_hint_for_json_callers() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(
                Request::get("/signup/?format=json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains("Send POST request with JSON data"));
    }

    #[tokio::test]
    async fn gated_pages_redirect_anonymous_callers_to_login() {
        for path in ["/dashboard/", "/profile/"] {
            let app = build_app(AppState::fake());
            let res = app
                .oneshot(Request::get(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::SEE_OTHER, "{path}");
            assert_eq!(res.headers()[header::LOCATION], "/login/", "{path}");
        }
    }

    #[tokio::test]
    async fn picture_endpoints_require_a_session() {
        for path in ["/upload-picture/", "/remove-picture/"] {
            let app = build_app(AppState::fake());
            let res = app
                .oneshot(Request::post(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::SEE_OTHER, "{path}");
            assert_eq!(res.headers()[header::LOCATION], "/login/", "{path}");
        }
    }

    #[tokio::test]
    async fn logout_without_session_redirects_to_login() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::get("/logout/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[header::LOCATION], "/login/");
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(
                Request::post("/login/")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("email=a%40x.com"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(body_string(res).await.contains("Both email and password are required."));
    }

    // The fake state's pool points at a nonexistent database, so the
    // lookup fails; the page must report a generic failure, not bad
    // credentials.
    #[tokio::test]
    async fn login_storage_failure_is_not_reported_as_bad_credentials() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(
                Request::post("/login/")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from("email=a%40x.com&password=secret"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_string(res).await;
        assert!(body.contains("An error occurred during login."));
        assert!(!body.contains("Invalid email or password"));
    }
}
