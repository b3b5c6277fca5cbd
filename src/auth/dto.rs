use axum::http::{header, HeaderMap};
use serde::Deserialize;

/// Response shape for a request, decided once at handler entry from the
/// Content-Type header. JSON callers get the `{status, message}` envelope,
/// web callers get HTML or redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Html,
    Json,
}

impl ResponseMode {
    pub fn detect(headers: &HeaderMap) -> Self {
        let is_json = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false);
        if is_json {
            ResponseMode::Json
        } else {
            ResponseMode::Html
        }
    }
}

/// Signup body, accepted as form fields or JSON. Fields are optional so the
/// missing-field case produces the "All fields are required." message
/// instead of a deserialization error.
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SignupQuery {
    #[serde(default)]
    pub format: Option<String>,
}
