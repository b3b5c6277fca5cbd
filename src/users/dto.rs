use serde::{Deserialize, Serialize};

use crate::users::repo::User;

/// External representation of a user. Credential fields stay out of every
/// response body.
#[derive(Debug, Serialize)]
pub struct UserOut {
    pub username: String,
    pub email: String,
}

impl From<&User> for UserOut {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            email: user.email,
        }
    }
}

/// Update body: both fields optional; omitted fields keep their value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}
