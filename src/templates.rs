//! Minimal inline HTML for the web-mode pages. No template engine; these
//! views only exist so form-based callers get something usable back.

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><head><title>{title}</title></head><body>{body}</body></html>"
    )
}

fn flash(message: Option<&str>) -> String {
    match message {
        Some(m) => format!("<p class=\"flash\">{m}</p>"),
        None => String::new(),
    }
}

pub fn signup_page(error: Option<&str>) -> String {
    let body = format!(
        r#"{}<h1>Sign up</h1>
<form method="post" action="/signup/">
<input name="username" placeholder="Username" maxlength="50">
<input name="email" type="email" placeholder="Email">
<input name="password" type="password" placeholder="Password" maxlength="12">
<button type="submit">Sign up</button>
</form>
<a href="/login/">Log in</a>"#,
        flash(error)
    );
    page("Sign up", &body)
}

pub fn login_page(error: Option<&str>) -> String {
    let body = format!(
        r#"{}<h1>Log in</h1>
<form method="post" action="/login/">
<input name="email" type="email" placeholder="Email">
<input name="password" type="password" placeholder="Password" maxlength="12">
<button type="submit">Log in</button>
</form>
<a href="/signup/">Sign up</a>"#,
        flash(error)
    );
    page("Log in", &body)
}

pub fn already_logged_in_page(username: &str) -> String {
    let body = format!(
        r#"<h1>Already logged in</h1>
<p>You are already logged in as {username}.</p>
<a href="/dashboard/">Dashboard</a> <a href="/logout/">Log out</a>"#
    );
    page("Already logged in", &body)
}

pub fn dashboard_page(username: &str) -> String {
    let body = format!(
        r#"<h1>Dashboard</h1>
<p>Welcome back, {username}!</p>
<a href="/profile/">Profile</a> <a href="/logout/">Log out</a>"#
    );
    page("Dashboard", &body)
}

pub fn profile_page(username: &str, email: &str, picture_url: Option<&str>) -> String {
    let picture = match picture_url {
        Some(url) => format!("<img src=\"{url}\" alt=\"profile picture\" width=\"128\">"),
        None => "<p>No profile picture.</p>".to_string(),
    };
    let body = format!(
        r#"<h1>Profile</h1>
<p>Username: {username}</p>
<p>Email: {email}</p>
{picture}
<form method="post" action="/upload-picture/" enctype="multipart/form-data">
<input type="file" name="picture">
<button type="submit">Upload picture</button>
</form>
<form method="post" action="/remove-picture/">
<button type="submit">Remove picture</button>
</form>
<a href="/dashboard/">Dashboard</a>"#
    );
    page("Profile", &body)
}

/// One-off informational page with a link back somewhere useful.
pub fn message_page(title: &str, message: &str, back_href: &str) -> String {
    let body = format!(
        r#"<h1>{title}</h1>
<p>{message}</p>
<a href="{back_href}">Back</a>"#
    );
    page(title, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_renders_only_when_present() {
        assert!(signup_page(None).contains("<form"));
        assert!(!signup_page(None).contains("class=\"flash\""));
        let with_error = signup_page(Some("All fields are required."));
        assert!(with_error.contains("All fields are required."));
    }

    #[test]
    fn profile_shows_picture_when_set() {
        let html = profile_page("alice", "a@x.com", Some("https://fake.local/avatars/alice.png"));
        assert!(html.contains("<img"));
        let html = profile_page("alice", "a@x.com", None);
        assert!(html.contains("No profile picture."));
    }
}
