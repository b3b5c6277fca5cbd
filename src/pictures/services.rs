use bytes::Bytes;
use tracing::{info, warn};

use crate::error::AppError;
use crate::state::AppState;
use crate::users::repo::User;

pub const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "bmp"];

/// Image formats accepted for profile pictures, identified by signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Gif,
    Bmp,
}

impl ImageKind {
    pub fn content_type(self) -> &'static str {
        match self {
            ImageKind::Jpeg => "image/jpeg",
            ImageKind::Png => "image/png",
            ImageKind::Gif => "image/gif",
            ImageKind::Bmp => "image/bmp",
        }
    }

    fn matches_extension(self, ext: &str) -> bool {
        match self {
            ImageKind::Jpeg => ext == "jpg" || ext == "jpeg",
            ImageKind::Png => ext == "png",
            ImageKind::Gif => ext == "gif",
            ImageKind::Bmp => ext == "bmp",
        }
    }
}

/// Identify an image by its magic bytes. Extension claims are not trusted.
pub fn sniff_image(bytes: &[u8]) -> Option<ImageKind> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageKind::Jpeg)
    } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(ImageKind::Png)
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some(ImageKind::Gif)
    } else if bytes.starts_with(b"BM") {
        Some(ImageKind::Bmp)
    } else {
        None
    }
}

/// Validate an upload: size cap, extension whitelist, and a signature check
/// that must agree with the claimed extension. Error strings are shown to
/// the user as-is.
pub fn validate_image(
    filename: &str,
    bytes: &[u8],
    max_bytes: usize,
) -> Result<(ImageKind, String), String> {
    if bytes.len() > max_bytes {
        return Err(format!(
            "File too large. Maximum size is {} MiB.",
            max_bytes / (1024 * 1024)
        ));
    }

    let ext = filename
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(format!(
            "Invalid file type. Allowed types: {}.",
            ALLOWED_EXTENSIONS.join(", ")
        ));
    }

    let Some(kind) = sniff_image(bytes) else {
        return Err("Uploaded file is not a valid image.".to_string());
    };
    if !kind.matches_extension(&ext) {
        return Err("File extension does not match the image content.".to_string());
    }

    Ok((kind, ext))
}

/// Object-store key for a user's picture, derived from the username and the
/// original extension.
pub fn picture_key(username: &str, ext: &str) -> String {
    format!("avatars/{username}.{ext}")
}

/// Validate and store a new profile picture. The previous object (if any)
/// is deleted before the new one is written, then the reference is
/// persisted.
pub async fn store_picture(
    st: &AppState,
    user: &User,
    filename: &str,
    bytes: Bytes,
) -> Result<String, AppError> {
    let (kind, ext) = validate_image(filename, &bytes, st.config.max_upload_bytes)
        .map_err(AppError::Validation)?;
    let key = picture_key(&user.username, &ext);

    if let Some(old_key) = &user.profile_picture {
        if old_key != &key {
            if let Err(e) = st.storage.delete_object(old_key).await {
                warn!(error = %e, key = %old_key, "stale picture cleanup failed");
            }
        }
    }

    st.storage.put_object(&key, bytes, kind.content_type()).await?;
    User::set_profile_picture(&st.db, &user.username, Some(&key)).await?;

    info!(username = %user.username, key = %key, "profile picture stored");
    Ok(key)
}

/// Delete the stored picture and clear the reference. Returns false when
/// there was nothing to remove.
pub async fn remove_picture(st: &AppState, user: &User) -> Result<bool, AppError> {
    let Some(key) = &user.profile_picture else {
        return Ok(false);
    };

    st.storage.delete_object(key).await?;
    User::set_profile_picture(&st.db, &user.username, None).await?;

    info!(username = %user.username, key = %key, "profile picture removed");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 5 * 1024 * 1024;

    fn png_bytes() -> Vec<u8> {
        let mut v = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        v.extend_from_slice(&[0u8; 16]);
        v
    }

    #[test]
    fn sniffs_known_formats() {
        assert_eq!(sniff_image(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageKind::Jpeg));
        assert_eq!(sniff_image(&png_bytes()), Some(ImageKind::Png));
        assert_eq!(sniff_image(b"GIF89a..."), Some(ImageKind::Gif));
        assert_eq!(sniff_image(b"GIF87a..."), Some(ImageKind::Gif));
        assert_eq!(sniff_image(b"BM......"), Some(ImageKind::Bmp));
        assert_eq!(sniff_image(b"<html></html>"), None);
        assert_eq!(sniff_image(&[]), None);
    }

    #[test]
    fn accepts_a_valid_png() {
        let (kind, ext) = validate_image("me.PNG", &png_bytes(), MAX).unwrap();
        assert_eq!(kind, ImageKind::Png);
        assert_eq!(ext, "png");
    }

    #[test]
    fn jpeg_accepts_both_extensions() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xE1, 0x00];
        assert!(validate_image("a.jpg", &jpeg, MAX).is_ok());
        assert!(validate_image("a.jpeg", &jpeg, MAX).is_ok());
    }

    #[test]
    fn rejects_oversized_files() {
        let mut big = png_bytes();
        big.resize(MAX + 1, 0);
        let err = validate_image("big.png", &big, MAX).unwrap_err();
        assert!(err.contains("too large"));
    }

    #[test]
    fn rejects_disallowed_extensions() {
        let err = validate_image("script.svg", &png_bytes(), MAX).unwrap_err();
        assert!(err.contains("Invalid file type"));
        assert!(validate_image("noextension", &png_bytes(), MAX).is_err());
    }

    #[test]
    fn rejects_non_image_content() {
        let err = validate_image("fake.png", b"#!/bin/sh\nrm -rf", MAX).unwrap_err();
        assert!(err.contains("not a valid image"));
    }

    #[test]
    fn rejects_extension_content_mismatch() {
        let err = validate_image("photo.gif", &png_bytes(), MAX).unwrap_err();
        assert!(err.contains("does not match"));
    }

    #[test]
    fn key_is_derived_from_username_and_extension() {
        assert_eq!(picture_key("alice", "png"), "avatars/alice.png");
        assert_eq!(picture_key("bob", "jpg"), "avatars/bob.jpg");
    }
}
