//! Image-reference helpers: extension allow-list, URL checks, MIME
//! lookup for inline payload encoding.

/// File extensions accepted as reference images, lowercase.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Lowercased extension of a path or URL path, if any.
///
/// Query strings and fragments are stripped first so that
/// `photo.png?w=512` reports `png`.
pub fn extension_of(path: &str) -> Option<String> {
    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or(path);
    let name = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Whether a path carries an allow-listed image extension.
pub fn has_image_extension(path: &str) -> bool {
    matches!(extension_of(path), Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether `value` is a well-formed absolute HTTP(S) URL.
///
/// Deliberately shallow: scheme check plus a non-empty host segment.
/// Anything stricter belongs to the provider, which is the actual
/// consumer of these URLs.
pub fn is_absolute_http_url(value: &str) -> bool {
    let rest = if let Some(r) = value.strip_prefix("https://") {
        r
    } else if let Some(r) = value.strip_prefix("http://") {
        r
    } else {
        return false;
    };
    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    !host.is_empty()
}

/// MIME type for an allow-listed image extension.
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_strips_query_and_fragment() {
        assert_eq!(extension_of("a/b/photo.PNG?w=512").as_deref(), Some("png"));
        assert_eq!(extension_of("photo.jpeg#top").as_deref(), Some("jpeg"));
        assert_eq!(extension_of("no-extension"), None);
        assert_eq!(extension_of("trailing-dot."), None);
    }

    #[test]
    fn allow_list_is_enforced() {
        assert!(has_image_extension("uploads/dish.jpg"));
        assert!(has_image_extension("uploads/dish.WEBP"));
        assert!(!has_image_extension("uploads/dish.gif"));
        assert!(!has_image_extension("uploads/dish.glb"));
        assert!(!has_image_extension("uploads/dish"));
    }

    #[test]
    fn absolute_url_check() {
        assert!(is_absolute_http_url("https://cdn.example.com/a.png"));
        assert!(is_absolute_http_url("http://host/a"));
        assert!(!is_absolute_http_url("ftp://host/a.png"));
        assert!(!is_absolute_http_url("//host/a.png"));
        assert!(!is_absolute_http_url("https://"));
        assert!(!is_absolute_http_url("uploads/a.png"));
    }
}
