//! Media type checks for service responses

/// Whether a `Content-Type` header value names JSON.
///
/// Parameters are ignored and the comparison is case-insensitive, so
/// `Application/JSON; charset=UTF-8` and `application/problem+json` both match.
pub fn is_json(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json"
        || (essence.starts_with("application/") && essence.ends_with("+json"))
}
