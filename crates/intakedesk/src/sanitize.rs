//! Helpers for sanitizing untrusted or sensitive strings before they reach
//! the filesystem or the logs.

/// Strips userinfo and query string from a URL so webhook targets can be
/// logged without leaking embedded tokens.
///
/// - `https://user:pw@hooks.example.com/x?sig=abc` → `https://****@hooks.example.com/x`
/// - `https://hooks.example.com/x` → unchanged
pub fn redact_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);

    if let Some(scheme_end) = without_query.find("://") {
        let after_scheme = &without_query[scheme_end + 3..];
        let authority_end = after_scheme.find('/').unwrap_or(after_scheme.len());
        if let Some(at_pos) = after_scheme[..authority_end].rfind('@') {
            let scheme = &without_query[..scheme_end + 3];
            return format!("{}****@{}", scheme, &after_scheme[at_pos + 1..]);
        }
    }

    without_query.to_string()
}

/// Reduces an uploaded filename to a safe single path component.
///
/// Only the final component survives (either separator style), and every
/// character outside `[A-Za-z0-9._-]` becomes `_`. Empty or dot-only names
/// fall back to `document.pdf`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.chars().all(|c| c == '.') {
        "document.pdf".to_string()
    } else {
        cleaned
    }
}
