//! Shared request plumbing and string helpers

pub mod auth;
pub mod client;
pub mod extract;
pub mod rate_limit;

/// Truncate a UTF-8 string without splitting a multi-byte character
///
/// Returns the longest valid prefix of at most `max_bytes` bytes.
pub fn truncate_str_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// Truncate and append `...` when anything was cut
pub fn truncate_with_ellipsis(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }

    let truncate_at = if max_bytes > 3 { max_bytes - 3 } else { max_bytes };
    format!("{}...", truncate_str_safe(s, truncate_at))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        // 'é' is two bytes
        assert_eq!(truncate_str_safe("héllo", 2), "h");
        assert_eq!(truncate_str_safe("héllo", 3), "hé");
        assert_eq!(truncate_str_safe("abc", 10), "abc");
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("short", 10), "short");
        assert_eq!(truncate_with_ellipsis("a long detail line", 10), "a long ...");
    }
}
