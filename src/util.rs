//! String helpers for IRC line limits.

/// Truncates a string to at most `max_bytes` bytes without breaking
/// a multi-byte UTF-8 codepoint at the end.
///
/// # Examples
///
/// ```
/// use slirc_client::util::truncate_utf8_safe;
///
/// assert_eq!(truncate_utf8_safe("hello world", 5), "hello");
///
/// // Multi-byte chars are not split
/// assert_eq!(truncate_utf8_safe("Hello 👋 World", 8), "Hello ");
///
/// assert_eq!(truncate_utf8_safe("hi", 10), "hi");
/// ```
#[inline]
pub fn truncate_utf8_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_utf8_safe_ascii() {
        assert_eq!(truncate_utf8_safe("hello world", 5), "hello");
        assert_eq!(truncate_utf8_safe("hello", 10), "hello");
        assert_eq!(truncate_utf8_safe("", 5), "");
    }

    #[test]
    fn test_truncate_utf8_safe_multibyte() {
        // é is 2 bytes
        assert_eq!(truncate_utf8_safe("café", 4), "caf");
        assert_eq!(truncate_utf8_safe("café", 5), "café");

        // € is 3 bytes
        assert_eq!(truncate_utf8_safe("100€", 4), "100");

        // 👋 is 4 bytes
        assert_eq!(truncate_utf8_safe("Hi👋", 3), "Hi");
        assert_eq!(truncate_utf8_safe("Hi👋", 6), "Hi👋");
    }

    #[test]
    fn test_truncate_utf8_safe_edge_cases() {
        assert_eq!(truncate_utf8_safe("日本語", 3), "日");
        assert_eq!(truncate_utf8_safe("日本語", 8), "日本");
        assert_eq!(truncate_utf8_safe("hello", 0), "");
    }
}
