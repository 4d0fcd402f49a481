//! UTF-8-safe string helpers used when logging scraped text.

/// Truncate to at most `max_chars` characters without splitting a code point.
#[must_use]
pub fn safe_truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii_and_multibyte() {
        assert_eq!(safe_truncate_chars("Hello, World!", 5), "Hello");
        assert_eq!(safe_truncate_chars("日本語のタイトル", 3), "日本語");
        assert_eq!(safe_truncate_chars("short", 30), "short");
    }
}
