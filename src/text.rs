//! Text cleaning and timestamp helpers shared by the adapters.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));
static TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Normalizes a title or snippet before it is emitted.
///
/// Collapses whitespace runs, strips `[...]` annotations and any remaining
/// markup tags, then trims. Removing fragments can leave double spaces
/// behind, so whitespace is collapsed once more at the end.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let collapsed = WHITESPACE.replace_all(text, " ");
    let unbracketed = BRACKETED.replace_all(&collapsed, "");
    let untagged = TAGS.replace_all(&unbracketed, "");
    WHITESPACE.replace_all(&untagged, " ").trim().to_string()
}

/// Parses the timestamp formats seen in feeds and APIs.
///
/// Accepts RFC 3339, RFC 2822 and a bare `YYYY-MM-DDTHH:MM:SS` (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  a \t b\n\nc  "), "a b c");
    }

    #[test]
    fn test_clean_text_strips_brackets() {
        assert_eq!(clean_text("Rust [1] is fast [citation needed]"), "Rust is fast");
    }

    #[test]
    fn test_clean_text_strips_tags() {
        assert_eq!(
            clean_text(r#"<p>Hello <a href="https://x.com">world</a></p>"#),
            "Hello world"
        );
    }

    #[test]
    fn test_clean_text_empty() {
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("   "), "");
        assert_eq!(clean_text("<br/>[x]"), "");
    }

    #[test]
    fn test_clean_text_is_stable() {
        let once = clean_text("  <i>Release</i> notes [draft]\n for  1.0 ");
        assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let ts = parse_timestamp("2024-01-15T10:30:00Z").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day(), ts.hour()), (2024, 1, 15, 10));
    }

    #[test]
    fn test_parse_timestamp_rfc2822() {
        let ts = parse_timestamp("Mon, 15 Jan 2024 10:30:00 +0100").unwrap();
        assert_eq!(ts.hour(), 9);
    }

    #[test]
    fn test_parse_timestamp_naive() {
        let ts = parse_timestamp("2024-01-15T10:30:00").unwrap();
        assert_eq!(ts.minute(), 30);
        assert!(parse_timestamp("2024-01-15 10:30:00").is_some());
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
