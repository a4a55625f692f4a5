//! Path component helpers shared by the planners.

use regex::Regex;
use std::sync::LazyLock;

/// Characters that cannot appear in a path component on common filesystems.
const ILLEGAL_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

static RELEASE_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)FC2[-_ ]?PPV[-_ ]?\d+|FC2[-_ ]\d+|\b[A-Z]{2,6}-\d{2,5}\b|\b\d{6}[-_]\d{2,3}\b")
        .expect("valid release code regex")
});

/// Replaces illegal characters with spaces and trims surrounding whitespace
/// and trailing dots. Returns an empty string when nothing usable remains.
pub fn clean_component(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| {
            if ILLEGAL_CHARS.contains(&c) || c.is_control() {
                ' '
            } else {
                c
            }
        })
        .collect();
    replaced
        .trim()
        .trim_end_matches('.')
        .trim_end()
        .to_string()
}

/// Like [`clean_component`], but never returns an empty component.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned = clean_component(raw);
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

/// Shortens a metadata title into a folder name.
///
/// Titles are hyphen-delimited. More than four segments collapse to the
/// first three plus the last; the last segment is capped at `max_len`
/// characters.
pub fn format_title(title: &str, max_len: usize) -> String {
    let mut parts: Vec<&str> = title.split('-').collect();
    if parts.len() > 4 {
        let last = parts[parts.len() - 1];
        parts.truncate(3);
        parts.push(last);
    }

    let last_index = parts.len() - 1;
    let cleaned: Vec<String> = parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            if i == last_index {
                let truncated: String = part.chars().take(max_len).collect();
                clean_component(&truncated)
            } else {
                clean_component(part)
            }
        })
        .filter(|part| !part.is_empty())
        .collect();

    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned.join("-")
    }
}

/// Extracts a release code such as `ABC-123` or `FC2-PPV-1234567` from a
/// folder name, uppercased.
pub fn extract_release_code(name: &str) -> Option<String> {
    RELEASE_CODE
        .find(name)
        .map(|m| m.as_str().replace(['_', ' '], "-").to_uppercase())
}

/// Appends a numeric discriminator to a folder name: `Name (2)`.
pub fn discriminate_dir(name: &str, n: usize) -> String {
    format!("{name} ({n})")
}

/// Inserts a numeric discriminator before a file extension: `Name (2).mkv`.
pub fn discriminate_file(file_name: &str, n: usize) -> String {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => format!("{} ({n}){}", &file_name[..dot], &file_name[dot..]),
        _ => format!("{file_name} ({n})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_illegal_characters() {
        assert_eq!(sanitize_component("a/b:c*d"), "a b c d");
        assert_eq!(sanitize_component("  Name.  "), "Name");
        assert_eq!(sanitize_component("???"), "unnamed");
    }

    #[test]
    fn test_format_title_short() {
        assert_eq!(format_title("ABC-123", 20), "ABC-123");
    }

    #[test]
    fn test_format_title_truncates_last_segment() {
        assert_eq!(
            format_title("ABC-123 A very long descriptive title", 10),
            "ABC-123 A very"
        );
    }

    #[test]
    fn test_format_title_collapses_many_segments() {
        assert_eq!(format_title("a-b-c-d-e-f", 20), "a-b-c-f");
    }

    #[test]
    fn test_format_title_drops_empty_segments() {
        assert_eq!(format_title("ABC--<>-123", 20), "ABC-123");
        assert_eq!(format_title("", 20), "unnamed");
        assert_eq!(format_title("???", 20), "unnamed");
    }

    #[test]
    fn test_extract_release_code() {
        assert_eq!(
            extract_release_code("[site] abc-123 some title").as_deref(),
            Some("ABC-123")
        );
        assert_eq!(
            extract_release_code("FC2-PPV-1234567 extra").as_deref(),
            Some("FC2-PPV-1234567")
        );
        assert_eq!(extract_release_code("holiday footage"), None);
    }

    #[test]
    fn test_discriminators() {
        assert_eq!(discriminate_dir("Tom Cruise", 2), "Tom Cruise (2)");
        assert_eq!(discriminate_file("poster.jpg", 3), "poster (3).jpg");
        assert_eq!(discriminate_file("README", 2), "README (2)");
    }
}
