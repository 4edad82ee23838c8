use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

use crate::scanner::MediaFile;

// Catalog code: <letters>-<digits>, optionally followed by a disc suffix "-<letter>"
// Examples: "ABC-123", "abc-123-C", "[site] SSIS-001-A"
static CODE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([a-z]+-\d+)(?:-[a-z])?").unwrap());

/// Strip the extension from a file name, keeping dotted stems intact
pub fn strip_extension(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

/// Derive a catalog identifier from a file name.
///
/// Returns the uppercased `LETTERS-DIGITS` portion when the name carries a
/// catalog code; otherwise the extension-stripped name is returned unchanged.
pub fn extract_code(file_name: &str) -> String {
    let stem = strip_extension(file_name);

    match CODE_REGEX.captures(stem).and_then(|c| c.get(1)) {
        Some(m) => m.as_str().to_uppercase(),
        None => stem.to_string(),
    }
}

/// Derive identifiers for a scan result, dropping duplicates but keeping
/// first-seen order (multi-disc releases collapse to one identifier).
pub fn extract_codes(files: &[MediaFile]) -> Vec<String> {
    let mut seen = HashSet::new();
    files
        .iter()
        .map(|f| extract_code(&f.name))
        .filter(|code| seen.insert(code.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn media(name: &str) -> MediaFile {
        MediaFile::new(PathBuf::from("/videos").join(name), name.to_string())
    }

    #[test]
    fn test_extract_simple_code() {
        assert_eq!(extract_code("ABC-123.mp4"), "ABC-123");
    }

    #[test]
    fn test_extract_lowercase_is_uppercased() {
        assert_eq!(extract_code("abc-123.mkv"), "ABC-123");
    }

    #[test]
    fn test_extract_strips_disc_suffix() {
        assert_eq!(extract_code("ABC-123-C.mp4"), "ABC-123");
        assert_eq!(extract_code("ssis-001-a.mp4"), "SSIS-001");
    }

    #[test]
    fn test_extract_code_inside_longer_name() {
        assert_eq!(extract_code("[site] abc-123 1080p.mp4"), "ABC-123");
    }

    #[test]
    fn test_fallback_keeps_stem_unchanged() {
        assert_eq!(extract_code("random_clip.mp4"), "random_clip");
        assert_eq!(extract_code("Holiday 2020.mov"), "Holiday 2020");
    }

    #[test]
    fn test_fallback_without_extension() {
        assert_eq!(extract_code("noext"), "noext");
    }

    #[test]
    fn test_digits_without_letters_do_not_match() {
        assert_eq!(extract_code("123-456.mp4"), "123-456");
    }

    #[test]
    fn test_strip_extension_keeps_inner_dots() {
        assert_eq!(strip_extension("a.b.c.mp4"), "a.b.c");
    }

    #[test]
    fn test_extract_codes_deduplicates_in_order() {
        let files = vec![
            media("xyz-001.mp4"),
            media("ABC-123-A.mp4"),
            media("abc-123-B.mp4"),
            media("random.mp4"),
        ];

        assert_eq!(
            extract_codes(&files),
            vec!["XYZ-001".to_string(), "ABC-123".to_string(), "random".to_string()]
        );
    }
}
