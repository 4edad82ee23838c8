use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Build a `Cookie` header value from a Netscape-format cookie file.
///
/// Only rows whose domain contains `host` are used. When a cookie name
/// appears more than once the last row wins. A missing or unreadable file
/// yields an empty header.
pub fn load_cookie_header(path: &Path, host: &str) -> String {
    match fs::read_to_string(path) {
        Ok(content) => parse_cookie_file(&content, host),
        Err(e) => {
            warn!(path = ?path, error = %e, "Cookie file unavailable, continuing without cookies");
            String::new()
        }
    }
}

pub fn parse_cookie_file(content: &str, host: &str) -> String {
    let mut cookies: Vec<(String, String)> = Vec::new();

    for line in content.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        // domain, include_subdomains, path, secure, expiry, name, value
        let (domain, name, value) = match fields.as_slice() {
            [domain, _, _, _, _, name, value, ..] => (*domain, *name, *value),
            _ => {
                debug!(line, "Skipping malformed cookie line");
                continue;
            }
        };

        let name = name.trim();
        let value = value.trim();
        if !domain.contains(host) || name.is_empty() || value.is_empty() {
            continue;
        }

        match cookies.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => cookies.push((name.to_string(), value.to_string())),
        }
    }

    debug!(count = cookies.len(), "Parsed cookies");

    cookies
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = "# Netscape HTTP Cookie File\n\
        \n\
        .javdb.com\tTRUE\t/\tTRUE\t1999999999\t_jdb_session\tabc123\n\
        javdb.com\tFALSE\t/\tFALSE\t1999999999\tlocale\tzh\n\
        .example.com\tTRUE\t/\tFALSE\t1999999999\ttracker\tnope\n\
        .javdb.com\tTRUE\t/\tTRUE\t1999999999\t_jdb_session\tnewer\n";

    #[test]
    fn test_filters_by_domain_and_last_wins() {
        let header = parse_cookie_file(SAMPLE, "javdb.com");
        assert_eq!(header, "_jdb_session=newer; locale=zh");
    }

    #[test]
    fn test_skips_malformed_and_empty_values() {
        let content = "javdb.com\tonly-three\tfields\n\
                       javdb.com\tTRUE\t/\tTRUE\t0\tempty\t\n";
        assert_eq!(parse_cookie_file(content, "javdb.com"), "");
    }

    #[test]
    fn test_handles_crlf_lines() {
        let content = "javdb.com\tTRUE\t/\tTRUE\t0\tlocale\tzh\r\n";
        assert_eq!(parse_cookie_file(content, "javdb.com"), "locale=zh");
    }

    #[test]
    fn test_missing_file_gives_empty_header() {
        let dir = tempdir().unwrap();
        assert_eq!(load_cookie_header(&dir.path().join("missing.txt"), "javdb.com"), "");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cookie.txt");
        std::fs::write(&path, SAMPLE).unwrap();

        assert!(load_cookie_header(&path, "javdb.com").contains("locale=zh"));
    }
}
