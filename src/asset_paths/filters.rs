use std::sync::OnceLock;

use regex::Regex;
use url::Url;

fn file_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"/files/(\d+)(?:[/?#]|$)").expect("invalid file id regex"))
}

fn unsyncable_references() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            vec![
                Regex::new(r"(?i)^data:").expect("invalid data URI regex"),
                Regex::new(r"(?i)^blob:").expect("invalid blob URI regex"),
                Regex::new(r"(?i)^file:").expect("invalid file URI regex"),
                Regex::new(r"(?i)^mailto:").expect("invalid mailto regex"),
            ]
        })
        .as_slice()
}

/// Determine whether an attribute value can never be synced for offline use.
///
/// Inline data, blob handles, already-local files and mail links are left untouched.
pub fn is_unsyncable_reference(value: &str) -> bool {
    unsyncable_references()
        .iter()
        .any(|pattern| pattern.is_match(value.trim()))
}

/// Numeric file id following a `/files/` path segment.
pub fn extract_file_id(value: &str) -> Option<i64> {
    file_id_pattern()
        .captures(value)
        .and_then(|caps| caps.get(1))
        .and_then(|id| id.as_str().parse::<i64>().ok())
}

/// Whether the URL is served from the configured API domain.
///
/// The domain may be given with or without a scheme. A port is only compared when the
/// configured domain names one.
pub fn host_matches_domain(url: &Url, domain: &str) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };

    let domain = domain.trim();
    let without_scheme = domain
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(domain);
    let authority = without_scheme
        .split('/')
        .next()
        .unwrap_or(without_scheme);
    if authority.is_empty() {
        return false;
    }

    let (domain_host, domain_port) = match authority.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => {
            (name, port.parse::<u16>().ok())
        }
        _ => (authority, None),
    };

    if !host.eq_ignore_ascii_case(domain_host) {
        return false;
    }

    match domain_port {
        Some(port) => url.port_or_known_default() == Some(port),
        None => true,
    }
}

/// Whether the URL can be fetched as an external asset.
pub fn is_fetchable_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_inline_and_local_references() {
        assert!(is_unsyncable_reference("data:image/png;base64,abc"));
        assert!(is_unsyncable_reference("FILE:///files/1/a.png"));
        assert!(is_unsyncable_reference("mailto:user@example.com"));
        assert!(!is_unsyncable_reference("https://example.com/a.png"));
    }

    #[test]
    fn extracts_file_ids_from_download_and_preview_urls() {
        assert_eq!(extract_file_id("https://x.com/files/123456/download"), Some(123456));
        assert_eq!(
            extract_file_id("https://x.com/courses/1/files/77/preview?verifier=a"),
            Some(77)
        );
        assert_eq!(extract_file_id("https://x.com/api/v1/courses/1/files/88"), Some(88));
        assert_eq!(extract_file_id("https://x.com/files/12abc/download"), None);
        assert_eq!(extract_file_id("https://x.com/files/"), None);
    }

    #[test]
    fn rejects_ids_that_overflow() {
        assert_eq!(extract_file_id("/files/99999999999999999999999/download"), None);
    }

    #[test]
    fn matches_domain_with_or_without_scheme() {
        let url = Url::parse("https://School.Instructure.com/files/1/download").unwrap();
        assert!(host_matches_domain(&url, "school.instructure.com"));
        assert!(host_matches_domain(&url, "https://school.instructure.com/"));
        assert!(!host_matches_domain(&url, "instructure.com"));
        assert!(!host_matches_domain(&url, ""));
    }

    #[test]
    fn compares_port_only_when_configured() {
        let url = Url::parse("http://localhost:8080/files/1/download").unwrap();
        assert!(host_matches_domain(&url, "localhost"));
        assert!(host_matches_domain(&url, "localhost:8080"));
        assert!(!host_matches_domain(&url, "localhost:3000"));
    }

    #[test]
    fn only_http_urls_are_fetchable() {
        assert!(is_fetchable_url(&Url::parse("https://cdn.example.com/a.png").unwrap()));
        assert!(!is_fetchable_url(&Url::parse("ftp://cdn.example.com/a.png").unwrap()));
    }
}
