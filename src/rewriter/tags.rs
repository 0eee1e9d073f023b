//! Lightweight scanning of `<img>` and `<a>` start tags inside an HTML fragment.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)<(img|a)\b((?:[^>"']|"[^"]*"|'[^']*')*)>"#).expect("invalid tag regex")
    })
}

fn attribute_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*("[^"]*"|'[^']*'|[^\s>]+))?"#)
            .expect("invalid attribute regex")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    Image,
    Anchor,
}

/// A start tag and its attributes, with byte offsets into the scanned fragment.
#[derive(Debug)]
pub(crate) struct Tag {
    pub kind: TagKind,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug)]
pub(crate) struct Attribute {
    pub name: String,
    /// Entity-decoded value without surrounding quotes.
    pub value: String,
    /// Span of the raw value, quotes included.
    pub value_span: Range<usize>,
}

impl Tag {
    /// First attribute with the given (lowercase) name. Later duplicates are ignored.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }
}

/// Collect every `<img>` and `<a>` start tag in document order.
///
/// Tags whose quoting is unbalanced do not match and are skipped.
pub(crate) fn scan_tags(html: &str) -> Vec<Tag> {
    tag_pattern()
        .captures_iter(html)
        .filter_map(|caps| {
            let name = caps.get(1)?;
            let kind = if name.as_str().eq_ignore_ascii_case("img") {
                TagKind::Image
            } else {
                TagKind::Anchor
            };
            let body = caps.get(2)?;
            Some(Tag {
                kind,
                attributes: parse_attributes(body.as_str(), body.start()),
            })
        })
        .collect()
}

fn parse_attributes(body: &str, offset: usize) -> Vec<Attribute> {
    attribute_pattern()
        .captures_iter(body)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let raw = caps.get(2)?;
            let unquoted = raw
                .as_str()
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| {
                    raw.as_str()
                        .strip_prefix('\'')
                        .and_then(|v| v.strip_suffix('\''))
                })
                .unwrap_or(raw.as_str());
            Some(Attribute {
                name,
                value: decode_entities(unquoted),
                value_span: offset + raw.start()..offset + raw.end(),
            })
        })
        .collect()
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Quote a value for use as a double-quoted attribute.
pub(crate) fn quote_attribute(value: &str) -> String {
    let escaped = value.replace('&', "&amp;").replace('"', "&quot;");
    format!("\"{escaped}\"")
}

/// Replacement of a byte range in the source fragment.
#[derive(Debug)]
pub(crate) struct Edit {
    pub span: Range<usize>,
    pub replacement: String,
}

/// Splice non-overlapping edits into `html`.
pub(crate) fn apply_edits(html: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|edit| edit.span.start);

    let mut output = String::with_capacity(html.len());
    let mut cursor = 0;
    for edit in edits {
        if edit.span.start < cursor {
            continue;
        }
        output.push_str(&html[cursor..edit.span.start]);
        output.push_str(&edit.replacement);
        cursor = edit.span.end;
    }
    output.push_str(&html[cursor..]);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_images_and_anchors_in_order() {
        let html = r#"<p><a href="x">x</a><IMG SRC='a.png'><abbr title="t"></abbr><img src=b.png></p>"#;
        let tags = scan_tags(html);
        let kinds: Vec<_> = tags.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TagKind::Anchor, TagKind::Image, TagKind::Image]);
        assert_eq!(tags[1].attribute("src").unwrap().value, "a.png");
        assert_eq!(tags[2].attribute("src").unwrap().value, "b.png");
    }

    #[test]
    fn value_span_covers_quotes() {
        let html = r#"<img alt="a > b" src="x.png">"#;
        let tags = scan_tags(html);
        let src = tags[0].attribute("src").unwrap();
        assert_eq!(&html[src.value_span.clone()], "\"x.png\"");
    }

    #[test]
    fn decodes_entities_in_values() {
        let tags = scan_tags(r#"<img src="https://x.com/a.png?w=1&amp;h=2">"#);
        assert_eq!(
            tags[0].attribute("src").unwrap().value,
            "https://x.com/a.png?w=1&h=2"
        );
    }

    #[test]
    fn skips_tags_with_unbalanced_quotes() {
        assert!(scan_tags(r#"<img src="broken.png>"#).is_empty());
    }

    #[test]
    fn unquoted_values_run_until_whitespace() {
        let html = r#"<img src=https://cdn.example.com/a.png?w=1&amp;h=2 alt="">"#;
        let tags = scan_tags(html);
        let src = tags[0].attribute("src").unwrap();
        assert_eq!(src.value, "https://cdn.example.com/a.png?w=1&h=2");
        assert_eq!(
            &html[src.value_span.clone()],
            "https://cdn.example.com/a.png?w=1&amp;h=2"
        );
        assert_eq!(tags[0].attribute("alt").unwrap().value, "");
    }

    #[test]
    fn first_duplicate_attribute_wins() {
        let tags = scan_tags(r#"<img src="one.png" src="two.png">"#);
        assert_eq!(tags[0].attribute("src").unwrap().value, "one.png");
    }

    #[test]
    fn applies_edits_out_of_order() {
        let html = "0123456789";
        let edits = vec![
            Edit {
                span: 6..8,
                replacement: "b".into(),
            },
            Edit {
                span: 1..3,
                replacement: "a".into(),
            },
        ];
        assert_eq!(apply_edits(html, edits), "0a345b89");
    }

    #[test]
    fn quotes_and_escapes_values() {
        assert_eq!(quote_attribute(r#"a"b&c"#), "\"a&quot;b&amp;c\"");
    }
}
