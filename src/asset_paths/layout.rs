use url::Url;

/// On-device layout of synced course files.
///
/// Internal files live at `<root>/<scope>/<file id>_<name>` and external assets at
/// `<root>/<scope>/external_<index>/<name>`. Paths always use forward slashes so the
/// generated `file://` URIs are identical on every platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileLayout {
    root: String,
}

impl LocalFileLayout {
    /// Create a layout rooted at the application files directory.
    pub fn new(app_files_dir: &str) -> Self {
        let normalised = app_files_dir.replace('\\', "/");
        let trimmed = normalised.trim_end_matches('/');
        Self {
            root: trimmed.to_string(),
        }
    }

    /// Root directory of the cache.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Path an internal file occupies once synced.
    pub fn internal_file_path(&self, scope_id: i64, file_id: i64, name: &str) -> String {
        format!(
            "{}/{}/{}_{}",
            self.root,
            scope_id,
            file_id,
            sanitize_file_name(name)
        )
    }

    /// Path an external asset occupies once synced.
    pub fn external_file_path(&self, scope_id: i64, index: usize, name: &str) -> String {
        format!(
            "{}/{}/external_{}/{}",
            self.root,
            scope_id,
            index,
            sanitize_file_name(name)
        )
    }
}

/// Turn an absolute on-device path into a `file://` URI.
///
/// Each path segment is percent-encoded, so names containing `#`, `?` or spaces stay part of
/// the path. The path on disk is unaffected.
pub fn file_uri(path: &str) -> String {
    let normalised = path.replace('\\', "/");
    let mut uri = Url::parse("file:///").expect("invalid file URI root");
    if let Ok(mut segments) = uri.path_segments_mut() {
        segments
            .clear()
            .extend(normalised.trim_start_matches('/').split('/'));
    }
    uri.into()
}

/// Name used for an internal file whose display name could not be fetched.
pub fn placeholder_name(file_id: i64) -> String {
    format!("file_{file_id}")
}

/// Last non-empty path segment of a URL, percent-decoded.
pub fn last_path_segment(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.rev().find(|s| !s.is_empty())?;
    let decoded = urlencoding::decode(segment)
        .map(|value| value.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    let cleaned = sanitize_file_name(&decoded);
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        None
    } else {
        Some(cleaned)
    }
}

/// Strip path separators so a display name cannot escape its directory.
pub fn sanitize_file_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_internal_and_external_paths() {
        let layout = LocalFileLayout::new("/data/files/");
        assert_eq!(
            layout.internal_file_path(1, 123456, "photo.jpg"),
            "/data/files/1/123456_photo.jpg"
        );
        assert_eq!(
            layout.external_file_path(1, 2, "logo.png"),
            "/data/files/1/external_2/logo.png"
        );
    }

    #[test]
    fn normalises_backslashes_from_windows_roots() {
        let layout = LocalFileLayout::new("C:\\app\\files");
        assert_eq!(
            file_uri(&layout.internal_file_path(3, 9, "a.png")),
            "file:///C:/app/files/3/9_a.png"
        );
    }

    #[test]
    fn keeps_display_names_inside_scope_directory() {
        let layout = LocalFileLayout::new("/files");
        assert_eq!(
            layout.internal_file_path(1, 5, "../etc/passwd"),
            "/files/1/5_.._etc_passwd"
        );
    }

    #[test]
    fn extracts_decoded_last_segment() {
        let url = Url::parse("https://cdn.example.com/img/my%20photo.png?size=2").unwrap();
        assert_eq!(last_path_segment(&url).as_deref(), Some("my photo.png"));

        let trailing = Url::parse("https://cdn.example.com/img/logo.svg/").unwrap();
        assert_eq!(last_path_segment(&trailing).as_deref(), Some("logo.svg"));

        let bare = Url::parse("https://cdn.example.com/").unwrap();
        assert_eq!(last_path_segment(&bare), None);
    }

    #[test]
    fn keeps_undecodable_segments_verbatim() {
        let url = Url::parse("https://cdn.example.com/img/%FF.png").unwrap();
        assert_eq!(last_path_segment(&url).as_deref(), Some("%FF.png"));
    }

    #[test]
    fn encodes_delimiters_in_file_uris() {
        let layout = LocalFileLayout::new("/files");
        let uri = file_uri(&layout.internal_file_path(1, 5, "Lab #3?.png"));
        assert_eq!(uri, "file:///files/1/5_Lab%20%233%3F.png");

        let parsed = Url::parse(&uri).unwrap();
        assert_eq!(parsed.fragment(), None);
        assert_eq!(parsed.query(), None);
        let name = parsed.path_segments().unwrap().next_back().unwrap();
        assert_eq!(urlencoding::decode(name).unwrap(), "5_Lab #3?.png");
    }

    #[test]
    fn decoded_external_names_are_reencoded_in_uris() {
        let url = Url::parse("https://cdn.example.com/Lab%233.png").unwrap();
        let name = last_path_segment(&url).unwrap();
        assert_eq!(name, "Lab#3.png");

        let layout = LocalFileLayout::new("/files");
        let path = layout.external_file_path(1, 1, &name);
        assert_eq!(path, "/files/1/external_1/Lab#3.png");
        assert_eq!(file_uri(&path), "file:///files/1/external_1/Lab%233.png");
    }
}
