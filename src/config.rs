//! Rewriter configuration loader.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::asset_paths::LocalFileLayout;

/// File name searched for by [`RewriterConfig::discover`].
pub const DEFAULT_CONFIG_FILE: &str = "offline_sync.config.json";

/// Settings shared by the rewriter and the metadata client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RewriterConfig {
    /// Host of the LMS API. Assets served from this host are internal files.
    pub api_domain: String,
    /// Root directory of the on-device file cache.
    pub app_files_dir: String,
    /// Bearer token used when fetching file metadata.
    pub access_token: Option<String>,
    /// Upper bound on a single metadata request.
    pub metadata_timeout_secs: u64,
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            api_domain: "canvas.instructure.com".into(),
            app_files_dir: "/files".into(),
            access_token: None,
            metadata_timeout_secs: 30,
        }
    }
}

impl RewriterConfig {
    /// Attempt to load configuration from the provided directory.
    ///
    /// A missing or unparsable file yields the default configuration.
    pub fn discover(dir: &Path) -> Self {
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        Self::from_path(&candidate).unwrap_or_default()
    }

    /// Read configuration from a specific JSON file.
    pub fn from_path(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Replace the API domain.
    pub fn with_api_domain(mut self, domain: impl Into<String>) -> Self {
        self.api_domain = domain.into();
        self
    }

    /// Replace the file cache root.
    pub fn with_app_files_dir(mut self, dir: impl Into<String>) -> Self {
        self.app_files_dir = dir.into();
        self
    }

    /// Cache layout rooted at [`Self::app_files_dir`].
    pub fn layout(&self) -> LocalFileLayout {
        LocalFileLayout::new(&self.app_files_dir)
    }

    /// Metadata request timeout as a [`Duration`].
    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn falls_back_to_defaults_without_config_file() {
        let dir = tempdir().unwrap();
        assert_eq!(RewriterConfig::discover(dir.path()), RewriterConfig::default());
    }

    #[test]
    fn falls_back_to_defaults_on_invalid_json() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "{ not json").unwrap();
        assert_eq!(RewriterConfig::discover(dir.path()), RewriterConfig::default());
    }

    #[test]
    fn reads_partial_config_over_defaults() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(DEFAULT_CONFIG_FILE),
            r#"{ "api_domain": "school.instructure.com", "access_token": "abc" }"#,
        )
        .unwrap();

        let config = RewriterConfig::discover(dir.path());
        assert_eq!(config.api_domain, "school.instructure.com");
        assert_eq!(config.access_token.as_deref(), Some("abc"));
        assert_eq!(config.app_files_dir, "/files");
        assert_eq!(config.metadata_timeout(), Duration::from_secs(30));
    }
}
