//! Data structures exchanged between the rewriter and its collaborators.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of rewriting a single HTML fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlParseResult {
    /// Rewritten HTML, or `None` when the input was `None`.
    pub html_with_local_file_links: Option<String>,
    /// Internal file ids referenced by the fragment that still need to be synced.
    pub internal_file_ids: BTreeSet<i64>,
    /// External asset URLs referenced by the fragment that still need to be synced.
    pub external_file_urls: BTreeSet<String>,
}

impl HtmlParseResult {
    /// Result carrying the given HTML and nothing to sync.
    pub fn empty(html: Option<String>) -> Self {
        Self {
            html_with_local_file_links: html,
            internal_file_ids: BTreeSet::new(),
            external_file_urls: BTreeSet::new(),
        }
    }

    /// Returns `true` when no file needs to be queued.
    pub fn is_empty(&self) -> bool {
        self.internal_file_ids.is_empty() && self.external_file_urls.is_empty()
    }
}

/// A file that has already been downloaded to the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalFileRecord {
    /// Remote file id.
    pub id: i64,
    /// Course (or other container) the file was synced for.
    pub scope_id: i64,
    /// When the download completed.
    pub created_date: DateTime<Utc>,
    /// Absolute on-device path of the downloaded file.
    pub path: String,
}

/// Marker stating that a file link has already been scheduled for sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSyncSettingsRecord {
    /// Remote file id.
    pub id: i64,
    /// Course the setting belongs to.
    pub scope_id: i64,
    /// Display name known at scheduling time.
    #[serde(default)]
    pub file_name: Option<String>,
    /// Download URL known at scheduling time.
    #[serde(default)]
    pub url: Option<String>,
}

/// Remote metadata describing a course file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Remote file id.
    pub id: i64,
    /// Name the file is presented with.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Authenticated download URL.
    #[serde(default)]
    pub url: Option<String>,
}
