//! Accumulates the files a course sync still has to download.
//!
//! Each rewritten fragment contributes internal file ids and external URLs. The queue
//! deduplicates them across fragments and hands them out in fixed-size download batches.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::HtmlParseResult;

/// Number of downloads a sync worker runs concurrently.
pub const DEFAULT_BATCH_SIZE: usize = 6;

/// A single file download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DownloadRequest {
    /// LMS-hosted file addressed by id.
    Internal {
        /// Remote file id.
        file_id: i64,
    },
    /// Third-party asset addressed by URL.
    External {
        /// Source URL.
        url: String,
    },
}

/// Files referenced by a course's HTML content that are not yet on the device.
#[derive(Debug, Clone, Default)]
pub struct SyncQueue {
    scope_id: i64,
    internal_file_ids: BTreeSet<i64>,
    external_file_urls: Vec<String>,
    seen_external: BTreeSet<String>,
}

impl SyncQueue {
    /// Empty queue for a course.
    pub fn new(scope_id: i64) -> Self {
        Self {
            scope_id,
            ..Self::default()
        }
    }

    /// Course the queue belongs to.
    pub fn scope_id(&self) -> i64 {
        self.scope_id
    }

    /// Merge a rewrite result and return its HTML.
    pub fn absorb(&mut self, result: HtmlParseResult) -> Option<String> {
        self.internal_file_ids.extend(result.internal_file_ids);
        for url in result.external_file_urls {
            if self.seen_external.insert(url.clone()) {
                self.external_file_urls.push(url);
            }
        }
        result.html_with_local_file_links
    }

    /// Internal file ids queued so far.
    pub fn internal_file_ids(&self) -> &BTreeSet<i64> {
        &self.internal_file_ids
    }

    /// External URLs queued so far, in the order they were first absorbed.
    pub fn external_file_urls(&self) -> &[String] {
        &self.external_file_urls
    }

    /// Total number of queued downloads.
    pub fn len(&self) -> usize {
        self.internal_file_ids.len() + self.external_file_urls.len()
    }

    /// Returns `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split the queue into download batches, internal files first.
    ///
    /// A `size` of zero is treated as one.
    pub fn download_batches(&self, size: usize) -> Vec<Vec<DownloadRequest>> {
        let requests: Vec<DownloadRequest> = self
            .internal_file_ids
            .iter()
            .map(|&file_id| DownloadRequest::Internal { file_id })
            .chain(
                self.external_file_urls
                    .iter()
                    .map(|url| DownloadRequest::External { url: url.clone() }),
            )
            .collect();

        requests
            .chunks(size.max(1))
            .map(|chunk| chunk.to_vec())
            .collect()
    }
}
