//! Remote file metadata lookups used to name files that are not yet synced.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

use crate::config::RewriterConfig;
use crate::models::FileMetadata;

/// Errors returned by a [`FileMetadataSource`].
#[derive(Debug, Error)]
pub enum MetadataError {
    /// The file does not exist or is not visible to the caller.
    #[error("file {file_id} not found in scope {scope_id}")]
    NotFound {
        /// Course the lookup was made against.
        scope_id: i64,
        /// Requested file id.
        file_id: i64,
    },

    /// Transport failure or unexpected HTTP status.
    #[error("metadata request failed: {0}")]
    Http(String),

    /// The response body did not match the expected shape.
    #[error("failed to decode file metadata: {0}")]
    Decode(String),

    /// The source cannot reach the network.
    #[error("metadata source unavailable")]
    Unavailable,
}

/// Remote lookup of a course file's metadata.
#[async_trait]
pub trait FileMetadataSource: Send + Sync {
    /// Fetch metadata for `file_id` within `scope_id`.
    async fn fetch_file_metadata(
        &self,
        scope_id: i64,
        file_id: i64,
    ) -> Result<FileMetadata, MetadataError>;
}

/// Metadata source backed by the LMS REST API.
pub struct HttpFileMetadataSource {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpFileMetadataSource {
    /// Build a client for the configured API domain.
    pub fn new(config: &RewriterConfig) -> Result<Self, MetadataError> {
        let client = reqwest::Client::builder()
            .timeout(config.metadata_timeout())
            .build()
            .map_err(|e| MetadataError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: api_base_url(&config.api_domain),
            access_token: config.access_token.clone(),
        })
    }

    fn file_endpoint(&self, scope_id: i64, file_id: i64) -> String {
        format!(
            "{}/api/v1/courses/{}/files/{}",
            self.base_url, scope_id, file_id
        )
    }
}

#[async_trait]
impl FileMetadataSource for HttpFileMetadataSource {
    async fn fetch_file_metadata(
        &self,
        scope_id: i64,
        file_id: i64,
    ) -> Result<FileMetadata, MetadataError> {
        let endpoint = self.file_endpoint(scope_id, file_id);
        tracing::debug!(%endpoint, "fetching file metadata");

        let mut request = self.client.get(&endpoint);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MetadataError::Http(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(MetadataError::NotFound { scope_id, file_id });
            }
            status if !status.is_success() => {
                return Err(MetadataError::Http(format!(
                    "{endpoint} returned {status}"
                )));
            }
            _ => {}
        }

        response
            .json::<FileMetadata>()
            .await
            .map_err(|e| MetadataError::Decode(e.to_string()))
    }
}

/// Metadata source answering from a fixed table.
#[derive(Debug, Default, Clone)]
pub struct StaticFileMetadataSource {
    entries: HashMap<i64, FileMetadata>,
}

impl StaticFileMetadataSource {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with the given display name.
    pub fn with_file(mut self, file_id: i64, display_name: impl Into<String>) -> Self {
        self.entries.insert(
            file_id,
            FileMetadata {
                id: file_id,
                display_name: Some(display_name.into()),
                url: None,
            },
        );
        self
    }
}

#[async_trait]
impl FileMetadataSource for StaticFileMetadataSource {
    async fn fetch_file_metadata(
        &self,
        scope_id: i64,
        file_id: i64,
    ) -> Result<FileMetadata, MetadataError> {
        self.entries
            .get(&file_id)
            .cloned()
            .ok_or(MetadataError::NotFound { scope_id, file_id })
    }
}

/// Metadata source for runs without network access. Every lookup fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineMetadataSource;

#[async_trait]
impl FileMetadataSource for OfflineMetadataSource {
    async fn fetch_file_metadata(
        &self,
        _scope_id: i64,
        _file_id: i64,
    ) -> Result<FileMetadata, MetadataError> {
        Err(MetadataError::Unavailable)
    }
}

fn api_base_url(domain: &str) -> String {
    let trimmed = domain.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}
