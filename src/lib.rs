#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod asset_paths;
pub mod config;
pub mod metadata;
pub mod models;
pub mod queue;
pub mod rewriter;
pub mod store;

pub use config::RewriterConfig;
pub use metadata::{FileMetadataSource, HttpFileMetadataSource, MetadataError};
pub use models::{FileMetadata, FileSyncSettingsRecord, HtmlParseResult, LocalFileRecord};
pub use queue::{DownloadRequest, SyncQueue};
pub use rewriter::HtmlRewriter;
pub use store::{InMemoryFileStore, OfflineFileStore, StoreSnapshot};
