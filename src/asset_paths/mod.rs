//! Helpers for classifying asset URLs and building their on-device locations.
//!
//! Filtering of references and construction of cache paths are kept in separate
//! submodules so each can be tested independently of the HTML rewriter.

mod filters;
mod layout;

pub use filters::{extract_file_id, host_matches_domain, is_fetchable_url, is_unsyncable_reference};
pub use layout::{
    LocalFileLayout, file_uri, last_path_segment, placeholder_name, sanitize_file_name,
};
