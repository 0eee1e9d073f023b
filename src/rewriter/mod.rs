//! Rewrites asset references in LMS HTML so synced files resolve to on-device paths.
//!
//! Three kinds of reference are recognised, and handled in this order:
//!
//! 1. `<img>` tags served from the API domain that carry a file id. Their `src` is pointed
//!    at the downloaded copy, or at the path the file will occupy once downloaded.
//! 2. `<a>` file links on the API domain. These are never rewritten, only queued when no
//!    sync setting exists for the file yet.
//! 3. `<img>` tags served from any other host. Their `src` is pointed into an
//!    `external_<index>` bucket and the original URL is queued.
//!
//! Anything else, including tags that fail to parse, is left untouched.

mod tags;

use std::collections::HashMap;

use url::Url;

use crate::asset_paths::{
    LocalFileLayout, extract_file_id, file_uri, host_matches_domain, is_fetchable_url,
    is_unsyncable_reference, last_path_segment, placeholder_name,
};
use crate::config::RewriterConfig;
use crate::metadata::FileMetadataSource;
use crate::models::HtmlParseResult;
use crate::store::OfflineFileStore;

use tags::{Attribute, Edit, Tag, TagKind, apply_edits, quote_attribute, scan_tags};

/// Attribute some LMS editors attach to embedded images pointing at the file API.
const API_ENDPOINT_ATTRIBUTE: &str = "data-api-endpoint";

/// Rewrites HTML fragments against the sync database and the remote file API.
pub struct HtmlRewriter<'a> {
    api_domain: String,
    layout: LocalFileLayout,
    store: &'a dyn OfflineFileStore,
    metadata: &'a dyn FileMetadataSource,
}

/// How a single tag participates in the rewrite.
#[derive(Debug)]
enum Reference<'t> {
    InternalImage { file_id: i64, src: &'t Attribute },
    InternalLink { file_id: i64 },
    ExternalImage {
        url: String,
        name: String,
        src: &'t Attribute,
    },
}

/// Mutable state for one `rewrite` call.
#[derive(Default)]
struct RewritePass {
    edits: Vec<Edit>,
    result: HtmlParseResult,
    display_names: HashMap<i64, String>,
    external_indices: HashMap<String, usize>,
}

impl RewritePass {
    fn replace_value(&mut self, attribute: &Attribute, value: &str) {
        self.edits.push(Edit {
            span: attribute.value_span.clone(),
            replacement: quote_attribute(value),
        });
    }

    fn external_index(&mut self, url: &str) -> usize {
        let next = self.external_indices.len() + 1;
        *self.external_indices.entry(url.to_string()).or_insert(next)
    }

    fn finish(self, html: &str) -> HtmlParseResult {
        HtmlParseResult {
            html_with_local_file_links: Some(apply_edits(html, self.edits)),
            ..self.result
        }
    }
}

impl<'a> HtmlRewriter<'a> {
    /// Create a rewriter for the configured API domain and cache root.
    pub fn new(
        config: &RewriterConfig,
        store: &'a dyn OfflineFileStore,
        metadata: &'a dyn FileMetadataSource,
    ) -> Self {
        Self {
            api_domain: config.api_domain.clone(),
            layout: config.layout(),
            store,
            metadata,
        }
    }

    /// Rewrite `html` for offline use within `scope_id`.
    ///
    /// Never fails. Metadata lookups that fail fall back to a placeholder file name and the
    /// file is still queued. The returned future performs all edits at the end, so dropping
    /// it part way leaves nothing observable behind.
    pub async fn rewrite(&self, html: Option<&str>, scope_id: i64) -> HtmlParseResult {
        let Some(html) = html else {
            return HtmlParseResult::empty(None);
        };
        if html.trim().is_empty() {
            return HtmlParseResult::empty(Some(html.to_string()));
        }

        let tags = scan_tags(html);
        let references: Vec<Reference<'_>> =
            tags.iter().filter_map(|tag| self.classify(tag)).collect();

        let mut pass = RewritePass::default();
        self.rewrite_internal_images(&references, scope_id, &mut pass)
            .await;
        self.queue_internal_links(&references, &mut pass);
        self.rewrite_external_images(&references, scope_id, &mut pass);

        tracing::debug!(
            scope_id,
            internal = pass.result.internal_file_ids.len(),
            external = pass.result.external_file_urls.len(),
            edits = pass.edits.len(),
            "rewrote html fragment"
        );
        pass.finish(html)
    }

    fn classify<'t>(&self, tag: &'t Tag) -> Option<Reference<'t>> {
        match tag.kind {
            TagKind::Image => {
                let src = tag.attribute("src")?;
                let url = parse_reference(&src.value)?;
                if host_matches_domain(&url, &self.api_domain) {
                    let file_id = extract_file_id(url.path()).or_else(|| {
                        tag.attribute(API_ENDPOINT_ATTRIBUTE)
                            .and_then(|endpoint| extract_file_id(&endpoint.value))
                    })?;
                    Some(Reference::InternalImage { file_id, src })
                } else if is_fetchable_url(&url) {
                    let name = last_path_segment(&url)?;
                    Some(Reference::ExternalImage {
                        url: without_fragment(&src.value).to_string(),
                        name,
                        src,
                    })
                } else {
                    None
                }
            }
            TagKind::Anchor => {
                let href = tag.attribute("href")?;
                let url = parse_reference(&href.value)?;
                if !host_matches_domain(&url, &self.api_domain) {
                    return None;
                }
                let file_id = extract_file_id(url.path())?;
                Some(Reference::InternalLink { file_id })
            }
        }
    }

    async fn rewrite_internal_images(
        &self,
        references: &[Reference<'_>],
        scope_id: i64,
        pass: &mut RewritePass,
    ) {
        for reference in references {
            let Reference::InternalImage { file_id, src } = reference else {
                continue;
            };
            let file_id = *file_id;

            let synced = self
                .store
                .local_file(file_id, scope_id)
                .filter(|record| !record.path.trim().is_empty());
            if let Some(record) = synced {
                tracing::debug!(file_id, scope_id, path = %record.path, "image already synced");
                pass.replace_value(src, &file_uri(&record.path));
                continue;
            }

            let name = self.display_name(scope_id, file_id, pass).await;
            let path = self.layout.internal_file_path(scope_id, file_id, &name);
            pass.replace_value(src, &file_uri(&path));
            pass.result.internal_file_ids.insert(file_id);
        }
    }

    fn queue_internal_links(&self, references: &[Reference<'_>], pass: &mut RewritePass) {
        for reference in references {
            let Reference::InternalLink { file_id } = reference else {
                continue;
            };
            if self.store.sync_setting(*file_id).is_some() {
                tracing::debug!(file_id, "file link already scheduled");
                continue;
            }
            pass.result.internal_file_ids.insert(*file_id);
        }
    }

    fn rewrite_external_images(
        &self,
        references: &[Reference<'_>],
        scope_id: i64,
        pass: &mut RewritePass,
    ) {
        for reference in references {
            let Reference::ExternalImage { url, name, src } = reference else {
                continue;
            };
            let index = pass.external_index(url);
            let path = self.layout.external_file_path(scope_id, index, name);
            pass.replace_value(src, &file_uri(&path));
            pass.result.external_file_urls.insert(url.clone());
        }
    }

    async fn display_name(&self, scope_id: i64, file_id: i64, pass: &mut RewritePass) -> String {
        if let Some(name) = pass.display_names.get(&file_id) {
            return name.clone();
        }

        let fetched = match self.metadata.fetch_file_metadata(scope_id, file_id).await {
            Ok(metadata) => metadata
                .display_name
                .filter(|name| !name.trim().is_empty()),
            Err(err) => {
                tracing::warn!(file_id, scope_id, error = %err, "file metadata lookup failed");
                None
            }
        };
        let name = fetched.unwrap_or_else(|| {
            tracing::warn!(file_id, scope_id, "using placeholder file name");
            placeholder_name(file_id)
        });

        pass.display_names.insert(file_id, name.clone());
        name
    }
}

/// Fragments never change the fetched asset. The query is kept since it can select a
/// different rendition.
fn without_fragment(value: &str) -> &str {
    let trimmed = value.trim();
    trimmed
        .split_once('#')
        .map(|(url, _)| url)
        .unwrap_or(trimmed)
}

fn parse_reference(value: &str) -> Option<Url> {
    let trimmed = value.trim();
    if trimmed.is_empty() || is_unsyncable_reference(trimmed) {
        return None;
    }
    Url::parse(trimmed).ok()
}
