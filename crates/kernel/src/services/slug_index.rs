//! Slug lookups.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;
use uuid::Uuid;

use crate::config::PageConfig;
use crate::models::{Content, content_types};
use crate::storage::ContentRepository;

/// Maps slug strings to the pages that carry, or once carried, them.
///
/// Old slug revisions stay in the index, so a page keeps answering to a slug
/// after it was renamed. Ties are left to the caller.
#[derive(Clone)]
pub struct SlugIndex {
    contents: Arc<dyn ContentRepository>,
    config: Arc<PageConfig>,
}

impl SlugIndex {
    pub fn new(contents: Arc<dyn ContentRepository>, config: Arc<PageConfig>) -> Self {
        Self { contents, config }
    }

    /// Candidate page ids for `slug`: most recently set first, then by id.
    pub async fn candidates(&self, slug: &str) -> Result<Vec<Uuid>> {
        let candidates = self
            .contents
            .slug_candidates(slug)
            .await
            .with_context(|| format!("failed to look up slug {slug:?}"))?;

        let mut ids: Vec<Uuid> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !ids.contains(&candidate.page_id) {
                ids.push(candidate.page_id);
            }
        }

        debug!(slug = %slug, candidates = ids.len(), "slug candidates");
        Ok(ids)
    }

    /// Most recent slug content with this body, on the current site when
    /// site scoping is enabled.
    pub async fn latest_slug_content(&self, slug: &str) -> Result<Option<Content>> {
        self.contents
            .latest_by_body(content_types::SLUG, slug, self.config.site_scope())
            .await
            .with_context(|| format!("failed to load latest slug {slug:?}"))
    }
}

impl std::fmt::Debug for SlugIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlugIndex").finish()
    }
}
