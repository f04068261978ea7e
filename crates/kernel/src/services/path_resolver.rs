//! URL path to page resolution.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;
use uuid::Uuid;

use crate::config::PageConfig;
use crate::content::{ContentMemo, ContentStore};
use crate::models::{Page, PageStatus, content_types};
use crate::path::{last_segment, strip_slashes};
use crate::services::lineage::lineage;
use crate::services::page::PageService;
use crate::services::slug_index::SlugIndex;

/// Resolves paths like `about/team` to pages.
///
/// Only the last segment is looked up in the slug index. The full path is
/// compared against a candidate's complete slug when several pages share
/// that slug, or always in strict mode.
#[derive(Clone)]
pub struct PathResolver {
    pages: PageService,
    slugs: SlugIndex,
    contents: Arc<ContentStore>,
    config: Arc<PageConfig>,
}

impl PathResolver {
    pub fn new(
        pages: PageService,
        slugs: SlugIndex,
        contents: Arc<ContentStore>,
        config: Arc<PageConfig>,
    ) -> Self {
        Self {
            pages,
            slugs,
            contents,
            config,
        }
    }

    /// Resolve a path to a page for `language`.
    ///
    /// The empty path (or `/`) resolves to the first root page.
    pub async fn resolve(
        &self,
        path: &str,
        language: &str,
        exclude_drafts: bool,
        memo: &mut ContentMemo,
    ) -> Result<Option<Page>> {
        let path = strip_slashes(path);
        if path.is_empty() {
            return self.pages.first_root().await;
        }

        let slug = last_segment(path);
        let candidates = self.slugs.candidates(slug).await?;
        if candidates.is_empty() {
            debug!(path = %path, "no page carries this slug");
            return Ok(None);
        }

        let mut query = self.pages.scoped().ids(candidates.clone());
        if exclude_drafts {
            query = query.excluding(PageStatus::Draft);
        }
        let mut found: HashMap<Uuid, Page> = self
            .pages
            .list(&query)
            .await
            .context("failed to load slug candidates")?
            .into_iter()
            .map(|page| (page.id, page))
            .collect();

        // Keep slug index order.
        let pages: Vec<Page> = candidates
            .iter()
            .filter_map(|id| found.remove(id))
            .collect();

        match pages.as_slice() {
            [] => Ok(None),
            [page] => {
                if self.config.use_strict_url
                    && self.complete_slug(page, language, memo).await? != path
                {
                    debug!(path = %path, page_id = %page.id, "strict url mismatch");
                    return Ok(None);
                }
                Ok(Some(page.clone()))
            }
            _ => {
                for page in &pages {
                    if self.complete_slug(page, language, memo).await? == path {
                        debug!(path = %path, page_id = %page.id, candidates = pages.len(), "ambiguous slug resolved");
                        return Ok(Some(page.clone()));
                    }
                }
                debug!(path = %path, candidates = pages.len(), "no candidate matches full path");
                Ok(None)
            }
        }
    }

    /// Slugs of the page and its ancestors, root first, joined with `/`.
    pub async fn complete_slug(
        &self,
        page: &Page,
        language: &str,
        memo: &mut ContentMemo,
    ) -> Result<String> {
        let chain = lineage(self.pages.repository(), page).await?;
        let mut slugs = Vec::with_capacity(chain.len());
        for node in &chain {
            slugs.push(
                self.contents
                    .get_body(node, language, content_types::SLUG, true, memo)
                    .await?,
            );
        }
        Ok(slugs.join("/"))
    }

    /// Absolute URL path of a page.
    pub async fn url_path(
        &self,
        page: &Page,
        language: &str,
        memo: &mut ContentMemo,
    ) -> Result<String> {
        Ok(format!("/{}", self.complete_slug(page, language, memo).await?))
    }
}

impl std::fmt::Debug for PathResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathResolver")
            .field("strict", &self.config.use_strict_url)
            .finish()
    }
}
