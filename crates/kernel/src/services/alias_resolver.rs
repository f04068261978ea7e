//! Alias lookups for paths that match no page.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;
use uuid::Uuid;

use crate::models::PageAlias;
use crate::path::normalize_url;
use crate::storage::AliasRepository;

/// Alias resolver service.
///
/// Aliases can be plain paths (`/foo/bar`) or carry a query string
/// (`/index.php?page=foo`). The query-qualified form wins.
#[derive(Clone)]
pub struct AliasResolver {
    aliases: Arc<dyn AliasRepository>,
}

impl AliasResolver {
    pub fn new(aliases: Arc<dyn AliasRepository>) -> Self {
        Self { aliases }
    }

    /// Find the alias for a request path and its raw query string.
    pub async fn resolve_alias(
        &self,
        path: &str,
        query: Option<&str>,
    ) -> Result<Option<PageAlias>> {
        let url = normalize_url(path);

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            let qualified = format!("{url}?{query}");
            if let Some(alias) = self.find(&qualified).await? {
                return Ok(Some(alias));
            }
        }

        self.find(&url).await
    }

    async fn find(&self, url: &str) -> Result<Option<PageAlias>> {
        let alias = self
            .aliases
            .find_by_url(url)
            .await
            .with_context(|| format!("failed to look up alias {url:?}"))?;
        if let Some(alias) = &alias {
            debug!(url = %url, page_id = %alias.page_id, "alias hit");
        }
        Ok(alias)
    }

    /// Point `url` at a page. The url is normalized first; a url that is
    /// already taken is an error.
    pub async fn create_alias(&self, page_id: Uuid, url: &str) -> Result<PageAlias> {
        let url = normalize_url(url);
        let alias = self
            .aliases
            .create(page_id, &url)
            .await
            .with_context(|| format!("failed to create alias {url:?}"))?;
        debug!(url = %alias.url, page_id = %page_id, "alias created");
        Ok(alias)
    }

    /// Remove an alias. Returns whether it existed.
    pub async fn delete_alias(&self, id: Uuid) -> Result<bool> {
        self.aliases.delete(id).await
    }

    /// All aliases of a page, newest first.
    pub async fn aliases_for(&self, page_id: Uuid) -> Result<Vec<PageAlias>> {
        self.aliases.list_for_page(page_id).await
    }
}

impl std::fmt::Debug for AliasResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliasResolver").finish()
    }
}
