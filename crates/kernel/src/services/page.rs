//! Page queries.
//!
//! Every listing here is restricted to the current site when site scoping
//! is enabled.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::config::PageConfig;
use crate::models::{NewPage, Page, PageQuery, PageStatus};
use crate::storage::PageRepository;

/// Page service.
#[derive(Clone)]
pub struct PageService {
    pages: Arc<dyn PageRepository>,
    config: Arc<PageConfig>,
}

impl PageService {
    pub fn new(pages: Arc<dyn PageRepository>, config: Arc<PageConfig>) -> Self {
        Self { pages, config }
    }

    /// The underlying repository.
    pub fn repository(&self) -> &dyn PageRepository {
        self.pages.as_ref()
    }

    /// Base query restricted to the current site.
    pub fn scoped(&self) -> PageQuery {
        PageQuery::new().on_site(self.config.site_scope())
    }

    /// Restrict a query to pages visible to visitors at `now`.
    pub fn visible_at(&self, mut query: PageQuery, now: DateTime<Utc>) -> PageQuery {
        if let Some(site_id) = self.config.site_scope() {
            query.site_id = Some(site_id);
        }
        query.status = Some(PageStatus::Published);
        if self.config.show_start_date {
            query.published_by = Some(now);
        }
        if self.config.show_end_date {
            query.not_ended_at = Some(now);
        }
        query
    }

    /// Load a page by id, regardless of site.
    pub async fn find(&self, id: Uuid) -> Result<Option<Page>> {
        self.pages.find_by_id(id).await
    }

    /// Run an arbitrary query.
    pub async fn list(&self, query: &PageQuery) -> Result<Vec<Page>> {
        self.pages.list(query).await
    }

    /// Create a page.
    ///
    /// Published pages without a publication date get the current time, and
    /// pages without sites join the configured site.
    pub async fn create(&self, mut input: NewPage) -> Result<Page> {
        if input.status == PageStatus::Published && input.publication_date.is_none() {
            input.publication_date = Some(Utc::now());
        }
        if input.sites.is_empty() {
            input.sites = vec![self.config.site_id];
        }
        let page = self.pages.create(input).await?;
        debug!(page_id = %page.id, status = ?page.status, "page created");
        Ok(page)
    }

    /// Save a page, stamping a publication date on first publication.
    pub async fn save(&self, page: &mut Page) -> Result<()> {
        if page.status == PageStatus::Published && page.publication_date.is_none() {
            page.publication_date = Some(Utc::now());
        }
        self.pages.save(page).await
    }

    /// Pin (or with `None`, unpin) a page's content view to an instant.
    pub async fn freeze(&self, page: &mut Page, at: Option<DateTime<Utc>>) -> Result<()> {
        page.freeze_date = at;
        self.save(page).await
    }

    /// All pages of the current site.
    pub async fn on_site(&self) -> Result<Vec<Page>> {
        self.pages.list(&self.scoped()).await
    }

    /// Pages without a parent.
    pub async fn roots(&self) -> Result<Vec<Page>> {
        self.pages.list(&self.scoped().roots()).await
    }

    /// The oldest root page.
    pub async fn first_root(&self) -> Result<Option<Page>> {
        let roots = self.pages.list(&self.scoped().roots().limit(1)).await?;
        Ok(roots.into_iter().next())
    }

    /// Direct children of a page.
    pub async fn children(&self, parent_id: Uuid) -> Result<Vec<Page>> {
        self.pages.list(&self.scoped().children_of(parent_id)).await
    }

    /// Published root pages.
    pub async fn navigation(&self) -> Result<Vec<Page>> {
        let query = self.scoped().roots().status(PageStatus::Published);
        self.pages.list(&query).await
    }

    /// Pages visible to visitors at `now`.
    pub async fn published(&self, now: DateTime<Utc>) -> Result<Vec<Page>> {
        self.pages.list(&self.visible_at(PageQuery::new(), now)).await
    }

    /// Draft pages. When start dates gate visibility, only drafts scheduled
    /// at or after `now`.
    pub async fn drafts(&self, now: DateTime<Utc>) -> Result<Vec<Page>> {
        let mut query = self.scoped().status(PageStatus::Draft);
        if self.config.show_start_date {
            query.published_from = Some(now);
        }
        self.pages.list(&query).await
    }

    /// Hidden pages.
    pub async fn hidden(&self) -> Result<Vec<Page>> {
        self.pages
            .list(&self.scoped().status(PageStatus::Hidden))
            .await
    }

    /// Pages whose publication window closed at or before `now`.
    pub async fn expired(&self, now: DateTime<Utc>) -> Result<Vec<Page>> {
        let query = PageQuery {
            ended_by: Some(now),
            ..self.scoped()
        };
        self.pages.list(&query).await
    }
}

impl std::fmt::Debug for PageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageService").finish()
    }
}
