//! Storage backends for pages, content and aliases.
//!
//! Services only talk to the repository traits below. Two backends exist:
//! [`PgStore`] for PostgreSQL and [`MemoryStore`] for tests and embedding.
//! Every method either succeeds or fails as a whole; retries and timeouts
//! belong to the backend.

mod memory;
mod postgres;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{Content, NewContent, NewPage, Page, PageAlias, PageQuery, SlugCandidate};

/// Page persistence.
#[async_trait]
pub trait PageRepository: Send + Sync {
    /// Load a page by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Page>>;

    /// List pages matching the query, oldest first.
    async fn list(&self, query: &PageQuery) -> Result<Vec<Page>>;

    /// Insert a new page.
    async fn create(&self, input: NewPage) -> Result<Page>;

    /// Persist the mutable fields of an existing page.
    async fn save(&self, page: &Page) -> Result<()>;
}

/// Content revision persistence.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Latest revision for a tuple, optionally limited to revisions created
    /// at or before `created_until`.
    async fn latest(
        &self,
        page_id: Uuid,
        language: &str,
        content_type: &str,
        created_until: Option<DateTime<Utc>>,
    ) -> Result<Option<Content>>;

    /// All revisions for a tuple, newest first.
    async fn history(
        &self,
        page_id: Uuid,
        language: &str,
        content_type: &str,
    ) -> Result<Vec<Content>>;

    /// Insert a new revision stamped with the current time.
    async fn create(&self, input: NewContent) -> Result<Content>;

    /// Overwrite the body of an existing revision.
    async fn update_body(&self, id: Uuid, body: &str) -> Result<Content>;

    /// Delete every revision of a tuple except the `keep` most recent.
    /// Returns the number of deleted revisions.
    async fn prune(
        &self,
        page_id: Uuid,
        language: &str,
        content_type: &str,
        keep: usize,
    ) -> Result<u64>;

    /// Pages that have ever carried `slug`, with the last time it was set,
    /// most recent first.
    async fn slug_candidates(&self, slug: &str) -> Result<Vec<SlugCandidate>>;

    /// Most recent revision of `content_type` whose body equals `body`,
    /// optionally limited to pages on a site.
    async fn latest_by_body(
        &self,
        content_type: &str,
        body: &str,
        site_id: Option<i32>,
    ) -> Result<Option<Content>>;
}

/// Page alias persistence.
#[async_trait]
pub trait AliasRepository: Send + Sync {
    /// Exact lookup by normalized url.
    async fn find_by_url(&self, url: &str) -> Result<Option<PageAlias>>;

    /// Insert an alias. Fails if the url is already taken.
    async fn create(&self, page_id: Uuid, url: &str) -> Result<PageAlias>;

    /// Delete an alias by id.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// All aliases pointing at a page, newest first.
    async fn list_for_page(&self, page_id: Uuid) -> Result<Vec<PageAlias>>;
}

/// The three repositories a deployment is wired with.
#[derive(Clone)]
pub struct Repositories {
    pub pages: Arc<dyn PageRepository>,
    pub contents: Arc<dyn ContentRepository>,
    pub aliases: Arc<dyn AliasRepository>,
}

impl Repositories {
    /// Repositories backed by PostgreSQL.
    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            pages: store.clone(),
            contents: store.clone(),
            aliases: store,
        }
    }

    /// Repositories backed by a shared in-memory store.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            pages: store.clone(),
            contents: store.clone(),
            aliases: store,
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish()
    }
}
