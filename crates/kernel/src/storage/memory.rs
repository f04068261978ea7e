//! In-memory storage backend.
//!
//! Keeps everything behind a single `parking_lot::RwLock`. Locks are never
//! held across an await point.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::{AliasRepository, ContentRepository, PageRepository};
use crate::models::{
    Content, NewContent, NewPage, Page, PageAlias, PageQuery, SlugCandidate, content_types,
};

/// Repositories held in process memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    pages: Vec<Page>,
    contents: Vec<Content>,
    aliases: Vec<PageAlias>,
    /// Last timestamp handed out, so creation times strictly increase.
    last_stamp: Option<DateTime<Utc>>,
}

impl MemoryInner {
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let mut now = Utc::now();
        if let Some(last) = self.last_stamp
            && now <= last
        {
            now = last + Duration::microseconds(1);
        }
        self.last_stamp = Some(now);
        now
    }

    fn tuple<'a>(
        &'a self,
        page_id: Uuid,
        language: &'a str,
        content_type: &'a str,
    ) -> impl Iterator<Item = &'a Content> + 'a {
        self.contents.iter().filter(move |c| {
            c.page_id == page_id && c.language == language && c.content_type == content_type
        })
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed content revision, keeping its id and creation
    /// time. Used to seed history at known instants.
    pub fn insert_content(&self, content: Content) {
        let mut inner = self.inner.write();
        inner.contents.retain(|c| c.id != content.id);
        inner.contents.push(content);
    }

    /// Number of stored revisions across all tuples.
    pub fn content_count(&self) -> usize {
        self.inner.read().contents.len()
    }
}

fn newest_first(revisions: &mut [Content]) {
    revisions.sort_by_key(|c| std::cmp::Reverse(c.recency()));
}

#[async_trait]
impl PageRepository for MemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Page>> {
        Ok(self.inner.read().pages.iter().find(|p| p.id == id).cloned())
    }

    async fn list(&self, query: &PageQuery) -> Result<Vec<Page>> {
        let inner = self.inner.read();
        let mut pages: Vec<Page> = inner
            .pages
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        pages.sort_by_key(|p| (p.created, p.id));
        if let Some(limit) = query.limit {
            pages.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(pages)
    }

    async fn create(&self, input: NewPage) -> Result<Page> {
        let mut inner = self.inner.write();
        let now = inner.next_stamp();
        let page = Page {
            id: Uuid::now_v7(),
            parent_id: input.parent_id,
            status: input.status,
            publication_date: input.publication_date,
            publication_end_date: input.publication_end_date,
            freeze_date: None,
            sites: input.sites,
            created: now,
            changed: now,
        };
        inner.pages.push(page.clone());
        Ok(page)
    }

    async fn save(&self, page: &Page) -> Result<()> {
        let mut inner = self.inner.write();
        let now = inner.next_stamp();
        let Some(stored) = inner.pages.iter_mut().find(|p| p.id == page.id) else {
            anyhow::bail!("page {} does not exist", page.id);
        };
        *stored = Page {
            changed: now,
            ..page.clone()
        };
        Ok(())
    }
}

#[async_trait]
impl ContentRepository for MemoryStore {
    async fn latest(
        &self,
        page_id: Uuid,
        language: &str,
        content_type: &str,
        created_until: Option<DateTime<Utc>>,
    ) -> Result<Option<Content>> {
        let inner = self.inner.read();
        let latest = inner
            .tuple(page_id, language, content_type)
            .filter(|c| created_until.is_none_or(|until| c.created <= until))
            .max_by_key(|c| c.recency())
            .cloned();
        Ok(latest)
    }

    async fn history(
        &self,
        page_id: Uuid,
        language: &str,
        content_type: &str,
    ) -> Result<Vec<Content>> {
        let inner = self.inner.read();
        let mut revisions: Vec<Content> =
            inner.tuple(page_id, language, content_type).cloned().collect();
        newest_first(&mut revisions);
        Ok(revisions)
    }

    async fn create(&self, input: NewContent) -> Result<Content> {
        let mut inner = self.inner.write();
        let content = Content {
            id: Uuid::now_v7(),
            page_id: input.page_id,
            language: input.language,
            content_type: input.content_type,
            body: input.body,
            created: inner.next_stamp(),
        };
        inner.contents.push(content.clone());
        Ok(content)
    }

    async fn update_body(&self, id: Uuid, body: &str) -> Result<Content> {
        let mut inner = self.inner.write();
        let Some(content) = inner.contents.iter_mut().find(|c| c.id == id) else {
            anyhow::bail!("content {id} does not exist");
        };
        content.body = body.to_string();
        Ok(content.clone())
    }

    async fn prune(
        &self,
        page_id: Uuid,
        language: &str,
        content_type: &str,
        keep: usize,
    ) -> Result<u64> {
        let mut inner = self.inner.write();
        let mut revisions: Vec<Content> =
            inner.tuple(page_id, language, content_type).cloned().collect();
        newest_first(&mut revisions);

        let doomed: Vec<Uuid> = revisions.iter().skip(keep).map(|c| c.id).collect();
        inner.contents.retain(|c| !doomed.contains(&c.id));
        Ok(doomed.len() as u64)
    }

    async fn slug_candidates(&self, slug: &str) -> Result<Vec<SlugCandidate>> {
        let inner = self.inner.read();
        let mut last_seen: HashMap<Uuid, DateTime<Utc>> = HashMap::new();
        for c in inner
            .contents
            .iter()
            .filter(|c| c.content_type == content_types::SLUG && c.body == slug)
        {
            let entry = last_seen.entry(c.page_id).or_insert(c.created);
            if c.created > *entry {
                *entry = c.created;
            }
        }

        let mut candidates: Vec<SlugCandidate> = last_seen
            .into_iter()
            .map(|(page_id, last_created)| SlugCandidate {
                page_id,
                last_created,
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.last_created
                .cmp(&a.last_created)
                .then(a.page_id.cmp(&b.page_id))
        });
        Ok(candidates)
    }

    async fn latest_by_body(
        &self,
        content_type: &str,
        body: &str,
        site_id: Option<i32>,
    ) -> Result<Option<Content>> {
        let inner = self.inner.read();
        let on_site = |page_id: Uuid| match site_id {
            None => true,
            Some(site) => inner
                .pages
                .iter()
                .any(|p| p.id == page_id && p.is_on_site(site)),
        };
        let latest = inner
            .contents
            .iter()
            .filter(|c| c.content_type == content_type && c.body == body)
            .filter(|c| on_site(c.page_id))
            .max_by_key(|c| c.recency())
            .cloned();
        Ok(latest)
    }
}

#[async_trait]
impl AliasRepository for MemoryStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<PageAlias>> {
        Ok(self
            .inner
            .read()
            .aliases
            .iter()
            .find(|a| a.url == url)
            .cloned())
    }

    async fn create(&self, page_id: Uuid, url: &str) -> Result<PageAlias> {
        let mut inner = self.inner.write();
        if inner.aliases.iter().any(|a| a.url == url) {
            anyhow::bail!("page alias '{url}' already exists");
        }
        let alias = PageAlias {
            id: Uuid::now_v7(),
            page_id,
            url: url.to_string(),
            created: inner.next_stamp(),
        };
        inner.aliases.push(alias.clone());
        Ok(alias)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.write();
        let before = inner.aliases.len();
        inner.aliases.retain(|a| a.id != id);
        Ok(inner.aliases.len() < before)
    }

    async fn list_for_page(&self, page_id: Uuid) -> Result<Vec<PageAlias>> {
        let inner = self.inner.read();
        let mut aliases: Vec<PageAlias> = inner
            .aliases
            .iter()
            .filter(|a| a.page_id == page_id)
            .cloned()
            .collect();
        aliases.sort_by_key(|a| std::cmp::Reverse((a.created, a.id)));
        Ok(aliases)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MemoryStore")
            .field("pages", &inner.pages.len())
            .field("contents", &inner.contents.len())
            .field("aliases", &inner.aliases.len())
            .finish()
    }
}
