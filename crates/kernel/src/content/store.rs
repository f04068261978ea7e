//! Versioned content store with a read-through cache.
//!
//! Content is keyed by (page, language, content type). Each key has a
//! revision history ordered by creation time; readers see the latest
//! revision, or the latest one at the page's freeze date.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::ContentCache;
use crate::config::PageConfig;
use crate::content::filter::{AmmoniaSanitizer, LinkFilter, NoopLinkFilter, Sanitizer};
use crate::models::{Content, NewContent, Page};
use crate::storage::ContentRepository;

/// Latest body per language for one (page, content type, frozen) key.
pub type ContentDict = HashMap<String, String>;

/// Cache key for a page's content dictionary.
pub fn content_dict_key(page_id: Uuid, content_type: &str, frozen: bool) -> String {
    format!("page_content:{page_id}_{content_type}_{}", u8::from(frozen))
}

/// Request-scoped memo of content dictionaries.
///
/// Created at the start of one resolution or render and dropped at the end.
/// It saves repeated trips to the shared cache while the same page is read
/// several times (title, slug, body, ancestors' slugs).
#[derive(Debug, Default)]
pub struct ContentMemo {
    entries: HashMap<String, ContentDict>,
}

impl ContentMemo {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &str) -> Option<&ContentDict> {
        self.entries.get(key).filter(|dict| !dict.is_empty())
    }

    fn insert(&mut self, key: String, dict: ContentDict) {
        self.entries.insert(key, dict);
    }

    /// Number of memoized dictionaries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Content store service.
pub struct ContentStore {
    contents: Arc<dyn ContentRepository>,
    cache: Arc<dyn ContentCache>,
    sanitizer: Arc<dyn Sanitizer>,
    link_filter: Arc<dyn LinkFilter>,
    config: Arc<PageConfig>,
}

impl ContentStore {
    /// Create a store with the ammonia sanitizer and no link rewriting.
    pub fn new(
        contents: Arc<dyn ContentRepository>,
        cache: Arc<dyn ContentCache>,
        config: Arc<PageConfig>,
    ) -> Self {
        Self {
            contents,
            cache,
            sanitizer: Arc::new(AmmoniaSanitizer),
            link_filter: Arc::new(NoopLinkFilter),
            config,
        }
    }

    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn Sanitizer>) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn with_link_filter(mut self, link_filter: Arc<dyn LinkFilter>) -> Self {
        self.link_filter = link_filter;
        self
    }

    fn prepare_body(&self, body: &str) -> String {
        if self.config.sanitize_user_input {
            self.sanitizer.sanitize(body)
        } else {
            body.to_string()
        }
    }

    /// Set the body for a tuple, overwriting the latest revision in place.
    ///
    /// Creates the first revision when the tuple has none. Never adds a
    /// revision to an existing history.
    pub async fn set_or_replace(
        &self,
        page: &Page,
        language: &str,
        content_type: &str,
        body: &str,
    ) -> Result<Content> {
        let body = self.prepare_body(body);

        match self.contents.latest(page.id, language, content_type, None).await? {
            Some(existing) => {
                debug!(
                    page_id = %page.id,
                    language = %language,
                    content_type = %content_type,
                    content_id = %existing.id,
                    "overwriting latest revision"
                );
                self.contents.update_body(existing.id, &body).await
            }
            None => {
                self.contents
                    .create(NewContent {
                        page_id: page.id,
                        language: language.to_string(),
                        content_type: content_type.to_string(),
                        body,
                    })
                    .await
            }
        }
    }

    /// Add a revision unless the body equals the latest one.
    ///
    /// When a revision depth is configured, older revisions beyond it are
    /// deleted after the insert.
    ///
    /// The check and the insert are separate storage calls. Two identical
    /// submissions racing each other can both insert a revision; no lock is
    /// taken to prevent that.
    pub async fn create_if_changed(
        &self,
        page: &Page,
        language: &str,
        content_type: &str,
        body: &str,
    ) -> Result<Content> {
        let body = self.prepare_body(body);

        if let Some(latest) = self.contents.latest(page.id, language, content_type, None).await?
            && latest.body == body
        {
            debug!(page_id = %page.id, content_type = %content_type, "content unchanged");
            return Ok(latest);
        }

        let content = self
            .contents
            .create(NewContent {
                page_id: page.id,
                language: language.to_string(),
                content_type: content_type.to_string(),
                body,
            })
            .await?;

        debug!(
            page_id = %page.id,
            language = %language,
            content_type = %content_type,
            content_id = %content.id,
            "revision created"
        );

        let depth = self.config.content_revision_depth;
        if depth > 0 {
            let purged = self
                .contents
                .prune(page.id, language, content_type, depth)
                .await
                .context("failed to prune old revisions")?;
            if purged > 0 {
                debug!(page_id = %page.id, purged, depth, "old revisions purged");
            }
        }

        Ok(content)
    }

    /// Latest revision for a tuple, as of the freeze date for frozen pages.
    pub async fn get_latest(
        &self,
        page: &Page,
        language: &str,
        content_type: &str,
    ) -> Result<Option<Content>> {
        self.contents
            .latest(page.id, language, content_type, page.freeze_date)
            .await
    }

    /// Full revision history for a tuple, newest first.
    pub async fn history(
        &self,
        page: &Page,
        language: &str,
        content_type: &str,
    ) -> Result<Vec<Content>> {
        self.contents.history(page.id, language, content_type).await
    }

    /// Body to serve for a page.
    ///
    /// Returns the requested language's latest body when non-empty. With
    /// `allow_fallback`, an empty body is replaced by the first non-empty one
    /// in configured language order. Returns `""` when nothing is found. The
    /// result passes through the link filter for the language actually
    /// served.
    pub async fn get_body(
        &self,
        page: &Page,
        language: &str,
        content_type: &str,
        allow_fallback: bool,
        memo: &mut ContentMemo,
    ) -> Result<String> {
        let language = self.config.resolve_language(language);
        let dict = self.content_dict(page, content_type, memo).await?;

        if let Some(body) = dict.get(language).filter(|b| !b.is_empty()) {
            return self
                .link_filter
                .filter(body.clone(), page, language, content_type)
                .await;
        }

        if allow_fallback {
            for lang in &self.config.languages {
                if let Some(body) = dict.get(lang).filter(|b| !b.is_empty()) {
                    debug!(
                        page_id = %page.id,
                        requested = %language,
                        served = %lang,
                        content_type = %content_type,
                        "language fallback"
                    );
                    return self
                        .link_filter
                        .filter(body.clone(), page, lang, content_type)
                        .await;
                }
            }
        }

        Ok(String::new())
    }

    /// Drop the shared cache entries for a page's content types.
    ///
    /// Writes do not call this; whoever edits pages decides when readers
    /// should see new content.
    pub async fn invalidate(&self, page_id: Uuid, content_types: &[&str]) {
        for content_type in content_types {
            for frozen in [false, true] {
                self.cache
                    .invalidate(&content_dict_key(page_id, content_type, frozen))
                    .await;
            }
        }
    }

    /// Memo, then shared cache, then storage. A storage rebuild is written
    /// back to both.
    async fn content_dict(
        &self,
        page: &Page,
        content_type: &str,
        memo: &mut ContentMemo,
    ) -> Result<ContentDict> {
        let key = content_dict_key(page.id, content_type, page.is_frozen());

        if let Some(dict) = memo.get(&key) {
            return Ok(dict.clone());
        }

        if let Some(raw) = self.cache.get(&key).await {
            match serde_json::from_str::<ContentDict>(&raw) {
                Ok(dict) if !dict.is_empty() => {
                    memo.insert(key, dict.clone());
                    return Ok(dict);
                }
                Ok(_) => {}
                Err(e) => warn!(key = %key, error = %e, "discarding undecodable cache entry"),
            }
        }

        // One query per configured language; the result is cached.
        let mut dict = ContentDict::with_capacity(self.config.languages.len());
        for lang in &self.config.languages {
            let body = self
                .get_latest(page, lang, content_type)
                .await?
                .map(|c| c.body)
                .unwrap_or_default();
            dict.insert(lang.clone(), body);
        }
        debug!(key = %key, languages = dict.len(), "content dictionary rebuilt");

        let raw = serde_json::to_string(&dict).context("failed to encode content dictionary")?;
        self.cache.set(&key, &raw).await;
        memo.insert(key, dict.clone());

        Ok(dict)
    }
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::cache::CacheLayer;
    use crate::models::{NewPage, PageStatus, content_types};
    use crate::storage::{MemoryStore, PageRepository};

    struct Fixture {
        store: Arc<MemoryStore>,
        cache: CacheLayer,
        contents: ContentStore,
        page: Page,
    }

    async fn fixture(config: PageConfig) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let cache = CacheLayer::local_only();
        let contents = ContentStore::new(store.clone(), Arc::new(cache.clone()), Arc::new(config));
        let page = PageRepository::create(
            store.as_ref(),
            NewPage {
                status: PageStatus::Published,
                ..NewPage::default()
            },
        )
        .await
        .unwrap();
        Fixture {
            store,
            cache,
            contents,
            page,
        }
    }

    #[test]
    fn cache_key_format() {
        let id = Uuid::nil();
        assert_eq!(
            content_dict_key(id, "title", false),
            "page_content:00000000-0000-0000-0000-000000000000_title_0"
        );
        assert!(content_dict_key(id, "title", true).ends_with("_title_1"));
    }

    #[tokio::test]
    async fn set_or_replace_overwrites_without_new_revision() {
        let f = fixture(PageConfig::default()).await;

        let first = f.contents.set_or_replace(&f.page, "en", "body", "one").await.unwrap();
        let second = f.contents.set_or_replace(&f.page, "en", "body", "two").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.body, "two");
        assert_eq!(f.store.content_count(), 1);
    }

    #[tokio::test]
    async fn sanitizes_when_configured() {
        let config = PageConfig {
            sanitize_user_input: true,
            ..PageConfig::default()
        };
        let f = fixture(config).await;

        let c = f
            .contents
            .create_if_changed(&f.page, "en", "body", "<b>ok</b><script>x()</script>")
            .await
            .unwrap();
        assert_eq!(c.body, "<b>ok</b>");
    }

    #[tokio::test]
    async fn body_is_served_from_memo_then_cache() {
        let f = fixture(PageConfig::default()).await;
        f.contents
            .create_if_changed(&f.page, "en", content_types::TITLE, "Hello")
            .await
            .unwrap();

        let mut memo = ContentMemo::new();
        let body = f
            .contents
            .get_body(&f.page, "en", content_types::TITLE, false, &mut memo)
            .await
            .unwrap();
        assert_eq!(body, "Hello");
        assert_eq!(memo.len(), 1);

        // A later revision is invisible until the cache entry is dropped.
        f.contents
            .create_if_changed(&f.page, "en", content_types::TITLE, "Hello again")
            .await
            .unwrap();
        let mut fresh = ContentMemo::new();
        let cached = f
            .contents
            .get_body(&f.page, "en", content_types::TITLE, false, &mut fresh)
            .await
            .unwrap();
        assert_eq!(cached, "Hello");

        f.contents.invalidate(f.page.id, &[content_types::TITLE]).await;
        let mut fresh = ContentMemo::new();
        let rebuilt = f
            .contents
            .get_body(&f.page, "en", content_types::TITLE, false, &mut fresh)
            .await
            .unwrap();
        assert_eq!(rebuilt, "Hello again");
    }

    #[tokio::test]
    async fn undecodable_cache_entry_is_rebuilt() {
        let f = fixture(PageConfig::default()).await;
        f.contents
            .set_or_replace(&f.page, "en", content_types::BODY, "text")
            .await
            .unwrap();
        let key = content_dict_key(f.page.id, content_types::BODY, false);
        f.cache.set(&key, "not json").await;

        let mut memo = ContentMemo::new();
        let body = f
            .contents
            .get_body(&f.page, "en", content_types::BODY, false, &mut memo)
            .await
            .unwrap();
        assert_eq!(body, "text");
    }

    #[tokio::test]
    async fn empty_language_means_default() {
        let f = fixture(PageConfig::default().with_languages(&["en", "fr"])).await;
        f.contents
            .set_or_replace(&f.page, "en", content_types::TITLE, "Home")
            .await
            .unwrap();

        let mut memo = ContentMemo::new();
        let body = f
            .contents
            .get_body(&f.page, "", content_types::TITLE, false, &mut memo)
            .await
            .unwrap();
        assert_eq!(body, "Home");
    }
}
