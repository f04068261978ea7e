//! Body filters applied on the way into and out of the content store.
//!
//! - [`Sanitizer`]: strips unsafe markup from user input before storing it.
//! - [`LinkFilter`]: rewrites internal page links when a body is served.

use std::ops::Range;
use std::sync::{Arc, LazyLock};

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use crate::config::PageConfig;
use crate::models::{Page, content_types};
use crate::services::lineage::lineage;
use crate::storage::{ContentRepository, PageRepository};

/// Markup sanitizer.
pub trait Sanitizer: Send + Sync {
    /// Return a copy of `input` with disallowed elements removed.
    fn sanitize(&self, input: &str) -> String;
}

/// Sanitizer backed by ammonia's default allowlist.
///
/// Strips `<script>`, event handlers and other XSS vectors while keeping
/// safe formatting tags.
#[derive(Debug, Default, Clone, Copy)]
pub struct AmmoniaSanitizer;

impl Sanitizer for AmmoniaSanitizer {
    fn sanitize(&self, input: &str) -> String {
        ammonia::clean(input)
    }
}

/// Post-processing step for bodies leaving the content store.
#[async_trait]
pub trait LinkFilter: Send + Sync {
    /// Rewrite `body`, served for `page` in `language` as `content_type`.
    async fn filter(
        &self,
        body: String,
        page: &Page,
        language: &str,
        content_type: &str,
    ) -> Result<String>;
}

/// Link filter that returns bodies untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLinkFilter;

#[async_trait]
impl LinkFilter for NoopLinkFilter {
    async fn filter(
        &self,
        body: String,
        _page: &Page,
        _language: &str,
        _content_type: &str,
    ) -> Result<String> {
        Ok(body)
    }
}

#[allow(clippy::expect_used)]
static ANCHOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b[^>]*>").expect("valid regex literal"));

#[allow(clippy::expect_used)]
static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\sclass\s*=\s*["']([^"']*)["']"#).expect("valid regex literal")
});

#[allow(clippy::expect_used)]
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(\s)href\s*=\s*["'][^"']*["']"#).expect("valid regex literal")
});

/// Rewrites anchors tagged `class="page_<uuid>"` so their `href` points at
/// the target page's current URL.
///
/// Editors link pages by id; the URL is recomputed on every render so links
/// survive slug changes and moves. Titles and slugs are never filtered.
pub struct PageLinkFilter {
    pages: Arc<dyn PageRepository>,
    contents: Arc<dyn ContentRepository>,
    config: Arc<PageConfig>,
}

impl PageLinkFilter {
    pub fn new(
        pages: Arc<dyn PageRepository>,
        contents: Arc<dyn ContentRepository>,
        config: Arc<PageConfig>,
    ) -> Self {
        Self {
            pages,
            contents,
            config,
        }
    }

    /// URL path of a page in `language`, or `None` if the page is gone.
    async fn url_for(&self, target: Uuid, language: &str) -> Result<Option<String>> {
        let Some(page) = self.pages.find_by_id(target).await? else {
            return Ok(None);
        };

        let mut segments = Vec::new();
        for node in lineage(self.pages.as_ref(), &page).await? {
            segments.push(self.slug_for(&node, language).await?);
        }
        Ok(Some(format!("/{}", segments.join("/"))))
    }

    /// Latest slug in `language`, falling back through the configured
    /// languages.
    async fn slug_for(&self, page: &Page, language: &str) -> Result<String> {
        let languages = std::iter::once(language)
            .chain(self.config.languages.iter().map(String::as_str));
        for lang in languages {
            if let Some(content) = self
                .contents
                .latest(page.id, lang, content_types::SLUG, page.freeze_date)
                .await?
                && !content.body.is_empty()
            {
                return Ok(content.body);
            }
        }
        Ok(String::new())
    }
}

#[async_trait]
impl LinkFilter for PageLinkFilter {
    async fn filter(
        &self,
        body: String,
        page: &Page,
        language: &str,
        content_type: &str,
    ) -> Result<String> {
        if content_type == content_types::TITLE || content_type == content_types::SLUG {
            return Ok(body);
        }

        let links: Vec<(Range<usize>, Uuid)> = ANCHOR_RE
            .find_iter(&body)
            .filter_map(|m| link_target(m.as_str()).map(|id| (m.range(), id)))
            .collect();
        if links.is_empty() {
            return Ok(body);
        }

        let mut out = String::with_capacity(body.len());
        let mut cursor = 0;
        for (range, target) in links {
            out.push_str(&body[cursor..range.start]);
            let tag = &body[range.clone()];
            match self.url_for(target, language).await? {
                Some(url) => out.push_str(&set_href(tag, &url)),
                None => {
                    debug!(page_id = %page.id, target = %target, "link to missing page left as is");
                    out.push_str(tag);
                }
            }
            cursor = range.end;
        }
        out.push_str(&body[cursor..]);
        Ok(out)
    }
}

/// Page id from a `page_<uuid>` class on an opening anchor tag.
fn link_target(tag: &str) -> Option<Uuid> {
    let classes = CLASS_RE.captures(tag)?.get(1)?.as_str();
    classes
        .split_whitespace()
        .filter_map(|class| class.strip_prefix("page_"))
        .find_map(|id| Uuid::parse_str(id).ok())
}

/// Replace or add the `href` attribute of an opening anchor tag.
fn set_href(tag: &str, url: &str) -> String {
    let attr = format!("href=\"{url}\"");
    if HREF_RE.is_match(tag) {
        HREF_RE
            .replace(tag, |caps: &regex::Captures<'_>| format!("{}{attr}", &caps[1]))
            .into_owned()
    } else {
        // Opening tags always start with the two ASCII bytes "<a".
        format!("<a {attr}{}", &tag[2..])
    }
}

impl std::fmt::Debug for PageLinkFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageLinkFilter").finish()
    }
}
