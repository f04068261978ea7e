//! Page model.
//!
//! Pages form a tree through an optional parent id. A child only refers to
//! its parent; it never owns it. Content is stored separately and keyed by
//! page id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PageConfig;

/// Publication status of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Draft = 0,
    Published = 1,
    /// Never stored; derived by [`Page::calculated_status`].
    Expired = 2,
    Hidden = 3,
}

/// Page record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Page {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Parent page, `None` for root pages.
    pub parent_id: Option<Uuid>,

    /// Stored publication status.
    pub status: PageStatus,

    /// Start of the publication window.
    pub publication_date: Option<DateTime<Utc>>,

    /// End of the publication window.
    pub publication_end_date: Option<DateTime<Utc>>,

    /// When set, content is served as it was at this instant.
    pub freeze_date: Option<DateTime<Utc>>,

    /// Sites this page belongs to.
    pub sites: Vec<i32>,

    /// When the page was created.
    pub created: DateTime<Utc>,

    /// When the page record was last saved.
    pub changed: DateTime<Utc>,
}

/// Input for creating a page.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPage {
    pub parent_id: Option<Uuid>,
    pub status: PageStatus,
    pub publication_date: Option<DateTime<Utc>>,
    pub publication_end_date: Option<DateTime<Utc>>,
    pub sites: Vec<i32>,
}

impl Default for NewPage {
    fn default() -> Self {
        Self {
            parent_id: None,
            status: PageStatus::Draft,
            publication_date: None,
            publication_end_date: None,
            sites: vec![1],
        }
    }
}

impl Page {
    /// Check if this page has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check if this page's content view is pinned to a point in time.
    pub fn is_frozen(&self) -> bool {
        self.freeze_date.is_some()
    }

    /// Check if this page belongs to the given site.
    pub fn is_on_site(&self, site_id: i32) -> bool {
        self.sites.contains(&site_id)
    }

    /// Status as seen by visitors at `now`.
    ///
    /// A page whose publication date is still ahead reads as a draft, and one
    /// whose end date has passed reads as expired, when the matching setting
    /// is enabled.
    pub fn calculated_status(&self, now: DateTime<Utc>, config: &PageConfig) -> PageStatus {
        if config.show_start_date
            && let Some(start) = self.publication_date
            && start > now
        {
            return PageStatus::Draft;
        }
        if config.show_end_date
            && let Some(end) = self.publication_end_date
            && end < now
        {
            return PageStatus::Expired;
        }
        self.status
    }
}

/// Parent constraint for [`PageQuery`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentFilter {
    #[default]
    Any,
    /// Only pages without a parent.
    Root,
    /// Only direct children of the given page.
    ChildOf(Uuid),
}

/// Filter over pages, understood by every page repository.
///
/// Results are ordered by creation time, then id, ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageQuery {
    pub ids: Option<Vec<Uuid>>,
    pub site_id: Option<i32>,
    pub parent: ParentFilter,
    pub status: Option<PageStatus>,
    pub exclude_status: Option<PageStatus>,
    /// `publication_date <= t` (pages without a date never match).
    pub published_by: Option<DateTime<Utc>>,
    /// `publication_date >= t` (pages without a date never match).
    pub published_from: Option<DateTime<Utc>>,
    /// `publication_end_date > t` or no end date.
    pub not_ended_at: Option<DateTime<Utc>>,
    /// `publication_end_date <= t`.
    pub ended_by: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl PageQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(mut self, ids: Vec<Uuid>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn on_site(mut self, site_id: Option<i32>) -> Self {
        self.site_id = site_id;
        self
    }

    pub fn roots(mut self) -> Self {
        self.parent = ParentFilter::Root;
        self
    }

    pub fn children_of(mut self, parent_id: Uuid) -> Self {
        self.parent = ParentFilter::ChildOf(parent_id);
        self
    }

    pub fn status(mut self, status: PageStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn excluding(mut self, status: PageStatus) -> Self {
        self.exclude_status = Some(status);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Evaluate the filter against a single page.
    ///
    /// Storage backends that cannot push the filter down use this directly.
    pub fn matches(&self, page: &Page) -> bool {
        if let Some(ids) = &self.ids
            && !ids.contains(&page.id)
        {
            return false;
        }
        if let Some(site_id) = self.site_id
            && !page.is_on_site(site_id)
        {
            return false;
        }
        match self.parent {
            ParentFilter::Any => {}
            ParentFilter::Root if page.parent_id.is_some() => return false,
            ParentFilter::ChildOf(parent) if page.parent_id != Some(parent) => return false,
            _ => {}
        }
        if self.status.is_some_and(|s| s != page.status) {
            return false;
        }
        if self.exclude_status.is_some_and(|s| s == page.status) {
            return false;
        }
        if let Some(t) = self.published_by
            && !page.publication_date.is_some_and(|d| d <= t)
        {
            return false;
        }
        if let Some(t) = self.published_from
            && !page.publication_date.is_some_and(|d| d >= t)
        {
            return false;
        }
        if let Some(t) = self.not_ended_at
            && page.publication_end_date.is_some_and(|d| d <= t)
        {
            return false;
        }
        if let Some(t) = self.ended_by
            && !page.publication_end_date.is_some_and(|d| d <= t)
        {
            return false;
        }
        true
    }
}
