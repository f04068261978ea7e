//! Content model.
//!
//! A content record is one revision of a page's body for a language and a
//! content type ("title", "slug", "body", ...). Records are never edited in
//! place except through an explicit overwrite; the history of a
//! (page, language, type) tuple is its records ordered by creation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known content types.
pub mod content_types {
    /// Page title.
    pub const TITLE: &str = "title";

    /// Path segment identifying the page within its branch.
    pub const SLUG: &str = "slug";

    /// Main page body.
    pub const BODY: &str = "body";
}

/// Content record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Content {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Page this content belongs to.
    pub page_id: Uuid,

    /// Language code (e.g., "en").
    pub language: String,

    /// Content type tag.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub content_type: String,

    /// Stored body.
    pub body: String,

    /// When this revision was created.
    pub created: DateTime<Utc>,
}

/// Input for creating a content revision.
#[derive(Debug, Clone, Deserialize)]
pub struct NewContent {
    pub page_id: Uuid,
    pub language: String,
    pub content_type: String,
    pub body: String,
}

/// A page carrying a slug, with the last time that slug was assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SlugCandidate {
    pub page_id: Uuid,
    pub last_created: DateTime<Utc>,
}

impl Content {
    /// Sort key for "latest first" ordering. Ties on the timestamp fall back
    /// to the time-ordered id so the order is always total.
    pub fn recency(&self) -> (DateTime<Utc>, Uuid) {
        (self.created, self.id)
    }
}
