//! Page alias model.
//!
//! Maps a legacy or alternate URL (e.g., `/old-about` or
//! `/index.php?page=about`) to a page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Page alias record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PageAlias {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Target page.
    pub page_id: Uuid,

    /// Normalized URL, optionally followed by `?` and a query string.
    /// Unique across all aliases.
    pub url: String,

    /// When the alias was created.
    pub created: DateTime<Utc>,
}
