//! Data models.

pub mod content;
pub mod page;
pub mod page_alias;

pub use content::{Content, NewContent, SlugCandidate, content_types};
pub use page::{NewPage, Page, PageQuery, PageStatus, ParentFilter};
pub use page_alias::PageAlias;
