//! Content module.
//!
//! This module provides:
//! - ContentStore: versioned per-language content with a read-through cache
//! - Sanitizer / LinkFilter: body processing on write and on read

pub mod filter;
mod store;

pub use filter::{AmmoniaSanitizer, LinkFilter, NoopLinkFilter, PageLinkFilter, Sanitizer};
pub use store::{ContentDict, ContentMemo, ContentStore, content_dict_key};
