//! Page services.
//!
//! Services sit on top of the repository traits and hold the resolution
//! logic: page listings, the slug index, path and alias resolution.

pub mod alias_resolver;
pub mod lineage;
pub mod page;
pub mod path_resolver;
pub mod slug_index;

pub use alias_resolver::AliasResolver;
pub use page::PageService;
pub use path_resolver::PathResolver;
pub use slug_index::SlugIndex;
