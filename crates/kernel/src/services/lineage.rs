//! Ancestor walk over the page tree.

use std::collections::HashSet;

use anyhow::{Context, Result};

use crate::models::Page;
use crate::storage::PageRepository;

/// The chain from the root down to `page`, inclusive.
///
/// Parents are looked up by id. A dangling parent id or a cycle in the
/// parent chain is a storage inconsistency and is reported as an error.
pub async fn lineage(pages: &dyn PageRepository, page: &Page) -> Result<Vec<Page>> {
    let mut chain = vec![page.clone()];
    let mut seen = HashSet::from([page.id]);
    let mut next = page.parent_id;

    while let Some(parent_id) = next {
        if !seen.insert(parent_id) {
            anyhow::bail!("page {} has a cycle in its parent chain", page.id);
        }
        let parent = pages
            .find_by_id(parent_id)
            .await?
            .with_context(|| format!("parent page {parent_id} of page {} not found", page.id))?;
        next = parent.parent_id;
        chain.push(parent);
    }

    chain.reverse();
    Ok(chain)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{NewPage, PageStatus};
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn lineage_is_root_first() {
        let store = MemoryStore::new();
        let root = store
            .create(NewPage {
                status: PageStatus::Published,
                ..NewPage::default()
            })
            .await
            .unwrap();
        let child = store
            .create(NewPage {
                parent_id: Some(root.id),
                ..NewPage::default()
            })
            .await
            .unwrap();
        let grandchild = store
            .create(NewPage {
                parent_id: Some(child.id),
                ..NewPage::default()
            })
            .await
            .unwrap();

        let ids: Vec<_> = lineage(&store, &grandchild)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![root.id, child.id, grandchild.id]);
    }

    #[tokio::test]
    async fn lineage_detects_cycles() {
        let store = MemoryStore::new();
        let mut a = store.create(NewPage::default()).await.unwrap();
        let b = store
            .create(NewPage {
                parent_id: Some(a.id),
                ..NewPage::default()
            })
            .await
            .unwrap();
        a.parent_id = Some(b.id);
        store.save(&a).await.unwrap();

        let err = lineage(&store, &b).await.unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }
}
