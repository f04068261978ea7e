//! PostgreSQL storage backend.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use super::{AliasRepository, ContentRepository, PageRepository};
use crate::models::{
    Content, NewContent, NewPage, Page, PageAlias, PageQuery, ParentFilter, SlugCandidate,
};

const PAGE_COLUMNS: &str = "id, parent_id, status, publication_date, publication_end_date, \
                            freeze_date, sites, created, changed";

const CONTENT_COLUMNS: &str = "id, page_id, language, type, body, created";

/// Repositories over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Append the WHERE/ORDER/LIMIT clauses for a page query.
fn push_page_query(qb: &mut QueryBuilder<'_, Postgres>, query: &PageQuery) {
    qb.push(" WHERE TRUE");

    if let Some(ids) = &query.ids {
        qb.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(site_id) = query.site_id {
        qb.push(" AND ").push_bind(site_id).push(" = ANY(sites)");
    }
    match query.parent {
        ParentFilter::Any => {}
        ParentFilter::Root => {
            qb.push(" AND parent_id IS NULL");
        }
        ParentFilter::ChildOf(parent_id) => {
            qb.push(" AND parent_id = ").push_bind(parent_id);
        }
    }
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(status) = query.exclude_status {
        qb.push(" AND status <> ").push_bind(status);
    }
    if let Some(t) = query.published_by {
        qb.push(" AND publication_date <= ").push_bind(t);
    }
    if let Some(t) = query.published_from {
        qb.push(" AND publication_date >= ").push_bind(t);
    }
    if let Some(t) = query.not_ended_at {
        qb.push(" AND (publication_end_date IS NULL OR publication_end_date > ")
            .push_bind(t)
            .push(")");
    }
    if let Some(t) = query.ended_by {
        qb.push(" AND publication_end_date <= ").push_bind(t);
    }

    qb.push(" ORDER BY created ASC, id ASC");

    if let Some(limit) = query.limit {
        qb.push(" LIMIT ").push_bind(limit);
    }
}

#[async_trait]
impl PageRepository for PgStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Page>> {
        let page = sqlx::query_as::<_, Page>(&format!(
            "SELECT {PAGE_COLUMNS} FROM page WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch page by id")?;

        Ok(page)
    }

    async fn list(&self, query: &PageQuery) -> Result<Vec<Page>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PAGE_COLUMNS} FROM page"));
        push_page_query(&mut qb, query);

        let pages = qb
            .build_query_as::<Page>()
            .fetch_all(&self.pool)
            .await
            .context("failed to list pages")?;

        Ok(pages)
    }

    async fn create(&self, input: NewPage) -> Result<Page> {
        let id = Uuid::now_v7();
        let now = Utc::now();

        let page = sqlx::query_as::<_, Page>(&format!(
            r#"
            INSERT INTO page ({PAGE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, NULL, $6, $7, $7)
            RETURNING {PAGE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(input.parent_id)
        .bind(input.status)
        .bind(input.publication_date)
        .bind(input.publication_end_date)
        .bind(&input.sites)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .context("failed to create page")?;

        Ok(page)
    }

    async fn save(&self, page: &Page) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE page SET
                parent_id = $1,
                status = $2,
                publication_date = $3,
                publication_end_date = $4,
                freeze_date = $5,
                sites = $6,
                changed = $7
            WHERE id = $8
            "#,
        )
        .bind(page.parent_id)
        .bind(page.status)
        .bind(page.publication_date)
        .bind(page.publication_end_date)
        .bind(page.freeze_date)
        .bind(&page.sites)
        .bind(Utc::now())
        .bind(page.id)
        .execute(&self.pool)
        .await
        .context("failed to update page")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("page {} does not exist", page.id);
        }
        Ok(())
    }
}

#[async_trait]
impl ContentRepository for PgStore {
    async fn latest(
        &self,
        page_id: Uuid,
        language: &str,
        content_type: &str,
        created_until: Option<DateTime<Utc>>,
    ) -> Result<Option<Content>> {
        let content = sqlx::query_as::<_, Content>(&format!(
            r#"
            SELECT {CONTENT_COLUMNS}
            FROM content
            WHERE page_id = $1 AND language = $2 AND type = $3
              AND ($4::timestamptz IS NULL OR created <= $4)
            ORDER BY created DESC, id DESC
            LIMIT 1
            "#
        ))
        .bind(page_id)
        .bind(language)
        .bind(content_type)
        .bind(created_until)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch latest content")?;

        Ok(content)
    }

    async fn history(
        &self,
        page_id: Uuid,
        language: &str,
        content_type: &str,
    ) -> Result<Vec<Content>> {
        let revisions = sqlx::query_as::<_, Content>(&format!(
            r#"
            SELECT {CONTENT_COLUMNS}
            FROM content
            WHERE page_id = $1 AND language = $2 AND type = $3
            ORDER BY created DESC, id DESC
            "#
        ))
        .bind(page_id)
        .bind(language)
        .bind(content_type)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch content history")?;

        Ok(revisions)
    }

    async fn create(&self, input: NewContent) -> Result<Content> {
        let content = sqlx::query_as::<_, Content>(&format!(
            r#"
            INSERT INTO content ({CONTENT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CONTENT_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(input.page_id)
        .bind(&input.language)
        .bind(&input.content_type)
        .bind(&input.body)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("failed to create content")?;

        Ok(content)
    }

    async fn update_body(&self, id: Uuid, body: &str) -> Result<Content> {
        let content = sqlx::query_as::<_, Content>(&format!(
            "UPDATE content SET body = $1 WHERE id = $2 RETURNING {CONTENT_COLUMNS}"
        ))
        .bind(body)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .context("failed to update content body")?;

        Ok(content)
    }

    async fn prune(
        &self,
        page_id: Uuid,
        language: &str,
        content_type: &str,
        keep: usize,
    ) -> Result<u64> {
        let keep = i64::try_from(keep).context("revision depth out of range")?;

        let result = sqlx::query(
            r#"
            DELETE FROM content
            WHERE id IN (
                SELECT id FROM content
                WHERE page_id = $1 AND language = $2 AND type = $3
                ORDER BY created DESC, id DESC
                OFFSET $4
            )
            "#,
        )
        .bind(page_id)
        .bind(language)
        .bind(content_type)
        .bind(keep)
        .execute(&self.pool)
        .await
        .context("failed to prune content revisions")?;

        debug!(page_id = %page_id, deleted = result.rows_affected(), "pruned revisions");
        Ok(result.rows_affected())
    }

    async fn slug_candidates(&self, slug: &str) -> Result<Vec<SlugCandidate>> {
        let candidates = sqlx::query_as::<_, SlugCandidate>(
            r#"
            SELECT page_id, MAX(created) AS last_created
            FROM content
            WHERE type = 'slug' AND body = $1
            GROUP BY page_id
            ORDER BY last_created DESC, page_id ASC
            "#,
        )
        .bind(slug)
        .fetch_all(&self.pool)
        .await
        .context("failed to fetch slug candidates")?;

        Ok(candidates)
    }

    async fn latest_by_body(
        &self,
        content_type: &str,
        body: &str,
        site_id: Option<i32>,
    ) -> Result<Option<Content>> {
        let content = sqlx::query_as::<_, Content>(
            r#"
            SELECT c.id, c.page_id, c.language, c.type, c.body, c.created
            FROM content c
            JOIN page p ON p.id = c.page_id
            WHERE c.type = $1 AND c.body = $2
              AND ($3::int4 IS NULL OR $3 = ANY(p.sites))
            ORDER BY c.created DESC, c.id DESC
            LIMIT 1
            "#,
        )
        .bind(content_type)
        .bind(body)
        .bind(site_id)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch content by body")?;

        Ok(content)
    }
}

#[async_trait]
impl AliasRepository for PgStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<PageAlias>> {
        let alias = sqlx::query_as::<_, PageAlias>(
            "SELECT id, page_id, url, created FROM page_alias WHERE url = $1",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .context("failed to fetch page alias by url")?;

        Ok(alias)
    }

    async fn create(&self, page_id: Uuid, url: &str) -> Result<PageAlias> {
        let alias = sqlx::query_as::<_, PageAlias>(
            r#"
            INSERT INTO page_alias (id, page_id, url, created)
            VALUES ($1, $2, $3, $4)
            RETURNING id, page_id, url, created
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(page_id)
        .bind(url)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .context("failed to create page alias")?;

        Ok(alias)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM page_alias WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("failed to delete page alias")?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_for_page(&self, page_id: Uuid) -> Result<Vec<PageAlias>> {
        let aliases = sqlx::query_as::<_, PageAlias>(
            r#"
            SELECT id, page_id, url, created
            FROM page_alias
            WHERE page_id = $1
            ORDER BY created DESC, id DESC
            "#,
        )
        .bind(page_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to list page aliases")?;

        Ok(aliases)
    }
}
