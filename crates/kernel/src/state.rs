//! Application state shared across all handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use redis::Client as RedisClient;
use sqlx::PgPool;
use tracing::info;

use crate::cache::CacheLayer;
use crate::config::{Config, PageConfig};
use crate::content::{ContentStore, PageLinkFilter};
use crate::db;
use crate::services::{AliasResolver, PageService, PathResolver, SlugIndex};
use crate::storage::Repositories;

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// PostgreSQL connection pool, absent when running on the memory backend.
    db: Option<PgPool>,

    /// Two-tier cache layer (Moka L1 + optional Redis L2).
    cache: CacheLayer,

    /// Page settings, frozen at startup.
    config: Arc<PageConfig>,

    pages: PageService,

    contents: Arc<ContentStore>,

    paths: PathResolver,

    aliases: AliasResolver,
}

impl AppState {
    /// Create application state backed by PostgreSQL (and Redis when
    /// configured).
    pub async fn new(config: &Config) -> Result<Self> {
        // Create PostgreSQL pool
        let db = db::create_pool(config)
            .await
            .context("failed to create database pool")?;

        // Run migrations
        db::run_migrations(&db)
            .await
            .context("failed to run migrations")?;

        let redis = match &config.redis_url {
            Some(url) => Some(connect_redis(url).await?),
            None => {
                info!("REDIS_URL not set, using in-process cache only");
                None
            }
        };

        let cache = CacheLayer::new(redis);
        let repos = Repositories::postgres(db.clone());

        Ok(Self::build(Some(db), repos, cache, config.pages.clone()))
    }

    /// Create application state over arbitrary repositories.
    ///
    /// Used by tests and embedders with the in-memory backend.
    pub fn with_repositories(repos: Repositories, cache: CacheLayer, config: PageConfig) -> Self {
        Self::build(None, repos, cache, config)
    }

    fn build(
        db: Option<PgPool>,
        repos: Repositories,
        cache: CacheLayer,
        config: PageConfig,
    ) -> Self {
        let config = Arc::new(config);

        let mut contents = ContentStore::new(
            repos.contents.clone(),
            Arc::new(cache.clone()),
            config.clone(),
        );
        if config.link_filter {
            contents = contents.with_link_filter(Arc::new(PageLinkFilter::new(
                repos.pages.clone(),
                repos.contents.clone(),
                config.clone(),
            )));
        }
        let contents = Arc::new(contents);

        let pages = PageService::new(repos.pages.clone(), config.clone());
        let slugs = SlugIndex::new(repos.contents.clone(), config.clone());
        let paths = PathResolver::new(pages.clone(), slugs, contents.clone(), config.clone());
        let aliases = AliasResolver::new(repos.aliases);

        info!(
            languages = ?config.languages,
            strict_url = config.use_strict_url,
            site_scope = ?config.site_scope(),
            "page services ready"
        );

        Self {
            inner: Arc::new(AppStateInner {
                db,
                cache,
                config,
                pages,
                contents,
                paths,
                aliases,
            }),
        }
    }

    /// Get the page settings.
    pub fn config(&self) -> &PageConfig {
        &self.inner.config
    }

    /// Get the cache layer.
    pub fn cache(&self) -> &CacheLayer {
        &self.inner.cache
    }

    /// Get the page service.
    pub fn pages(&self) -> &PageService {
        &self.inner.pages
    }

    /// Get the content store.
    pub fn contents(&self) -> &ContentStore {
        &self.inner.contents
    }

    /// Get the path resolver.
    pub fn paths(&self) -> &PathResolver {
        &self.inner.paths
    }

    /// Get the alias resolver.
    pub fn aliases(&self) -> &AliasResolver {
        &self.inner.aliases
    }

    /// Check if PostgreSQL is healthy. Always true on the memory backend.
    pub async fn postgres_healthy(&self) -> bool {
        match &self.inner.db {
            Some(db) => db::check_health(db).await,
            None => true,
        }
    }

    /// Check if Redis is healthy. Always true without Redis.
    pub async fn redis_healthy(&self) -> bool {
        self.inner.cache.healthy().await
    }
}

async fn connect_redis(url: &str) -> Result<RedisClient> {
    let redis = RedisClient::open(url).context("failed to create Redis client")?;

    // Test Redis connection
    let mut conn = redis
        .get_multiplexed_async_connection()
        .await
        .context("failed to connect to Redis")?;

    redis::cmd("PING")
        .query_async::<String>(&mut conn)
        .await
        .context("Redis PING failed")?;

    Ok(redis)
}
