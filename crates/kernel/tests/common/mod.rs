#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! [`TestApp`] runs the real kernel services and routes over the in-memory
//! backend, so these tests need neither PostgreSQL nor Redis.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use tower::ServiceExt;

use sentiero_kernel::cache::CacheLayer;
use sentiero_kernel::content::ContentMemo;
use sentiero_kernel::models::{NewPage, Page, PageStatus};
use sentiero_kernel::storage::{MemoryStore, Repositories};
use sentiero_kernel::{AppState, PageConfig};
use sentiero_test_utils::{TestPage, status};

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub store: Arc<MemoryStore>,
    pub cache: CacheLayer,
    pub state: AppState,
}

impl TestApp {
    /// Create a test application with default page settings.
    pub fn new() -> Self {
        Self::with_config(PageConfig::default())
    }

    /// Create a test application with custom page settings.
    pub fn with_config(config: PageConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = CacheLayer::local_only();
        let state =
            AppState::with_repositories(Repositories::memory(store.clone()), cache.clone(), config);
        let router = sentiero_kernel::routes::router(state.clone());

        Self {
            router,
            store,
            cache,
            state,
        }
    }

    /// Persist a fixture page, optionally under a parent.
    pub async fn create_page(&self, fixture: &TestPage, parent: Option<&Page>) -> Page {
        let page = self
            .state
            .pages()
            .create(NewPage {
                parent_id: parent.map(|p| p.id),
                status: page_status(fixture.status),
                publication_date: fixture.publication_date,
                publication_end_date: fixture.publication_end_date,
                sites: fixture.sites.clone(),
            })
            .await
            .expect("Failed to create page");

        for content in &fixture.contents {
            self.state
                .contents()
                .create_if_changed(&page, &content.language, &content.content_type, &content.body)
                .await
                .expect("Failed to create content");
        }

        page
    }

    /// Resolve a path the way the page route does, with drafts excluded.
    pub async fn resolve(&self, path: &str, language: &str) -> Option<Page> {
        let mut memo = ContentMemo::new();
        self.state
            .paths()
            .resolve(path, language, true, &mut memo)
            .await
            .expect("Failed to resolve path")
    }

    /// Make a GET request and return the raw response.
    pub async fn get(&self, uri: &str) -> Response {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Make a GET request and parse the response body as JSON.
    pub async fn get_json(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = self.get(uri).await;
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }
}

/// `Location` header of a response, if any.
pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn page_status(code: i16) -> PageStatus {
    match code {
        status::DRAFT => PageStatus::Draft,
        status::HIDDEN => PageStatus::Hidden,
        _ => PageStatus::Published,
    }
}
