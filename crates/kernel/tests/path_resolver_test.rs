#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for path resolution.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::TestApp;
use sentiero_kernel::PageConfig;
use sentiero_kernel::content::ContentMemo;
use sentiero_kernel::models::{Content, content_types};
use sentiero_kernel::services::SlugIndex;
use sentiero_test_utils::{assert, test_page};
use uuid::Uuid;

fn strict() -> PageConfig {
    PageConfig {
        use_strict_url: true,
        ..PageConfig::default()
    }
}

#[tokio::test]
async fn test_root_resolution() {
    let app = TestApp::new();
    assert!(app.resolve("/", "en").await.is_none());

    let home = app.create_page(&test_page("home"), None).await;
    app.create_page(&test_page("second-root"), None).await;

    for path in ["", "/", "//"] {
        let found = app.resolve(path, "en").await;
        assert_eq!(found.map(|p| p.id), Some(home.id), "path {path:?}");
    }
}

#[tokio::test]
async fn test_single_match_non_strict_ignores_prefix() {
    let app = TestApp::new();
    let about = app.create_page(&test_page("about"), None).await;
    let team = app.create_page(&test_page("team"), Some(&about)).await;

    let found = app.resolve("/anything/team", "en").await;
    assert_eq!(found.map(|p| p.id), Some(team.id));

    let found = app.resolve("/about/team/", "en").await;
    assert_eq!(found.map(|p| p.id), Some(team.id));
}

#[tokio::test]
async fn test_single_match_strict_requires_full_path() {
    let app = TestApp::with_config(strict());
    let about = app.create_page(&test_page("about"), None).await;
    let team = app.create_page(&test_page("team"), Some(&about)).await;

    assert!(app.resolve("/anything/team", "en").await.is_none());
    assert!(app.resolve("/team", "en").await.is_none());

    let found = app.resolve("/about/team", "en").await;
    assert_eq!(found.map(|p| p.id), Some(team.id));
}

#[tokio::test]
async fn test_duplicate_slugs_in_different_branches() {
    for config in [PageConfig::default(), strict()] {
        let app = TestApp::with_config(config);
        let sport = app.create_page(&test_page("sport"), None).await;
        let culture = app.create_page(&test_page("culture"), None).await;
        let sport_news = app.create_page(&test_page("news"), Some(&sport)).await;
        let culture_news = app.create_page(&test_page("news"), Some(&culture)).await;

        let found = app.resolve("sport/news", "en").await;
        assert_eq!(found.map(|p| p.id), Some(sport_news.id));

        let found = app.resolve("culture/news", "en").await;
        assert_eq!(found.map(|p| p.id), Some(culture_news.id));

        assert!(app.resolve("politics/news", "en").await.is_none());
        assert!(app.resolve("news", "en").await.is_none());
    }
}

#[tokio::test]
async fn test_identical_paths_prefer_most_recent_slug() {
    for config in [PageConfig::default(), strict()] {
        let app = TestApp::with_config(config.clone());
        let older = app.create_page(&test_page("draft-name"), None).await;
        let newer = app.create_page(&test_page("other-name"), None).await;

        let now = Utc::now();
        for (page, hours) in [(&older, 1), (&newer, 2)] {
            app.store.insert_content(Content {
                id: Uuid::now_v7(),
                page_id: page.id,
                language: "en".to_string(),
                content_type: content_types::SLUG.to_string(),
                body: "news".to_string(),
                created: now + Duration::hours(hours),
            });
        }

        let slugs = SlugIndex::new(app.store.clone(), Arc::new(config));
        let candidates = slugs.candidates("news").await.unwrap();
        assert::same_ids(&candidates, &[newer.id, older.id]);

        for _ in 0..3 {
            let found = app.resolve("/news", "en").await;
            assert_eq!(found.map(|p| p.id), Some(newer.id));
        }
    }
}

#[tokio::test]
async fn test_unknown_slug() {
    let app = TestApp::new();
    app.create_page(&test_page("about"), None).await;

    assert!(app.resolve("/missing", "en").await.is_none());
}

#[tokio::test]
async fn test_drafts_excluded_on_request() {
    let app = TestApp::new();
    let draft = app.create_page(&test_page("wip").draft(), None).await;

    assert!(app.resolve("/wip", "en").await.is_none());

    let mut memo = ContentMemo::new();
    let found = app
        .state
        .paths()
        .resolve("/wip", "en", false, &mut memo)
        .await
        .unwrap();
    assert_eq!(found.map(|p| p.id), Some(draft.id));
}

#[tokio::test]
async fn test_hidden_pages_still_resolve() {
    let app = TestApp::new();
    let hidden = app.create_page(&test_page("secret").hidden(), None).await;

    let found = app.resolve("/secret", "en").await;
    assert_eq!(found.map(|p| p.id), Some(hidden.id));
}

#[tokio::test]
async fn test_site_scope_restricts_candidates() {
    let config = PageConfig {
        use_site_id: true,
        site_id: 1,
        ..PageConfig::default()
    };
    let app = TestApp::with_config(config);
    app.create_page(&test_page("elsewhere").on_sites(&[2]), None)
        .await;
    let here = app
        .create_page(&test_page("here").on_sites(&[1, 2]), None)
        .await;

    assert!(app.resolve("/elsewhere", "en").await.is_none());
    let found = app.resolve("/here", "en").await;
    assert_eq!(found.map(|p| p.id), Some(here.id));
}

#[tokio::test]
async fn test_old_slugs_keep_resolving() {
    let app = TestApp::new();
    let page = app.create_page(&test_page("old-name"), None).await;
    app.state
        .contents()
        .create_if_changed(&page, "en", "slug", "new-name")
        .await
        .unwrap();

    let found = app.resolve("/new-name", "en").await;
    assert_eq!(found.map(|p| p.id), Some(page.id));

    let found = app.resolve("/old-name", "en").await;
    assert_eq!(found.map(|p| p.id), Some(page.id));
}

#[tokio::test]
async fn test_translated_slugs_with_fallback() {
    let config = PageConfig {
        use_strict_url: true,
        ..PageConfig::default().with_languages(&["en", "fr"])
    };
    let app = TestApp::with_config(config);
    let about = app.create_page(&test_page("about"), None).await;
    let team = app
        .create_page(&test_page("team").with_slug("fr", "equipe"), Some(&about))
        .await;

    // The root has no French slug, so its English one is used.
    let found = app.resolve("/about/equipe", "fr").await;
    assert_eq!(found.map(|p| p.id), Some(team.id));

    assert!(app.resolve("/about/team", "fr").await.is_none());

    let found = app.resolve("/about/team", "en").await;
    assert_eq!(found.map(|p| p.id), Some(team.id));
}

#[tokio::test]
async fn test_complete_slug_and_url_path() {
    let app = TestApp::new();
    let a = app.create_page(&test_page("a"), None).await;
    let b = app.create_page(&test_page("b"), Some(&a)).await;
    let c = app.create_page(&test_page("c"), Some(&b)).await;

    let mut memo = ContentMemo::new();
    let paths = app.state.paths();
    assert_eq!(paths.complete_slug(&c, "en", &mut memo).await.unwrap(), "a/b/c");
    assert_eq!(paths.url_path(&a, "en", &mut memo).await.unwrap(), "/a");
    assert!(!memo.is_empty());
}

#[tokio::test]
async fn test_parent_cycle_is_an_error() {
    let app = TestApp::with_config(strict());
    let mut a = app.create_page(&test_page("a"), None).await;
    let b = app.create_page(&test_page("b"), Some(&a)).await;
    a.parent_id = Some(b.id);
    app.state.pages().save(&mut a).await.unwrap();

    let mut memo = ContentMemo::new();
    let result = app.state.paths().resolve("/a/b", "en", true, &mut memo).await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("cycle"), "unexpected error: {err}");
}
