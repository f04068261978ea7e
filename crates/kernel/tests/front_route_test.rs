#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for the page and health routes.

mod common;

use axum::http::StatusCode;
use common::TestApp;
use sentiero_kernel::PageConfig;
use sentiero_test_utils::{assert, test_page};

fn multilingual() -> PageConfig {
    PageConfig::default().with_languages(&["en", "fr"])
}

#[tokio::test]
async fn test_health_without_backends() {
    let app = TestApp::new();
    let (status, json) = app.get_json("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert::json_str(&json, "status", "healthy");
}

#[tokio::test]
async fn test_front_page_is_first_root() {
    let app = TestApp::new();
    let (status, _) = app.get_json("/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let home = app
        .create_page(&test_page("home").with_title("en", "Welcome"), None)
        .await;

    let (status, json) = app.get_json("/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], home.id.to_string());
    assert::json_str(&json, "title", "Welcome");
    assert::json_str(&json, "status", "published");
    assert::json_str(&json, "url", "/home");
}

#[tokio::test]
async fn test_page_view_fields() {
    let app = TestApp::new();
    let about = app.create_page(&test_page("about"), None).await;
    app.create_page(
        &test_page("team")
            .with_title("en", "Our team")
            .with_body("en", "<p>Hi</p>"),
        Some(&about),
    )
    .await;

    let (status, json) = app.get_json("/about/team/").await;
    assert_eq!(status, StatusCode::OK);
    assert::json_str(&json, "title", "Our team");
    assert::json_str(&json, "slug", "team");
    assert::json_str(&json, "body", "<p>Hi</p>");
    assert::json_str(&json, "url", "/about/team");
    assert::json_str(&json, "language", "en");
}

#[tokio::test]
async fn test_lang_parameter_with_fallback() {
    let app = TestApp::with_config(multilingual());
    app.create_page(
        &test_page("about")
            .with_title("fr", "À propos")
            .with_body("en", "English only"),
        None,
    )
    .await;

    let (status, json) = app.get_json("/about?lang=fr").await;
    assert_eq!(status, StatusCode::OK);
    assert::json_str(&json, "language", "fr");
    assert::json_str(&json, "title", "À propos");
    assert::json_str(&json, "body", "English only");

    // Unsupported languages fall back to the default.
    let (_, json) = app.get_json("/about?lang=xx").await;
    assert::json_str(&json, "language", "en");
    assert::json_str(&json, "title", "about");
}

#[tokio::test]
async fn test_drafts_are_not_served() {
    let app = TestApp::new();
    app.create_page(&test_page("wip").draft(), None).await;

    let (status, _) = app.get_json("/wip").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_publication_window_gates_visibility() {
    let config = PageConfig {
        show_start_date: true,
        show_end_date: true,
        ..PageConfig::default()
    };
    let app = TestApp::with_config(config);
    app.create_page(&test_page("soon").starting_in_days(1), None)
        .await;
    app.create_page(&test_page("gone").ending_in_days(-1), None)
        .await;
    app.create_page(
        &test_page("live").starting_in_days(-1).ending_in_days(1),
        None,
    )
    .await;

    assert_eq!(app.get_json("/soon").await.0, StatusCode::NOT_FOUND);
    assert_eq!(app.get_json("/gone").await.0, StatusCode::NOT_FOUND);
    assert_eq!(app.get_json("/live").await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_percent_encoded_paths() {
    let app = TestApp::new();
    app.create_page(&test_page("café"), None).await;

    let (status, json) = app.get_json("/caf%C3%A9").await;
    assert_eq!(status, StatusCode::OK);
    assert::json_str(&json, "slug", "café");
}
