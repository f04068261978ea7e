#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Integration tests for the page alias fallback.

mod common;

use axum::http::StatusCode;
use common::{TestApp, location};
use sentiero_test_utils::test_page;

#[tokio::test]
async fn test_alias_redirects_to_page_url() {
    let app = TestApp::new();
    let about = app.create_page(&test_page("about"), None).await;
    let team = app.create_page(&test_page("team"), Some(&about)).await;
    app.state
        .aliases()
        .create_alias(team.id, "/old/staff.html")
        .await
        .unwrap();

    let response = app.get("/old/staff.html").await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response).as_deref(), Some("/about/team"));
}

#[tokio::test]
async fn test_query_string_alias_is_preferred() {
    let app = TestApp::new();
    let about = app.create_page(&test_page("about"), None).await;
    let team = app.create_page(&test_page("team"), Some(&about)).await;
    let aliases = app.state.aliases();
    aliases.create_alias(about.id, "/index.php").await.unwrap();
    aliases
        .create_alias(team.id, "/index.php?page=team")
        .await
        .unwrap();

    let response = app.get("/index.php?page=team").await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response).as_deref(), Some("/about/team"));

    let response = app.get("/index.php?page=unknown").await;
    assert_eq!(location(&response).as_deref(), Some("/about"));

    let response = app.get("/index.php").await;
    assert_eq!(location(&response).as_deref(), Some("/about"));
}

#[tokio::test]
async fn test_pages_win_over_aliases() {
    let app = TestApp::new();
    let about = app.create_page(&test_page("about"), None).await;
    let contact = app.create_page(&test_page("contact"), None).await;
    app.state
        .aliases()
        .create_alias(contact.id, "/about")
        .await
        .unwrap();

    let (status, json) = app.get_json("/about").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], about.id.to_string());
}

#[tokio::test]
async fn test_alias_to_draft_is_not_found() {
    let app = TestApp::new();
    let draft = app.create_page(&test_page("wip").draft(), None).await;
    app.state
        .aliases()
        .create_alias(draft.id, "/preview")
        .await
        .unwrap();

    let response = app.get("/preview").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let app = TestApp::new();
    app.create_page(&test_page("about"), None).await;

    let response = app.get("/nowhere").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_aliases_for_page() {
    let app = TestApp::new();
    let about = app.create_page(&test_page("about"), None).await;
    let aliases = app.state.aliases();
    aliases.create_alias(about.id, "about-us").await.unwrap();
    aliases.create_alias(about.id, "/company/").await.unwrap();

    let urls: Vec<String> = aliases
        .aliases_for(about.id)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.url)
        .collect();
    assert_eq!(urls, vec!["/company", "/about-us"]);
}

#[tokio::test]
async fn test_redirect_location_is_percent_encoded() {
    let app = TestApp::new();
    let page = app.create_page(&test_page("café crème"), None).await;
    app.state
        .aliases()
        .create_alias(page.id, "/menu.html")
        .await
        .unwrap();

    let response = app.get("/menu.html").await;
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        location(&response).as_deref(),
        Some("/caf%C3%A9%20cr%C3%A8me")
    );
}
