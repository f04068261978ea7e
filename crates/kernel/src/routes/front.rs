//! Page route handler.
//!
//! Resolves any path to a page and returns it as JSON. Paths that match no
//! page fall back to aliases, answered with a permanent redirect.

use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::content::ContentMemo;
use crate::error::{AppError, AppResult};
use crate::models::{Page, PageStatus, content_types};
use crate::state::AppState;

/// Create the page router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(show_page))
        .route("/{*path}", get(show_page))
}

/// Query parameters for page requests.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub lang: Option<String>,
}

/// Page as served to clients.
#[derive(Debug, Serialize)]
pub struct PageView {
    pub id: Uuid,
    pub status: PageStatus,
    pub language: String,
    pub url: String,
    pub title: String,
    pub slug: String,
    pub body: String,
}

async fn show_page(
    State(state): State<AppState>,
    uri: Uri,
    Query(params): Query<PageParams>,
) -> AppResult<Response> {
    let path = urlencoding::decode(uri.path())
        .map_err(|_| AppError::NotFound)?
        .into_owned();

    let config = state.config();
    let language = params
        .lang
        .as_deref()
        .filter(|l| config.is_supported(l))
        .unwrap_or(&config.default_language)
        .to_string();

    let mut memo = ContentMemo::new();

    if let Some(page) = state
        .paths()
        .resolve(&path, &language, true, &mut memo)
        .await?
    {
        let view = render_page(&state, page, &language, &mut memo).await?;
        return Ok(Json(view).into_response());
    }

    if let Some(alias) = state.aliases().resolve_alias(&path, uri.query()).await?
        && let Some(target) = state.pages().find(alias.page_id).await?
        && target.status != PageStatus::Draft
    {
        let location = state.paths().url_path(&target, &language, &mut memo).await?;
        if location != path {
            debug!(from = %path, to = %location, "alias redirect");
            let location = encode_path(&location);
            return Ok(
                (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response(),
            );
        }
    }

    Err(AppError::NotFound)
}

/// Percent-encode each segment of a page path for use in a header.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

async fn render_page(
    state: &AppState,
    page: Page,
    language: &str,
    memo: &mut ContentMemo,
) -> AppResult<PageView> {
    let status = page.calculated_status(Utc::now(), state.config());
    if matches!(status, PageStatus::Draft | PageStatus::Expired) {
        return Err(AppError::NotFound);
    }

    let contents = state.contents();
    let title = contents
        .get_body(&page, language, content_types::TITLE, true, memo)
        .await?;
    let slug = contents
        .get_body(&page, language, content_types::SLUG, true, memo)
        .await?;
    let body = contents
        .get_body(&page, language, content_types::BODY, true, memo)
        .await?;
    let url = state.paths().url_path(&page, language, memo).await?;

    Ok(PageView {
        id: page.id,
        status,
        language: language.to_string(),
        url,
        title,
        slug,
        body,
    })
}
