//! Template catalogue and discover search.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use memehub_common::AppResult;
use memehub_core::{DiscoverPage, TemplatePage};
use serde::Deserialize;

use crate::{extractors::PageQuery, middleware::AppState};

const TEMPLATE_PAGE_SIZE: u64 = 20;

/// Popular Imgflip templates.
async fn templates(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<TemplatePage>> {
    let page = state
        .discover_service
        .templates(&page.with_default(TEMPLATE_PAGE_SIZE))
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct DiscoverQuery {
    #[serde(default)]
    pub q: String,
}

/// Local memes and Imgflip templates matching a query.
async fn discover(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(query): Query<DiscoverQuery>,
) -> AppResult<Json<DiscoverPage>> {
    let page = state
        .discover_service
        .search(&query.q, &page.with_default(TEMPLATE_PAGE_SIZE))
        .await?;
    Ok(Json(page))
}

pub fn imgflip_router() -> Router<AppState> {
    Router::new().route("/", get(templates))
}

pub fn discover_router() -> Router<AppState> {
    Router::new().route("/search", get(discover))
}
