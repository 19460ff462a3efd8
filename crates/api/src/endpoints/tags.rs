//! Tag endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use memehub_common::AppResult;
use memehub_core::TagPage;

use crate::{extractors::PageQuery, middleware::AppState};

const TAG_PAGE_SIZE: u64 = 12;

/// Memes carrying a tag.
async fn show(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<TagPage>> {
    let page = state
        .tag_service
        .memes_for_tag(&name, &page.with_default(TAG_PAGE_SIZE))
        .await?;
    Ok(Json(page))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{name}", get(show))
}
