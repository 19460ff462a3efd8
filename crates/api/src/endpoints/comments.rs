//! Comment endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get},
};
use memehub_common::AppResult;
use memehub_core::{CommentPage, CommentView};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, PageQuery},
    middleware::AppState,
    response::{Empty, Success},
};

const COMMENT_PAGE_SIZE: u64 = 20;

/// Comments on a meme, newest first.
async fn list(
    State(state): State<AppState>,
    Path(meme_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<CommentPage>> {
    let comments = state
        .comment_service
        .list(&meme_id, &page.with_default(COMMENT_PAGE_SIZE))
        .await?;
    Ok(Json(comments))
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub comment: CommentView,
}

/// Comment on a meme.
async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(meme_id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<Json<CommentResponse>> {
    let comment = state
        .comment_service
        .create(&user.id, &meme_id, &req.content)
        .await?;
    Ok(Json(CommentResponse { comment }))
}

/// Delete the caller's comment.
async fn remove(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((meme_id, comment_id)): Path<(String, String)>,
) -> AppResult<Success<Empty>> {
    state
        .comment_service
        .delete(&comment_id, &meme_id, &user.id)
        .await?;
    Ok(crate::response::ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/comments", get(list).post(create))
        .route("/{id}/comments/{comment_id}", delete(remove))
}
