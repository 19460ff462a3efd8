//! Favorite endpoints.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::get,
};
use memehub_common::AppResult;
use memehub_core::MemeView;
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState, response::Success};

use super::memes::MemeIdRequest;

#[derive(Serialize)]
pub struct FavoritesResponse {
    pub favorites: Vec<MemeView>,
}

/// The caller's favorites, newest first.
async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<FavoritesResponse>> {
    let favorites = state.favorite_service.list(&user.id).await?;
    Ok(Json(FavoritesResponse { favorites }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub is_favorited: bool,
    pub message: &'static str,
}

/// Add or remove a favorite.
async fn toggle(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Result<Json<MemeIdRequest>, JsonRejection>,
) -> AppResult<Success<ToggleResponse>> {
    let meme_id = MemeIdRequest::from_body(body)?;
    let is_favorited = state.favorite_service.toggle(&user.id, &meme_id).await?;

    Ok(Success::new(ToggleResponse {
        is_favorited,
        message: if is_favorited {
            "Added to favorites"
        } else {
            "Removed from favorites"
        },
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/favorite", get(list).post(toggle))
}
