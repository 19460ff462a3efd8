//! User endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use memehub_common::{AppError, AppResult};
use memehub_core::Profile;
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, MaybeAuthUser, PageQuery},
    middleware::AppState,
};

const PROFILE_PAGE_SIZE: u64 = 12;

/// A public profile with the user's memes.
async fn show(
    State(state): State<AppState>,
    user: MaybeAuthUser,
    Path(username): Path<String>,
    Query(page): Query<PageQuery>,
) -> AppResult<Json<Profile>> {
    let profile = state
        .profile_service
        .profile(&username, user.id(), &page.with_default(PROFILE_PAGE_SIZE))
        .await?;
    Ok(Json(profile))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowTarget {
    pub target_user_id: Option<String>,
}

impl FollowTarget {
    fn require(self) -> AppResult<String> {
        self.target_user_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::BadRequest("Target user ID is required".to_string()))
    }
}

#[derive(Serialize)]
pub struct FollowStatus {
    pub following: bool,
}

/// Whether the caller follows the target.
async fn follow_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(target): Query<FollowTarget>,
) -> AppResult<Json<FollowStatus>> {
    let target_id = target.require()?;
    let following = state
        .follow_service
        .is_following(&user.id, &target_id)
        .await?;
    Ok(Json(FollowStatus { following }))
}

#[derive(Serialize)]
pub struct ToggleFollowResponse {
    pub following: bool,
    pub message: &'static str,
}

/// Follow or unfollow the target.
async fn toggle_follow(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(target): Json<FollowTarget>,
) -> AppResult<Json<ToggleFollowResponse>> {
    let target_id = target.require()?;
    let following = state
        .follow_service
        .toggle_follow(&user.id, &target_id)
        .await?;

    Ok(Json(ToggleFollowResponse {
        following,
        message: if following {
            "Followed successfully"
        } else {
            "Unfollowed successfully"
        },
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/follow", get(follow_status).post(toggle_follow))
        .route("/{username}", get(show))
}
