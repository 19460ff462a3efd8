//! Public profile pages.

use memehub_common::{AppError, AppResult, PageRequest};
use memehub_db::repositories::{FollowRepository, MemeRepository, UserRepository};
use serde::Serialize;

use crate::services::{
    user::UserCounts,
    view::{MemeView, MemeViewBuilder},
};

/// Profile header.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUser {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
    #[serde(rename = "_count")]
    pub count: UserCounts,
    /// Only present when the viewer is signed in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
}

/// A profile with one page of the user's memes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user: ProfileUser,
    pub memes: Vec<MemeView>,
    pub has_more: bool,
    pub total: u64,
}

/// Profile service for business logic.
#[derive(Clone)]
pub struct ProfileService {
    user_repo: UserRepository,
    meme_repo: MemeRepository,
    follow_repo: FollowRepository,
    views: MemeViewBuilder,
}

impl ProfileService {
    /// Create a new profile service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        meme_repo: MemeRepository,
        follow_repo: FollowRepository,
        views: MemeViewBuilder,
    ) -> Self {
        Self {
            user_repo,
            meme_repo,
            follow_repo,
            views,
        }
    }

    /// Load a profile by username.
    pub async fn profile(
        &self,
        username: &str,
        viewer_id: Option<&str>,
        page: &PageRequest,
    ) -> AppResult<Profile> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))?;

        let count = UserCounts {
            memes: self.meme_repo.count_by_author(&user.id).await?,
            followers: self.follow_repo.count_followers(&user.id).await?,
            following: self.follow_repo.count_following(&user.id).await?,
        };

        let is_following = match viewer_id {
            Some(viewer_id) if viewer_id != user.id => {
                Some(self.follow_repo.is_following(viewer_id, &user.id).await?)
            }
            Some(_) => Some(false),
            None => None,
        };

        let memes = self
            .meme_repo
            .find_by_author(&user.id, page.offset(), page.limit)
            .await?;
        let memes = self.views.build(memes).await?;

        Ok(Profile {
            user: ProfileUser {
                id: user.id,
                username: user.username,
                display_name: user.display_name,
                bio: user.bio,
                avatar_url: user.avatar_url,
                created_at: user.created_at.to_rfc3339(),
                count,
                is_following,
            },
            memes,
            has_more: page.has_more(count.memes),
            total: count.memes,
        })
    }
}
