//! Response shapes for memes and the batched lookups that fill them.

use std::collections::HashMap;

use memehub_common::AppResult;
use memehub_db::{
    entities::{
        meme::{self, MemeType},
        user,
        vote::VoteType,
    },
    repositories::{CommentRepository, TagRepository, TrendingMeme, UserRepository},
};
use serde::Serialize;

/// Public author fields embedded in memes and comments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorSummary {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<&user::Model> for AuthorSummary {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Relation counts attached to a meme.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MemeCounts {
    pub comments: u64,
}

/// A meme as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemeView {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: String,
    pub meme_type: MemeType,
    pub upvotes: i32,
    pub downvotes: i32,
    pub views: i32,
    pub share_count: i32,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub author: Option<AuthorSummary>,
    pub tags: Vec<String>,
    #[serde(rename = "_count")]
    pub count: MemeCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trending_score: Option<f64>,
    /// The caller's vote. Only present on single-meme reads by a signed-in user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_vote: Option<Option<VoteType>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorited: Option<bool>,
}

impl MemeView {
    fn new(meme: meme::Model, author: Option<AuthorSummary>, tags: Vec<String>, comments: u64) -> Self {
        Self {
            id: meme.id,
            title: meme.title,
            description: meme.description,
            image_url: meme.image_url,
            meme_type: meme.meme_type,
            upvotes: meme.upvotes,
            downvotes: meme.downvotes,
            views: meme.views,
            share_count: meme.share_count,
            created_at: meme.created_at.to_rfc3339(),
            updated_at: meme.updated_at.map(|t| t.to_rfc3339()),
            author,
            tags,
            count: MemeCounts { comments },
            trending_score: None,
            user_vote: None,
            is_favorited: None,
        }
    }
}

/// Fills [`MemeView`]s with authors, tags and comment counts in three queries
/// per batch, whatever the batch size.
#[derive(Clone)]
pub struct MemeViewBuilder {
    user_repo: UserRepository,
    tag_repo: TagRepository,
    comment_repo: CommentRepository,
}

impl MemeViewBuilder {
    /// Create a new view builder.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        tag_repo: TagRepository,
        comment_repo: CommentRepository,
    ) -> Self {
        Self {
            user_repo,
            tag_repo,
            comment_repo,
        }
    }

    /// Build views, keeping the input order.
    pub async fn build(&self, memes: Vec<meme::Model>) -> AppResult<Vec<MemeView>> {
        if memes.is_empty() {
            return Ok(vec![]);
        }

        let meme_ids: Vec<String> = memes.iter().map(|m| m.id.clone()).collect();
        let mut author_ids: Vec<String> = memes.iter().map(|m| m.author_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();

        let authors: HashMap<String, AuthorSummary> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .iter()
            .map(|u| (u.id.clone(), AuthorSummary::from(u)))
            .collect();
        let mut tags = self.tag_repo.names_for_memes(&meme_ids).await?;
        let comments = self.comment_repo.count_by_memes(&meme_ids).await?;

        Ok(memes
            .into_iter()
            .map(|m| {
                let author = authors.get(&m.author_id).cloned();
                let tag_names = tags.remove(&m.id).unwrap_or_default();
                let comment_count = comments.get(&m.id).copied().unwrap_or(0);
                MemeView::new(m, author, tag_names, comment_count)
            })
            .collect())
    }

    /// Build a single view.
    pub async fn build_one(&self, meme: meme::Model) -> AppResult<MemeView> {
        let mut views = self.build(vec![meme]).await?;
        views
            .pop()
            .ok_or_else(|| memehub_common::AppError::Internal("Empty meme view batch".to_string()))
    }

    /// Build views for ranked rows. Comment counts come with the rows.
    pub async fn build_ranked(&self, ranked: Vec<TrendingMeme>) -> AppResult<Vec<MemeView>> {
        if ranked.is_empty() {
            return Ok(vec![]);
        }

        let meme_ids: Vec<String> = ranked.iter().map(|r| r.meme.id.clone()).collect();
        let mut author_ids: Vec<String> = ranked.iter().map(|r| r.meme.author_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();

        let authors: HashMap<String, AuthorSummary> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .iter()
            .map(|u| (u.id.clone(), AuthorSummary::from(u)))
            .collect();
        let mut tags = self.tag_repo.names_for_memes(&meme_ids).await?;

        Ok(ranked
            .into_iter()
            .map(|r| {
                let author = authors.get(&r.meme.author_id).cloned();
                let tag_names = tags.remove(&r.meme.id).unwrap_or_default();
                let mut view = MemeView::new(r.meme, author, tag_names, r.comment_count);
                view.trending_score = Some(r.trending_score);
                view
            })
            .collect())
    }
}
