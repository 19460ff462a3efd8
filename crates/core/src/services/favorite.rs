//! Favorite service.

use chrono::Utc;
use memehub_common::{AppError, AppResult, IdGenerator};
use memehub_db::{
    entities::favorite,
    repositories::{FavoriteRepository, MemeRepository},
};
use sea_orm::Set;

use crate::services::view::{MemeView, MemeViewBuilder};

/// Favorite service for business logic.
#[derive(Clone)]
pub struct FavoriteService {
    meme_repo: MemeRepository,
    favorite_repo: FavoriteRepository,
    views: MemeViewBuilder,
    id_gen: IdGenerator,
}

impl FavoriteService {
    /// Create a new favorite service.
    #[must_use]
    pub const fn new(
        meme_repo: MemeRepository,
        favorite_repo: FavoriteRepository,
        views: MemeViewBuilder,
    ) -> Self {
        Self {
            meme_repo,
            favorite_repo,
            views,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add the meme to the user's favorites, or remove it if already there.
    ///
    /// Returns whether the meme is a favorite afterwards.
    pub async fn toggle(&self, user_id: &str, meme_id: &str) -> AppResult<bool> {
        let txn = self.meme_repo.begin().await?;

        MemeRepository::lock_for_update(&txn, meme_id)
            .await?
            .ok_or_else(|| AppError::MemeNotFound(meme_id.to_string()))?;

        let favorited = match FavoriteRepository::find_by_user_and_meme(&txn, user_id, meme_id).await? {
            Some(existing) => {
                FavoriteRepository::delete(&txn, &existing.id).await?;
                false
            }
            None => {
                FavoriteRepository::create(
                    &txn,
                    favorite::ActiveModel {
                        id: Set(self.id_gen.generate()),
                        user_id: Set(user_id.to_string()),
                        meme_id: Set(meme_id.to_string()),
                        created_at: Set(Utc::now().into()),
                    },
                )
                .await?;
                true
            }
        };

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(user_id, meme_id, favorited, "Favorite toggled");
        Ok(favorited)
    }

    /// Whether the user has favorited the meme.
    pub async fn is_favorited(&self, user_id: &str, meme_id: &str) -> AppResult<bool> {
        self.favorite_repo.is_favorited(user_id, meme_id).await
    }

    /// The user's favorites, most recently favorited first.
    pub async fn list(&self, user_id: &str) -> AppResult<Vec<MemeView>> {
        let memes = self.favorite_repo.find_memes_by_user(user_id).await?;
        self.views.build(memes).await
    }
}
