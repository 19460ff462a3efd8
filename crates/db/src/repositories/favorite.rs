//! Favorite repository.

use std::sync::Arc;

use crate::entities::{Favorite, Meme, favorite, meme};
use crate::write_error;
use memehub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};

/// Favorite repository for database operations.
#[derive(Clone)]
pub struct FavoriteRepository {
    db: Arc<DatabaseConnection>,
}

impl FavoriteRepository {
    /// Create a new favorite repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the favorite row for a user and meme.
    pub async fn find_by_user_and_meme<C: ConnectionTrait>(
        conn: &C,
        user_id: &str,
        meme_id: &str,
    ) -> AppResult<Option<favorite::Model>> {
        Favorite::find()
            .filter(favorite::Column::UserId.eq(user_id))
            .filter(favorite::Column::MemeId.eq(meme_id))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a favorite. A second row for the same pair is a `Conflict`.
    pub async fn create<C: ConnectionTrait>(
        conn: &C,
        model: favorite::ActiveModel,
    ) -> AppResult<favorite::Model> {
        model.insert(conn).await.map_err(write_error)
    }

    /// Delete a favorite by ID.
    pub async fn delete<C: ConnectionTrait>(conn: &C, id: &str) -> AppResult<()> {
        Favorite::delete_by_id(id)
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Check if a user has favorited a meme.
    pub async fn is_favorited(&self, user_id: &str, meme_id: &str) -> AppResult<bool> {
        Ok(Self::find_by_user_and_meme(self.db.as_ref(), user_id, meme_id)
            .await?
            .is_some())
    }

    /// A user's favorited memes, most recently favorited first.
    pub async fn find_memes_by_user(&self, user_id: &str) -> AppResult<Vec<meme::Model>> {
        let rows = Favorite::find()
            .find_also_related(Meme)
            .filter(favorite::Column::UserId.eq(user_id))
            .order_by_desc(favorite::Column::CreatedAt)
            .order_by_desc(favorite::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().filter_map(|(_, meme)| meme).collect())
    }
}
