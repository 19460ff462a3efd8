//! Email verification token repository.

use std::sync::Arc;

use crate::entities::{VerificationToken, verification_token};
use memehub_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Verification token repository for database operations.
#[derive(Clone)]
pub struct VerificationTokenRepository {
    db: Arc<DatabaseConnection>,
}

impl VerificationTokenRepository {
    /// Create a new verification token repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Store a new token.
    pub async fn create(
        &self,
        model: verification_token::ActiveModel,
    ) -> AppResult<verification_token::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a token by its value.
    pub async fn find_by_token(
        &self,
        token: &str,
    ) -> AppResult<Option<verification_token::Model>> {
        VerificationToken::find()
            .filter(verification_token::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a token by ID.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        VerificationToken::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete every outstanding token for a user.
    pub async fn delete_by_user(&self, user_id: &str) -> AppResult<u64> {
        let result = VerificationToken::delete_many()
            .filter(verification_token::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}
