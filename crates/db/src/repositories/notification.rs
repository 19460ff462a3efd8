//! Notification repository.

use std::sync::Arc;

use crate::entities::{Notification, notification};
use memehub_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};

/// The fields that identify "the same" notification for deduplication.
#[derive(Debug, Clone)]
pub struct NotificationKey<'a> {
    pub notification_type: notification::NotificationType,
    pub sender_id: &'a str,
    pub receiver_id: &'a str,
    pub meme_id: Option<&'a str>,
    pub comment_id: Option<&'a str>,
}

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new notification.
    pub async fn create(
        &self,
        model: notification::ActiveModel,
    ) -> AppResult<notification::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a matching notification created at or after `since`.
    pub async fn find_recent_duplicate(
        &self,
        key: &NotificationKey<'_>,
        since: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<Option<notification::Model>> {
        let mut query = Notification::find()
            .filter(notification::Column::NotificationType.eq(key.notification_type))
            .filter(notification::Column::SenderId.eq(key.sender_id))
            .filter(notification::Column::ReceiverId.eq(key.receiver_id))
            .filter(notification::Column::CreatedAt.gte(since));

        query = match key.meme_id {
            Some(id) => query.filter(notification::Column::MemeId.eq(id)),
            None => query.filter(notification::Column::MemeId.is_null()),
        };
        query = match key.comment_id {
            Some(id) => query.filter(notification::Column::CommentId.eq(id)),
            None => query.filter(notification::Column::CommentId.is_null()),
        };

        query
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// A user's notifications, newest first.
    pub async fn find_by_receiver(
        &self,
        receiver_id: &str,
        unread_only: bool,
        offset: u64,
        limit: u64,
    ) -> AppResult<Vec<notification::Model>> {
        let mut query = Notification::find()
            .filter(notification::Column::ReceiverId.eq(receiver_id));

        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }

        query
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count a user's notifications.
    pub async fn count_by_receiver(&self, receiver_id: &str, unread_only: bool) -> AppResult<u64> {
        let mut query = Notification::find()
            .filter(notification::Column::ReceiverId.eq(receiver_id));

        if unread_only {
            query = query.filter(notification::Column::IsRead.eq(false));
        }

        query
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark specific notifications as read. IDs owned by other users are ignored.
    pub async fn mark_read(&self, receiver_id: &str, ids: &[String]) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::ReceiverId.eq(receiver_id))
            .filter(notification::Column::Id.is_in(ids.to_vec()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Mark all of a user's notifications as read.
    pub async fn mark_all_read(&self, receiver_id: &str) -> AppResult<u64> {
        let result = Notification::update_many()
            .col_expr(notification::Column::IsRead, Expr::value(true))
            .filter(notification::Column::ReceiverId.eq(receiver_id))
            .filter(notification::Column::IsRead.eq(false))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }
}
