//! Follow service.

use chrono::Utc;
use memehub_common::{AppError, AppResult, IdGenerator};
use memehub_db::{
    entities::follow,
    repositories::{FollowRepository, UserRepository},
};
use sea_orm::Set;

use crate::services::notification::{NotificationService, NotifyEvent};

/// Follow service for business logic.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowRepository,
    user_repo: UserRepository,
    notification_service: Option<NotificationService>,
    id_gen: IdGenerator,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub const fn new(follow_repo: FollowRepository, user_repo: UserRepository) -> Self {
        Self {
            follow_repo,
            user_repo,
            notification_service: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the notification service used to announce new followers.
    pub fn set_notification_service(&mut self, notification_service: NotificationService) {
        self.notification_service = Some(notification_service);
    }

    /// Follow the target, or unfollow if already following.
    ///
    /// Returns whether the follower follows the target afterwards.
    pub async fn toggle_follow(&self, follower_id: &str, target_id: &str) -> AppResult<bool> {
        if follower_id == target_id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }

        if self.user_repo.find_by_id(target_id).await?.is_none() {
            return Err(AppError::UserNotFound(target_id.to_string()));
        }

        if let Some(existing) = self.follow_repo.find(follower_id, target_id).await? {
            self.follow_repo.delete(&existing.id).await?;
            tracing::debug!(follower_id, target_id, "Unfollowed");
            return Ok(false);
        }

        self.follow_repo
            .create(follow::ActiveModel {
                id: Set(self.id_gen.generate()),
                follower_id: Set(follower_id.to_string()),
                following_id: Set(target_id.to_string()),
                created_at: Set(Utc::now().into()),
            })
            .await?;

        if let Some(notifications) = &self.notification_service {
            notifications.notify_in_background(follower_id, target_id, NotifyEvent::Follow);
        }

        tracing::debug!(follower_id, target_id, "Followed");
        Ok(true)
    }

    /// Whether `follower_id` follows `target_id`.
    pub async fn is_following(&self, follower_id: &str, target_id: &str) -> AppResult<bool> {
        self.follow_repo.is_following(follower_id, target_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::notification::tests::test_user;
    use memehub_db::entities::user;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn service(db: DatabaseConnection) -> FollowService {
        let db = Arc::new(db);
        FollowService::new(FollowRepository::new(db.clone()), UserRepository::new(db))
    }

    fn edge() -> follow::Model {
        follow::Model {
            id: "f1".to_string(),
            follower_id: "u1".to_string(),
            following_id: "u2".to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_cannot_follow_yourself() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(db).toggle_follow("u1", "u1").await;
        assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg == "Cannot follow yourself"));
    }

    #[tokio::test]
    async fn test_unknown_target() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let result = service(db).toggle_follow("u1", "ghost").await;
        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_follow_then_unfollow() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_user("u2", "bob")]])
            .append_query_results([Vec::<follow::Model>::new()])
            .append_query_results([[edge()]])
            .append_query_results([[test_user("u2", "bob")]])
            .append_query_results([[edge()]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();
        let svc = service(db);

        assert!(svc.toggle_follow("u1", "u2").await.unwrap());
        assert!(!svc.toggle_follow("u1", "u2").await.unwrap());
    }
}
