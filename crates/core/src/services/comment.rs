//! Comment service.

use std::collections::HashMap;

use chrono::Utc;
use memehub_common::{AppError, AppResult, IdGenerator, PageRequest};
use memehub_db::{
    entities::comment,
    repositories::{CommentRepository, MemeRepository, UserRepository},
};
use sea_orm::Set;
use serde::Serialize;

use crate::services::{
    notification::{NotificationService, NotifyEvent},
    view::AuthorSummary,
};

/// Longest accepted comment, in characters.
pub const MAX_COMMENT_LENGTH: usize = 1000;

/// A comment as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub id: String,
    pub content: String,
    pub meme_id: String,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub user: Option<AuthorSummary>,
}

impl CommentView {
    fn new(comment: comment::Model, user: Option<AuthorSummary>) -> Self {
        Self {
            id: comment.id,
            content: comment.content,
            meme_id: comment.meme_id,
            created_at: comment.created_at.to_rfc3339(),
            updated_at: comment.updated_at.map(|t| t.to_rfc3339()),
            user,
        }
    }
}

/// One page of comments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    pub comments: Vec<CommentView>,
    pub has_more: bool,
    pub total: u64,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    meme_repo: MemeRepository,
    user_repo: UserRepository,
    notification_service: Option<NotificationService>,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        comment_repo: CommentRepository,
        meme_repo: MemeRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            comment_repo,
            meme_repo,
            user_repo,
            notification_service: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the notification service used to tell authors about comments.
    pub fn set_notification_service(&mut self, notification_service: NotificationService) {
        self.notification_service = Some(notification_service);
    }

    /// Comments on a meme, newest first.
    pub async fn list(&self, meme_id: &str, page: &PageRequest) -> AppResult<CommentPage> {
        let comments = self
            .comment_repo
            .find_by_meme(meme_id, page.offset(), page.limit)
            .await?;
        let total = self.comment_repo.count_by_meme(meme_id).await?;

        let mut user_ids: Vec<String> = comments.iter().map(|c| c.user_id.clone()).collect();
        user_ids.sort();
        user_ids.dedup();

        let users: HashMap<String, AuthorSummary> = if user_ids.is_empty() {
            HashMap::new()
        } else {
            self.user_repo
                .find_by_ids(&user_ids)
                .await?
                .iter()
                .map(|u| (u.id.clone(), AuthorSummary::from(u)))
                .collect()
        };

        let comments = comments
            .into_iter()
            .map(|c| {
                let user = users.get(&c.user_id).cloned();
                CommentView::new(c, user)
            })
            .collect();

        Ok(CommentPage {
            comments,
            has_more: page.has_more(total),
            total,
        })
    }

    /// Add a comment to a meme and tell its author.
    pub async fn create(&self, user_id: &str, meme_id: &str, content: &str) -> AppResult<CommentView> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest("Comment content is required".to_string()));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(AppError::BadRequest(format!(
                "Comment is too long (maximum is {MAX_COMMENT_LENGTH} characters)"
            )));
        }

        let meme = self
            .meme_repo
            .find_by_id(meme_id)
            .await?
            .ok_or_else(|| AppError::MemeNotFound(meme_id.to_string()))?;
        let user = self.user_repo.get_by_id(user_id).await?;

        let comment = self
            .comment_repo
            .create(comment::ActiveModel {
                id: Set(self.id_gen.generate()),
                content: Set(content.to_string()),
                user_id: Set(user_id.to_string()),
                meme_id: Set(meme_id.to_string()),
                created_at: Set(Utc::now().into()),
                updated_at: Set(None),
            })
            .await?;

        if let Some(notifications) = &self.notification_service {
            notifications.notify_in_background(
                user_id,
                &meme.author_id,
                NotifyEvent::Comment {
                    meme_id: meme_id.to_string(),
                    comment_id: comment.id.clone(),
                },
            );
        }

        tracing::debug!(comment_id = %comment.id, meme_id, user_id, "Comment created");
        Ok(CommentView::new(comment, Some(AuthorSummary::from(&user))))
    }

    /// Delete a comment. Only its author may do this.
    pub async fn delete(&self, comment_id: &str, meme_id: &str, requester_id: &str) -> AppResult<()> {
        let comment = self
            .comment_repo
            .find_by_id(comment_id)
            .await?
            .filter(|c| c.meme_id == meme_id)
            .ok_or_else(|| AppError::NotFound(format!("Comment not found: {comment_id}")))?;

        if comment.user_id != requester_id {
            return Err(AppError::Forbidden(
                "You can only delete your own comments".to_string(),
            ));
        }

        self.comment_repo.delete(comment_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::notification::tests::{test_meme, test_user};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult, Value};
    use std::sync::Arc;

    fn service(db: DatabaseConnection) -> CommentService {
        let db = Arc::new(db);
        CommentService::new(
            CommentRepository::new(db.clone()),
            MemeRepository::new(db.clone()),
            UserRepository::new(db),
        )
    }

    fn stored_comment(id: &str, user_id: &str, content: &str) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            content: content.to_string(),
            user_id: user_id.to_string(),
            meme_id: "m1".to_string(),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_blank_comment_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(db).create("u1", "m1", "   \n ").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_overlong_comment_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let content = "x".repeat(MAX_COMMENT_LENGTH + 1);

        let result = service(db).create("u1", "m1", &content).await;
        assert!(matches!(result, Err(AppError::BadRequest(msg)) if msg.contains("too long")));
    }

    #[tokio::test]
    async fn test_create_trims_content() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_meme("m1", "author")]])
            .append_query_results([[test_user("u1", "alice")]])
            .append_query_results([[stored_comment("c1", "u1", "nice")]])
            .into_connection();

        let view = service(db).create("u1", "m1", "  nice  ").await.unwrap();

        assert_eq!(view.content, "nice");
        assert_eq!(view.user.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_create_on_missing_meme() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<memehub_db::entities::meme::Model>::new()])
            .into_connection();

        let result = service(db).create("u1", "gone", "hello").await;
        assert!(matches!(result, Err(AppError::MemeNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_attaches_authors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[
                stored_comment("c2", "u1", "second"),
                stored_comment("c1", "u1", "first"),
            ]])
            .append_query_results([[maplit::btreemap! { "num_items" => Value::BigInt(Some(25)) }]])
            .append_query_results([[test_user("u1", "alice")]])
            .into_connection();

        let page = service(db)
            .list("m1", &PageRequest::new(None, None, 20))
            .await
            .unwrap();

        assert_eq!(page.comments.len(), 2);
        assert_eq!(page.comments[0].id, "c2");
        assert_eq!(page.total, 25);
        assert!(page.has_more);
        assert_eq!(page.comments[1].user.as_ref().unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_delete_someone_elses_comment() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_comment("c1", "owner", "hi")]])
            .into_connection();

        let result = service(db).delete("c1", "m1", "stranger").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_own_comment() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[stored_comment("c1", "owner", "hi")]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        service(db).delete("c1", "m1", "owner").await.unwrap();
    }
}
