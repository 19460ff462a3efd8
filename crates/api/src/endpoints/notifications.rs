//! Notification endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use memehub_common::{AppError, AppResult};
use memehub_core::MarkRead;
use memehub_db::entities::notification::{self, NotificationType};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, PageQuery},
    middleware::AppState,
    response::{Empty, Success},
    sse,
};

const NOTIFICATION_PAGE_SIZE: u64 = 20;

/// A notification as returned by the API.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub message: String,
    pub is_read: bool,
    pub sender_id: Option<String>,
    pub meme_id: Option<String>,
    pub comment_id: Option<String>,
    pub created_at: String,
}

impl From<notification::Model> for NotificationView {
    fn from(n: notification::Model) -> Self {
        Self {
            id: n.id,
            notification_type: n.notification_type,
            message: n.message,
            is_read: n.is_read,
            sender_id: n.sender_id,
            meme_id: n.meme_id,
            comment_id: n.comment_id,
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub notifications: Vec<NotificationView>,
    pub unread_count: u64,
    pub has_more: bool,
}

/// The caller's notifications, newest first.
async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Query(page): Query<PageQuery>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<NotificationList>> {
    let page = page.with_default(NOTIFICATION_PAGE_SIZE);

    let (items, total) = state
        .notification_service
        .list(&user.id, &page, query.unread_only)
        .await?;
    let unread_count = state.notification_service.unread_count(&user.id).await?;

    Ok(Json(NotificationList {
        notifications: items.into_iter().map(NotificationView::from).collect(),
        unread_count,
        has_more: page.has_more(total),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub notification_ids: Option<Vec<String>>,
    #[serde(default)]
    pub mark_all_as_read: bool,
}

impl MarkReadRequest {
    fn into_mark_read(self) -> AppResult<MarkRead> {
        if self.mark_all_as_read {
            return Ok(MarkRead::All);
        }
        match self.notification_ids {
            Some(ids) if !ids.is_empty() => Ok(MarkRead::Ids(ids)),
            _ => Err(AppError::BadRequest(
                "Provide notificationIds or markAllAsRead".to_string(),
            )),
        }
    }
}

/// Mark the caller's notifications as read.
async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<MarkReadRequest>,
) -> AppResult<Success<Empty>> {
    let which = req.into_mark_read()?;
    let updated = state.notification_service.mark_read(&user.id, which).await?;
    tracing::debug!(user_id = %user.id, updated, "Notifications marked read");
    Ok(crate::response::ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).patch(mark_read))
        .route("/stream", get(sse::notification_stream))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_all_wins_over_ids() {
        let req = MarkReadRequest {
            notification_ids: Some(vec!["n1".to_string()]),
            mark_all_as_read: true,
        };
        assert!(matches!(req.into_mark_read().unwrap(), MarkRead::All));
    }

    #[test]
    fn test_mark_read_needs_a_target() {
        assert!(matches!(
            MarkReadRequest::default().into_mark_read(),
            Err(AppError::BadRequest(_))
        ));

        let req = MarkReadRequest {
            notification_ids: Some(vec!["n1".to_string(), "n2".to_string()]),
            mark_all_as_read: false,
        };
        assert!(matches!(req.into_mark_read().unwrap(), MarkRead::Ids(ids) if ids.len() == 2));
    }
}
