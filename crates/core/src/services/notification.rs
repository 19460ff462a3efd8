//! Notification service.

use chrono::{Duration, Utc};
use memehub_common::{AppResult, IdGenerator, PageRequest};
use memehub_db::{
    entities::{
        notification::{self, NotificationType},
        vote::VoteType,
    },
    repositories::{MemeRepository, NotificationKey, NotificationRepository, UserRepository},
};
use sea_orm::Set;

use crate::services::notification_hub::{HubEvent, NotificationHub};

/// Window in which an identical notification is not repeated.
const DEDUP_WINDOW_HOURS: i64 = 24;

/// What happened, from the receiver's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyEvent {
    /// Someone voted on the receiver's meme.
    Vote { meme_id: String, vote_type: VoteType },
    /// Someone commented on the receiver's meme.
    Comment { meme_id: String, comment_id: String },
    /// Someone followed the receiver.
    Follow,
    /// Someone shared the receiver's meme.
    Share { meme_id: String },
}

impl NotifyEvent {
    const fn notification_type(&self) -> NotificationType {
        match self {
            Self::Vote { .. } => NotificationType::Like,
            Self::Comment { .. } => NotificationType::Comment,
            Self::Follow => NotificationType::Follow,
            Self::Share { .. } => NotificationType::Share,
        }
    }

    fn meme_id(&self) -> Option<&str> {
        match self {
            Self::Vote { meme_id, .. } | Self::Comment { meme_id, .. } | Self::Share { meme_id } => {
                Some(meme_id)
            }
            Self::Follow => None,
        }
    }

    fn comment_id(&self) -> Option<&str> {
        match self {
            Self::Comment { comment_id, .. } => Some(comment_id),
            _ => None,
        }
    }
}

/// Render the human-readable notification text.
#[must_use]
pub fn render_message(sender_name: &str, event: &NotifyEvent, meme_title: Option<&str>) -> String {
    let title = meme_title.unwrap_or_default();
    match event {
        NotifyEvent::Vote {
            vote_type: VoteType::Upvote,
            ..
        } => format!("{sender_name} liked your meme \"{title}\""),
        NotifyEvent::Vote {
            vote_type: VoteType::Downvote,
            ..
        } => format!("{sender_name} disliked your meme \"{title}\""),
        NotifyEvent::Comment { .. } => format!("{sender_name} commented on your meme \"{title}\""),
        NotifyEvent::Follow => format!("{sender_name} started following you"),
        NotifyEvent::Share { .. } => format!("{sender_name} shared your meme \"{title}\""),
    }
}

/// Which notifications to mark as read.
#[derive(Debug, Clone)]
pub enum MarkRead {
    /// Only these IDs.
    Ids(Vec<String>),
    /// Everything the user has.
    All,
}

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    user_repo: UserRepository,
    meme_repo: MemeRepository,
    hub: NotificationHub,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(
        notification_repo: NotificationRepository,
        user_repo: UserRepository,
        meme_repo: MemeRepository,
        hub: NotificationHub,
    ) -> Self {
        Self {
            notification_repo,
            user_repo,
            meme_repo,
            hub,
            id_gen: IdGenerator::new(),
        }
    }

    /// Store a notification and push it to the receiver's open streams.
    ///
    /// Returns `None` when the notification was skipped: self-notifications
    /// and repeats of the same event within a day are never stored.
    pub async fn notify(
        &self,
        sender_id: &str,
        receiver_id: &str,
        event: NotifyEvent,
    ) -> AppResult<Option<notification::Model>> {
        if sender_id == receiver_id {
            return Ok(None);
        }

        let notification_type = event.notification_type();
        let key = NotificationKey {
            notification_type,
            sender_id,
            receiver_id,
            meme_id: event.meme_id(),
            comment_id: event.comment_id(),
        };
        let since = Utc::now() - Duration::hours(DEDUP_WINDOW_HOURS);
        if self
            .notification_repo
            .find_recent_duplicate(&key, since)
            .await?
            .is_some()
        {
            tracing::debug!(sender_id, receiver_id, ?notification_type, "Skipping duplicate notification");
            return Ok(None);
        }

        let sender = self.user_repo.get_by_id(sender_id).await?;
        let meme_title = match event.meme_id() {
            Some(meme_id) => Some(self.meme_repo.get_by_id(meme_id).await?.title),
            None => None,
        };
        let message = render_message(sender.shown_name(), &event, meme_title.as_deref());

        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            notification_type: Set(notification_type),
            message: Set(message),
            is_read: Set(false),
            sender_id: Set(Some(sender_id.to_string())),
            receiver_id: Set(receiver_id.to_string()),
            meme_id: Set(event.meme_id().map(ToString::to_string)),
            comment_id: Set(event.comment_id().map(ToString::to_string)),
            created_at: Set(Utc::now().into()),
        };

        let notification = self.notification_repo.create(model).await?;

        if !self
            .hub
            .publish(receiver_id, HubEvent::from(&notification))
            .await
        {
            tracing::trace!(receiver_id, "No open notification stream");
        }

        Ok(Some(notification))
    }

    /// Run [`Self::notify`] on a background task. Failures are only logged.
    pub fn notify_in_background(&self, sender_id: &str, receiver_id: &str, event: NotifyEvent) {
        let service = self.clone();
        let sender_id = sender_id.to_string();
        let receiver_id = receiver_id.to_string();

        tokio::spawn(async move {
            if let Err(e) = service.notify(&sender_id, &receiver_id, event).await {
                tracing::warn!(error = %e, %sender_id, %receiver_id, "Failed to create notification");
            }
        });
    }

    /// A page of the user's notifications, newest first, with the total.
    pub async fn list(
        &self,
        user_id: &str,
        page: &PageRequest,
        unread_only: bool,
    ) -> AppResult<(Vec<notification::Model>, u64)> {
        let items = self
            .notification_repo
            .find_by_receiver(user_id, unread_only, page.offset(), page.limit)
            .await?;
        let total = self
            .notification_repo
            .count_by_receiver(user_id, unread_only)
            .await?;
        Ok((items, total))
    }

    /// Count unread notifications.
    pub async fn unread_count(&self, user_id: &str) -> AppResult<u64> {
        self.notification_repo.count_by_receiver(user_id, true).await
    }

    /// Mark notifications as read. Returns the number of rows changed.
    pub async fn mark_read(&self, user_id: &str, which: MarkRead) -> AppResult<u64> {
        match which {
            MarkRead::Ids(ids) => self.notification_repo.mark_read(user_id, &ids).await,
            MarkRead::All => self.notification_repo.mark_all_read(user_id).await,
        }
    }
}
