//! In-process pub/sub for live notification delivery.
//!
//! Each user with at least one open stream owns a broadcast channel. Dropping
//! the stream drops its receiver; channels left without receivers are removed
//! on the next subscribe or [`NotificationHub::prune`].

use std::collections::HashMap;
use std::sync::Arc;

use memehub_db::entities::notification;
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tokio_stream::wrappers::BroadcastStream;

const CHANNEL_CAPACITY: usize = 100;

/// Event pushed to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HubEvent {
    /// A notification was stored for the user.
    #[serde(rename_all = "camelCase")]
    Notification {
        id: String,
        notification_type: notification::NotificationType,
        message: String,
        sender_id: Option<String>,
        meme_id: Option<String>,
        comment_id: Option<String>,
        created_at: String,
    },
    /// Stream opened.
    Connected,
}

impl From<&notification::Model> for HubEvent {
    fn from(n: &notification::Model) -> Self {
        Self::Notification {
            id: n.id.clone(),
            notification_type: n.notification_type,
            message: n.message.clone(),
            sender_id: n.sender_id.clone(),
            meme_id: n.meme_id.clone(),
            comment_id: n.comment_id.clone(),
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

/// Per-user broadcast channels, shared for the lifetime of the application.
#[derive(Clone, Default)]
pub struct NotificationHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<HubEvent>>>>,
}

impl NotificationHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a stream of events for `user_id`.
    pub async fn subscribe(&self, user_id: &str) -> BroadcastStream<HubEvent> {
        let mut channels = self.channels.write().await;
        channels.retain(|_, sender| sender.receiver_count() > 0);

        let receiver = match channels.get(user_id) {
            Some(sender) => sender.subscribe(),
            None => {
                let (sender, receiver) = broadcast::channel(CHANNEL_CAPACITY);
                channels.insert(user_id.to_string(), sender);
                receiver
            }
        };

        BroadcastStream::new(receiver)
    }

    /// Send an event to every open stream of `user_id`.
    ///
    /// Returns whether at least one stream received it.
    pub async fn publish(&self, user_id: &str, event: HubEvent) -> bool {
        let channels = self.channels.read().await;
        channels
            .get(user_id)
            .is_some_and(|sender| sender.send(event).is_ok())
    }

    /// Number of open streams for `user_id`.
    pub async fn subscriber_count(&self, user_id: &str) -> usize {
        self.channels
            .read()
            .await
            .get(user_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Drop channels nobody listens to anymore.
    pub async fn prune(&self) -> usize {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|_, sender| sender.receiver_count() > 0);
        before - channels.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let hub = NotificationHub::new();
        assert!(!hub.publish("u1", HubEvent::Connected).await);
    }

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let hub = NotificationHub::new();
        let mut stream = hub.subscribe("u1").await;

        assert!(hub.publish("u1", HubEvent::Connected).await);
        let event = stream.next().await.unwrap().unwrap();
        assert!(matches!(event, HubEvent::Connected));
    }

    #[tokio::test]
    async fn test_events_are_scoped_to_user() {
        let hub = NotificationHub::new();
        let _alice = hub.subscribe("alice").await;

        assert!(!hub.publish("bob", HubEvent::Connected).await);
    }

    #[tokio::test]
    async fn test_fan_out_to_multiple_streams() {
        let hub = NotificationHub::new();
        let mut first = hub.subscribe("u1").await;
        let mut second = hub.subscribe("u1").await;
        assert_eq!(hub.subscriber_count("u1").await, 2);

        hub.publish("u1", HubEvent::Connected).await;

        assert!(first.next().await.unwrap().is_ok());
        assert!(second.next().await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_dropping_stream_unsubscribes() {
        let hub = NotificationHub::new();
        let stream = hub.subscribe("u1").await;
        drop(stream);

        assert_eq!(hub.subscriber_count("u1").await, 0);
        assert_eq!(hub.prune().await, 1);
        assert!(!hub.publish("u1", HubEvent::Connected).await);
    }

    #[test]
    fn test_event_serialization() {
        let event = HubEvent::Notification {
            id: "n1".to_string(),
            notification_type: notification::NotificationType::Like,
            message: "alice liked your meme \"cat\"".to_string(),
            sender_id: Some("u1".to_string()),
            meme_id: Some("m1".to_string()),
            comment_id: None,
            created_at: "2025-01-01T00:00:00+00:00".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"notification\""));
        assert!(json.contains("\"notificationType\":\"LIKE\""));
        assert!(json.contains("\"memeId\":\"m1\""));
    }
}
