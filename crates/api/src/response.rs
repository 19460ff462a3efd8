//! API response types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// A body tagged with `"success": true`.
///
/// The payload's fields sit next to the flag rather than under a key.
#[derive(Debug, Serialize)]
pub struct Success<T: Serialize> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

impl<T: Serialize> Success<T> {
    /// Wrap a payload.
    pub const fn new(body: T) -> Self {
        Self {
            success: true,
            body,
        }
    }
}

impl Success<Message> {
    /// A success carrying only a message.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(Message {
            message: message.into(),
        })
    }
}

impl<T: Serialize> IntoResponse for Success<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// A bare `message` field.
#[derive(Debug, Serialize)]
pub struct Message {
    /// Human-readable outcome.
    pub message: String,
}

/// Empty success response.
#[must_use]
pub fn ok() -> Success<Empty> {
    Success::new(Empty {})
}

/// Payload with no fields.
#[derive(Debug, Serialize)]
pub struct Empty {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_success_flattens_payload() {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Shared {
            share_count: i32,
        }

        let json = serde_json::to_value(Success::new(Shared { share_count: 3 })).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "shareCount": 3}));
    }

    #[test]
    fn test_empty_success() {
        let json = serde_json::to_value(ok()).unwrap();
        assert_eq!(json, serde_json::json!({"success": true}));
    }
}
