//! Server-Sent Events for live notifications.

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use memehub_core::HubEvent;
use tokio_stream::StreamExt;

use crate::{extractors::AuthUser, middleware::AppState};

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

fn to_event(event: &HubEvent) -> Event {
    Event::default()
        .json_data(event)
        .unwrap_or_else(|_| Event::default().data("error"))
}

/// The caller's notification stream.
///
/// Opens with a `connected` event, then carries every notification stored
/// for the caller while the connection stays open. Events missed by a slow
/// client are dropped.
pub async fn notification_stream(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let user_id = user.id;
    let rx = state.hub.subscribe(&user_id).await;
    tracing::debug!(%user_id, "Notification stream opened");

    let stream = rx.filter_map(|result| match result {
        Ok(event) => Some(Ok(to_event(&event))),
        Err(e) => {
            tracing::debug!(error = %e, "Notification stream lagged");
            None
        }
    });

    let initial = stream::once(async { Ok(to_event(&HubEvent::Connected)) });

    Sse::new(initial.chain(stream)).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("ping"),
    )
}
