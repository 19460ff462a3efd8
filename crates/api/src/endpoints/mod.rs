//! API endpoints.

mod auth;
mod comments;
mod favorites;
mod imgflip;
mod memes;
mod notifications;
mod tags;
mod users;
mod votes;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/memes", memes::router())
        .nest("/tags", tags::router())
        .nest("/users", users::router())
        .nest("/notifications", notifications::router())
        .nest("/imgflip", imgflip::imgflip_router())
        .nest("/discover", imgflip::discover_router())
}
