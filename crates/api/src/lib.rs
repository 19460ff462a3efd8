//! HTTP API layer for memehub.
//!
//! This crate provides the REST API and live notification delivery:
//!
//! - **Endpoints**: memes, votes, favorites, comments, tags, users, auth,
//!   notifications and template discovery
//! - **Extractors**: Authentication and paging parameters
//! - **Middleware**: Bearer token authentication and the shared [`AppState`]
//! - **Streaming**: Server-Sent Events for notifications
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod sse;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
