//! Core business logic for memehub.

pub mod services;

pub use services::*;
