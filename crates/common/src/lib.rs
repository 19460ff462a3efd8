//! Common utilities and shared types for memehub.
//!
//! This crate provides foundational components used across all memehub crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Pagination**: Offset paging parameters via [`PageRequest`]
//! - **Storage**: File storage backends for uploaded media
//!
//! # Example
//!
//! ```no_run
//! use memehub_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {}", id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod pagination;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use pagination::{MAX_PAGE, PageRequest, Pagination};
pub use storage::{
    LocalStorage, StorageBackend, StorageService, UploadedFile, generate_storage_key,
};
