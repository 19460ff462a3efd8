//! Database repositories.

pub mod comment;
pub mod favorite;
pub mod follow;
pub mod meme;
pub mod notification;
pub mod tag;
pub mod trending;
pub mod user;
pub mod verification_token;
pub mod vote;

pub use comment::CommentRepository;
pub use favorite::FavoriteRepository;
pub use follow::FollowRepository;
pub use meme::{MemeRepository, VoteCounters};
pub use notification::{NotificationKey, NotificationRepository};
pub use tag::TagRepository;
pub use trending::{TrendingMeme, TrendingRepository};
pub use user::UserRepository;
pub use verification_token::VerificationTokenRepository;
pub use vote::VoteRepository;
