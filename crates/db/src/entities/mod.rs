//! Database entities.

pub mod comment;
pub mod favorite;
pub mod follow;
pub mod meme;
pub mod meme_tag;
pub mod notification;
pub mod tag;
pub mod user;
pub mod verification_token;
pub mod vote;

pub use comment::Entity as Comment;
pub use favorite::Entity as Favorite;
pub use follow::Entity as Follow;
pub use meme::Entity as Meme;
pub use meme_tag::Entity as MemeTag;
pub use notification::Entity as Notification;
pub use tag::Entity as Tag;
pub use user::Entity as User;
pub use verification_token::Entity as VerificationToken;
pub use vote::Entity as Vote;
