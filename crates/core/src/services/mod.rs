//! Business logic services.

#![allow(missing_docs)]

pub mod comment;
pub mod discover;
pub mod email;
pub mod favorite;
pub mod follow;
pub mod imgflip;
pub mod meme;
pub mod notification;
pub mod notification_hub;
pub mod profile;
pub mod tag;
pub mod trending;
pub mod user;
pub mod verification;
pub mod view;
pub mod vote;

pub use comment::{CommentPage, CommentService, CommentView, MAX_COMMENT_LENGTH};
pub use discover::{DiscoverItem, DiscoverPage, DiscoverService, SourceCounts};
pub use email::{EmailMessage, EmailService};
pub use favorite::FavoriteService;
pub use follow::FollowService;
pub use imgflip::{
    ImgflipClient, ImgflipInfo, ImgflipTemplate, TemplatePage, TemplateSource,
    TemplateSourceService, TemplateView,
};
pub use meme::{
    ALLOWED_CONTENT_TYPES, FeedPage, FeedSort, MAX_UPLOAD_SIZE, MemeService, SearchPage,
    UploadMemeInput, feed_timeframe,
};
pub use notification::{MarkRead, NotificationService, NotifyEvent, render_message};
pub use notification_hub::{HubEvent, NotificationHub};
pub use profile::{Profile, ProfileService, ProfileUser};
pub use tag::{MAX_TAGS_PER_MEME, TagPage, TagService, TagSummary, normalize_names};
pub use trending::{Timeframe, TrendingPage, TrendingService};
pub use user::{RegisterInput, SignInInput, UserCounts, UserService, UserView};
pub use verification::VerificationService;
pub use view::{AuthorSummary, MemeCounts, MemeView, MemeViewBuilder};
pub use vote::{VoteAction, VoteOutcome, VoteService};
