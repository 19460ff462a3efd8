//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationType {
    /// Up- or downvote on a meme
    #[sea_orm(string_value = "LIKE")]
    Like,
    #[sea_orm(string_value = "COMMENT")]
    Comment,
    #[sea_orm(string_value = "FOLLOW")]
    Follow,
    #[sea_orm(string_value = "MENTION")]
    Mention,
    #[sea_orm(string_value = "SHARE")]
    Share,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub notification_type: NotificationType,

    /// Rendered, human-readable text
    pub message: String,

    #[sea_orm(default_value = false)]
    pub is_read: bool,

    /// The user who triggered the notification
    #[sea_orm(nullable)]
    pub sender_id: Option<String>,

    /// The user receiving the notification
    pub receiver_id: String,

    #[sea_orm(nullable)]
    pub meme_id: Option<String>,

    #[sea_orm(nullable)]
    pub comment_id: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ReceiverId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Receiver,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SenderId",
        to = "super::user::Column::Id",
        on_delete = "SetNull"
    )]
    Sender,

    #[sea_orm(
        belongs_to = "super::meme::Entity",
        from = "Column::MemeId",
        to = "super::meme::Column::Id",
        on_delete = "SetNull"
    )]
    Meme,

    #[sea_orm(
        belongs_to = "super::comment::Entity",
        from = "Column::CommentId",
        to = "super::comment::Column::Id",
        on_delete = "SetNull"
    )]
    Comment,
}

impl ActiveModelBehavior for ActiveModel {}
