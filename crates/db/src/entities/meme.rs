//! Meme entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of media a meme carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum MemeType {
    #[sea_orm(string_value = "IMAGE")]
    Image,
    #[sea_orm(string_value = "GIF")]
    Gif,
    #[sea_orm(string_value = "VIDEO")]
    Video,
}

impl MemeType {
    /// Classify an upload by its MIME type.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type {
            "image/gif" => Some(Self::Gif),
            t if t.starts_with("image/") => Some(Self::Image),
            t if t.starts_with("video/") => Some(Self::Video),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "meme")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub author_id: String,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub image_url: String,

    /// Key in the storage backend, if the file is hosted locally
    pub storage_key: Option<String>,

    pub meme_type: MemeType,

    // Denormalized counters. Vote counters are rewritten from the vote table
    // on every vote, so they always match it.
    pub upvotes: i32,
    pub downvotes: i32,
    pub views: i32,
    pub share_count: i32,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(has_many = "super::vote::Entity")]
    Votes,

    #[sea_orm(has_many = "super::favorite::Entity")]
    Favorites,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::meme_tag::Entity")]
    MemeTags,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votes.def()
    }
}

impl Related<super::favorite::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Favorites.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::meme_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MemeTags.def()
    }
}

impl Related<super::tag::Entity> for Entity {
    fn to() -> RelationDef {
        super::meme_tag::Relation::Tag.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::meme_tag::Relation::Meme.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
