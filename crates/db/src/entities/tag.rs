//! Tag entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tag")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Lowercased, trimmed tag name
    #[sea_orm(unique)]
    pub name: String,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::meme_tag::Entity")]
    MemeTags,
}

impl Related<super::meme_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MemeTags.def()
    }
}

impl Related<super::meme::Entity> for Entity {
    fn to() -> RelationDef {
        super::meme_tag::Relation::Meme.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::meme_tag::Relation::Tag.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
