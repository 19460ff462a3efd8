//! Create tag and meme_tag tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tag::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tag::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Tag::Name).string_len(128).not_null())
                    .col(
                        ColumnDef::new(Tag::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tag_name")
                    .table(Tag::Table)
                    .col(Tag::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MemeTag::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MemeTag::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(MemeTag::MemeId).string_len(32).not_null())
                    .col(ColumnDef::new(MemeTag::TagId).string_len(32).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meme_tag_meme")
                            .from(MemeTag::Table, MemeTag::MemeId)
                            .to(Meme::Table, Meme::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meme_tag_tag")
                            .from(MemeTag::Table, MemeTag::TagId)
                            .to(Tag::Table, Tag::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (meme_id, tag_id) - a tag is attached once
        manager
            .create_index(
                Index::create()
                    .name("idx_meme_tag_meme_tag")
                    .table(MemeTag::Table)
                    .col(MemeTag::MemeId)
                    .col(MemeTag::TagId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meme_tag_tag_id")
                    .table(MemeTag::Table)
                    .col(MemeTag::TagId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MemeTag::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tag::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Tag {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(Iden)]
enum MemeTag {
    Table,
    Id,
    MemeId,
    TagId,
}

#[derive(Iden)]
enum Meme {
    Table,
    Id,
}
