//! Create meme table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Meme::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Meme::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Meme::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(Meme::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Meme::Description).text())
                    .col(ColumnDef::new(Meme::ImageUrl).string_len(1024).not_null())
                    .col(ColumnDef::new(Meme::StorageKey).string_len(256))
                    .col(ColumnDef::new(Meme::MemeType).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Meme::Upvotes)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Meme::Upvotes).gte(0)),
                    )
                    .col(
                        ColumnDef::new(Meme::Downvotes)
                            .integer()
                            .not_null()
                            .default(0)
                            .check(Expr::col(Meme::Downvotes).gte(0)),
                    )
                    .col(ColumnDef::new(Meme::Views).integer().not_null().default(0))
                    .col(ColumnDef::new(Meme::ShareCount).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Meme::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Meme::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meme_author")
                            .from(Meme::Table, Meme::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: author_id (profile pages)
        manager
            .create_index(
                Index::create()
                    .name("idx_meme_author_id")
                    .table(Meme::Table)
                    .col(Meme::AuthorId)
                    .to_owned(),
            )
            .await?;

        // Index: created_at (latest feed, trending window)
        manager
            .create_index(
                Index::create()
                    .name("idx_meme_created_at")
                    .table(Meme::Table)
                    .col(Meme::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: upvotes (popular feed)
        manager
            .create_index(
                Index::create()
                    .name("idx_meme_upvotes")
                    .table(Meme::Table)
                    .col(Meme::Upvotes)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Meme::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Meme {
    Table,
    Id,
    AuthorId,
    Title,
    Description,
    ImageUrl,
    StorageKey,
    MemeType,
    Upvotes,
    Downvotes,
    Views,
    ShareCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
