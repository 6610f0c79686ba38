//! Create `hot_group` and `hot_content` aggregate tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(HotGroup::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HotGroup::GroupId)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(HotGroup::VisitCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(HotGroup::JoinCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(HotGroup::Score)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(HotGroup::UpdatedAt)
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
                    .name("idx_hot_group_score")
                    .table(HotGroup::Table)
                    .col(HotGroup::Score)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(HotContent::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(HotContent::ContentId)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(HotContent::GroupId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(HotContent::VisitCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(HotContent::UpdatedAt)
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
                    .name("idx_hot_content_visit_count")
                    .table(HotContent::Table)
                    .col(HotContent::VisitCount)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(HotContent::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(HotGroup::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum HotGroup {
    Table,
    GroupId,
    VisitCount,
    JoinCount,
    Score,
    UpdatedAt,
}

#[derive(Iden)]
enum HotContent {
    Table,
    ContentId,
    GroupId,
    VisitCount,
    UpdatedAt,
}
