//! Create group and `group_user` tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Group::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Group::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Group::CreatorId).string_len(32).not_null())
                    .col(ColumnDef::new(Group::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Group::ImageUrl).string_len(512))
                    .col(ColumnDef::new(Group::Description).text())
                    .col(
                        ColumnDef::new(Group::IsPublic)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Group::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Group::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_creator")
                            .from(Group::Table, Group::CreatorId)
                            .to(User::Table, User::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_name")
                    .table(Group::Table)
                    .col(Group::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_creator_id")
                    .table(Group::Table)
                    .col(Group::CreatorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GroupUser::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GroupUser::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GroupUser::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(GroupUser::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(GroupUser::Role).string_len(20).not_null())
                    .col(
                        ColumnDef::new(GroupUser::IsAccepted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(GroupUser::IsApproved)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(GroupUser::Name).string_len(128).not_null())
                    .col(
                        ColumnDef::new(GroupUser::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(GroupUser::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(GroupUser::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_user_group")
                            .from(GroupUser::Table, GroupUser::GroupId)
                            .to(Group::Table, Group::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_group_user_user")
                            .from(GroupUser::Table, GroupUser::UserId)
                            .to(User::Table, User::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // One membership per (group, user)
        manager
            .create_index(
                Index::create()
                    .name("idx_group_user_unique")
                    .table(GroupUser::Table)
                    .col(GroupUser::GroupId)
                    .col(GroupUser::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_user_name_unique")
                    .table(GroupUser::Table)
                    .col(GroupUser::GroupId)
                    .col(GroupUser::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_group_user_user_id")
                    .table(GroupUser::Table)
                    .col(GroupUser::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GroupUser::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Group::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Group {
    Table,
    Id,
    CreatorId,
    Name,
    ImageUrl,
    Description,
    IsPublic,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum GroupUser {
    Table,
    Id,
    GroupId,
    UserId,
    Role,
    IsAccepted,
    IsApproved,
    Name,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
