//! Create category and section tables with their notification preference tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Category::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Category::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Category::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(Category::ParentId).string_len(32))
                    .col(ColumnDef::new(Category::Name).string_len(128).not_null())
                    .col(
                        ColumnDef::new(Category::IsPublic)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Category::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Category::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_category_group")
                            .from(Category::Table, Category::GroupId)
                            .to(Group::Table, Group::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_category_parent")
                            .from(Category::Table, Category::ParentId)
                            .to(Category::Table, Category::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_category_group_id")
                    .table(Category::Table)
                    .col(Category::GroupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_category_parent_id")
                    .table(Category::Table)
                    .col(Category::ParentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Section::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Section::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Section::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(Section::ParentId).string_len(32))
                    .col(ColumnDef::new(Section::Name).string_len(128).not_null())
                    .col(ColumnDef::new(Section::SectionType).string_len(20).not_null())
                    .col(
                        ColumnDef::new(Section::IsPublic)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Section::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Section::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_section_group")
                            .from(Section::Table, Section::GroupId)
                            .to(Group::Table, Group::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_section_parent")
                            .from(Section::Table, Section::ParentId)
                            .to(Section::Table, Section::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_section_group_id")
                    .table(Section::Table)
                    .col(Section::GroupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_section_parent_id")
                    .table(Section::Table)
                    .col(Section::ParentId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CategoryNotification::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CategoryNotification::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(CategoryNotification::CategoryId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CategoryNotification::GroupUserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CategoryNotification::Setting)
                            .string_len(16)
                            .not_null()
                            .default("all"),
                    )
                    .col(
                        ColumnDef::new(CategoryNotification::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_category_notification_category")
                            .from(CategoryNotification::Table, CategoryNotification::CategoryId)
                            .to(Category::Table, Category::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_category_notification_group_user")
                            .from(CategoryNotification::Table, CategoryNotification::GroupUserId)
                            .to(GroupUser::Table, GroupUser::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_category_notification_unique")
                    .table(CategoryNotification::Table)
                    .col(CategoryNotification::CategoryId)
                    .col(CategoryNotification::GroupUserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SectionNotification::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SectionNotification::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SectionNotification::SectionId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SectionNotification::GroupUserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SectionNotification::Setting)
                            .string_len(16)
                            .not_null()
                            .default("all"),
                    )
                    .col(
                        ColumnDef::new(SectionNotification::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_section_notification_section")
                            .from(SectionNotification::Table, SectionNotification::SectionId)
                            .to(Section::Table, Section::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_section_notification_group_user")
                            .from(SectionNotification::Table, SectionNotification::GroupUserId)
                            .to(GroupUser::Table, GroupUser::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_section_notification_unique")
                    .table(SectionNotification::Table)
                    .col(SectionNotification::SectionId)
                    .col(SectionNotification::GroupUserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SectionNotification::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(CategoryNotification::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Section::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Category::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Category {
    Table,
    Id,
    GroupId,
    ParentId,
    Name,
    IsPublic,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Section {
    Table,
    Id,
    GroupId,
    ParentId,
    Name,
    SectionType,
    IsPublic,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum CategoryNotification {
    Table,
    Id,
    CategoryId,
    GroupUserId,
    Setting,
    UpdatedAt,
}

#[derive(Iden)]
enum SectionNotification {
    Table,
    Id,
    SectionId,
    GroupUserId,
    Setting,
    UpdatedAt,
}

#[derive(Iden)]
enum Group {
    Table,
    Id,
}

#[derive(Iden)]
enum GroupUser {
    Table,
    Id,
}
