//! Create content, folder, bookmark, announcement and notification tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Content::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Content::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Content::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(Content::SectionId).string_len(32).not_null())
                    .col(ColumnDef::new(Content::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(Content::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Content::Body).text().not_null())
                    .col(
                        ColumnDef::new(Content::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Content::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_content_group")
                            .from(Content::Table, Content::GroupId)
                            .to(Group::Table, Group::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_content_section")
                            .from(Content::Table, Content::SectionId)
                            .to(Section::Table, Section::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_content_section_id")
                    .table(Content::Table)
                    .col(Content::SectionId)
                    .col(Content::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Folder::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Folder::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Folder::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(Folder::SectionId).string_len(32).not_null())
                    .col(ColumnDef::new(Folder::Name).string_len(128).not_null())
                    .col(
                        ColumnDef::new(Folder::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_folder_section")
                            .from(Folder::Table, Folder::SectionId)
                            .to(Section::Table, Section::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_folder_section_id")
                    .table(Folder::Table)
                    .col(Folder::SectionId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FolderAttachment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FolderAttachment::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FolderAttachment::FolderId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FolderAttachment::FileName)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(ColumnDef::new(FolderAttachment::Url).string_len(512).not_null())
                    .col(
                        ColumnDef::new(FolderAttachment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_folder_attachment_folder")
                            .from(FolderAttachment::Table, FolderAttachment::FolderId)
                            .to(Folder::Table, Folder::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_folder_attachment_folder_id")
                    .table(FolderAttachment::Table)
                    .col(FolderAttachment::FolderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Bookmark::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Bookmark::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Bookmark::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Bookmark::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(Bookmark::Kind).string_len(20).not_null())
                    .col(ColumnDef::new(Bookmark::TargetId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Bookmark::CreatedAt)
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
                    .name("idx_bookmark_unique")
                    .table(Bookmark::Table)
                    .col(Bookmark::UserId)
                    .col(Bookmark::Kind)
                    .col(Bookmark::TargetId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookmark_group_id")
                    .table(Bookmark::Table)
                    .col(Bookmark::GroupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Announcement::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Announcement::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Announcement::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(Announcement::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(Announcement::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Announcement::Body).text().not_null())
                    .col(
                        ColumnDef::new(Announcement::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_announcement_group")
                            .from(Announcement::Table, Announcement::GroupId)
                            .to(Group::Table, Group::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_announcement_group_id")
                    .table(Announcement::Table)
                    .col(Announcement::GroupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Notification::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Notification::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Notification::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Notification::GroupId).string_len(32).not_null())
                    .col(ColumnDef::new(Notification::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(Notification::ContentRef).string_len(32))
                    .col(
                        ColumnDef::new(Notification::IsRead)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Notification::CreatedAt)
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
                    .name("idx_notification_user_id")
                    .table(Notification::Table)
                    .col(Notification::UserId)
                    .col(Notification::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Notification::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Announcement::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Bookmark::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(FolderAttachment::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Folder::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Content::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Content {
    Table,
    Id,
    GroupId,
    SectionId,
    AuthorId,
    Title,
    Body,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Folder {
    Table,
    Id,
    GroupId,
    SectionId,
    Name,
    CreatedAt,
}

#[derive(Iden)]
enum FolderAttachment {
    Table,
    Id,
    FolderId,
    FileName,
    Url,
    CreatedAt,
}

#[derive(Iden)]
enum Bookmark {
    Table,
    Id,
    UserId,
    GroupId,
    Kind,
    TargetId,
    CreatedAt,
}

#[derive(Iden)]
enum Announcement {
    Table,
    Id,
    GroupId,
    AuthorId,
    Title,
    Body,
    CreatedAt,
}

#[derive(Iden)]
enum Notification {
    Table,
    Id,
    UserId,
    GroupId,
    Kind,
    ContentRef,
    IsRead,
    CreatedAt,
}

#[derive(Iden)]
enum Group {
    Table,
    Id,
}

#[derive(Iden)]
enum Section {
    Table,
    Id,
}
