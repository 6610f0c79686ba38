//! Database entities.

#![allow(missing_docs)]

pub mod announcement;
pub mod bookmark;
pub mod category;
pub mod category_notification;
pub mod content;
pub mod folder;
pub mod folder_attachment;
pub mod group;
pub mod group_user;
pub mod hot_content;
pub mod hot_group;
pub mod notification;
pub mod section;
pub mod section_notification;
pub mod user;

pub use announcement::Entity as Announcement;
pub use bookmark::Entity as Bookmark;
pub use category::Entity as Category;
pub use category_notification::Entity as CategoryNotification;
pub use content::Entity as Content;
pub use folder::Entity as Folder;
pub use folder_attachment::Entity as FolderAttachment;
pub use group::Entity as Group;
pub use group_user::Entity as GroupUser;
pub use hot_content::Entity as HotContent;
pub use hot_group::Entity as HotGroup;
pub use notification::Entity as Notification;
pub use section::Entity as Section;
pub use section_notification::Entity as SectionNotification;
pub use user::Entity as User;
