//! Repositories.
//!
//! Every repository borrows a connection. Build them over a pooled
//! [`DatabaseConnection`](sea_orm::DatabaseConnection) for single statements,
//! or over [`UnitOfWork::conn`](crate::UnitOfWork::conn) so several writes
//! commit together.

mod announcement;
mod bookmark;
mod category;
mod content;
mod folder;
mod group;
mod group_user;
mod notification;
mod preference;
mod ranking;
mod section;
mod user;

pub use announcement::AnnouncementRepository;
pub use bookmark::BookmarkRepository;
pub use category::CategoryRepository;
pub use content::ContentRepository;
pub use folder::FolderRepository;
pub use group::GroupRepository;
pub use group_user::GroupUserRepository;
pub use notification::NotificationRepository;
pub use preference::{PreferenceRepository, PreferenceScope};
pub use ranking::RankingRepository;
pub use section::SectionRepository;
pub use user::UserRepository;
