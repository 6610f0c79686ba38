//! Business logic services.

#![allow(missing_docs)]

pub mod account;
pub mod announcement;
pub mod bookmark;
pub mod category;
pub mod content;
pub mod folder;
pub mod group;
pub mod membership;
pub mod notification;
pub mod policy;
pub mod preference;
pub mod ranking;
pub mod section;
pub mod visibility;

#[cfg(test)]
pub(crate) mod test_support;

pub use account::{AccountService, SignupInput, UpdateProfileInput};
pub use announcement::{AnnouncementService, CreateAnnouncementInput};
pub use bookmark::{BookmarkResponse, BookmarkService, BookmarkTarget};
pub use category::{CategoryService, CreateCategoryInput, UpdateCategoryInput};
pub use content::{ContentService, CreateContentInput};
pub use folder::{AddAttachmentInput, CreateFolderInput, FolderService};
pub use group::{CreateGroupInput, GroupResponse, GroupService, UpdateGroupInput};
pub use membership::{MembershipService, RenameMemberInput};
pub use notification::{
    NoOpNotificationSink, NotificationEvent, NotificationService, NotificationSink, SharedSink,
    StoredNotificationSink,
};
pub use preference::PreferenceService;
pub use ranking::{HotContentEntry, HotGroupEntry, RankingService};
pub use section::{CreateSectionInput, SectionService, UpdateSectionInput};
pub use visibility::Viewer;
