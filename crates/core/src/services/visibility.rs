//! Aggregate visibility rules.
//!
//! A public group is readable by anyone, members in any state included; its
//! public root sections and the content-bearing children beneath them are
//! readable too. A private group is readable by active members only. Active
//! members see every section of their group.

use huddle_common::{AppError, AppResult};
use huddle_db::entities::{category, group, group_user, section};
use huddle_db::repositories::GroupUserRepository;
use sea_orm::ConnectionTrait;
use tracing::debug;

use super::policy;

/// A caller resolved against one group.
#[derive(Debug, Clone, Default)]
pub struct Viewer {
    /// `None` for anonymous callers.
    pub user_id: Option<String>,
    /// The caller's membership row, in whatever state.
    pub membership: Option<group_user::Model>,
}

impl Viewer {
    /// Whether the caller holds an active role in the group.
    #[must_use]
    pub fn is_active_member(&self) -> bool {
        self.membership.as_ref().is_some_and(|m| m.role.is_active())
    }
}

/// Whether a caller with `membership` may read `group`.
#[must_use]
pub fn can_read_group(group: &group::Model, membership: Option<&group_user::Model>) -> bool {
    group.is_public || membership.is_some_and(|m| m.role.is_active())
}

/// Whether a section of a readable group is visible.
///
/// Children carry their parent's flag; outsiders only see the content-bearing ones.
#[must_use]
pub fn can_read_section(section: &section::Model, active_member: bool) -> bool {
    active_member
        || (section.is_public && (section.is_root() || section.section_type.bears_content()))
}

/// Whether a category of a readable group is visible.
#[must_use]
pub const fn can_read_category(category: &category::Model, active_member: bool) -> bool {
    active_member || category.is_public
}

/// Keep the sections `viewer` may see.
#[must_use]
pub fn visible_sections(sections: Vec<section::Model>, viewer: &Viewer) -> Vec<section::Model> {
    let active = viewer.is_active_member();
    sections
        .into_iter()
        .filter(|s| can_read_section(s, active))
        .collect()
}

/// Keep the categories `viewer` may see.
#[must_use]
pub fn visible_categories(
    categories: Vec<category::Model>,
    viewer: &Viewer,
) -> Vec<category::Model> {
    let active = viewer.is_active_member();
    categories
        .into_iter()
        .filter(|c| can_read_category(c, active))
        .collect()
}

/// Resolve an optional caller against `group`, failing with `Unauthorized`
/// when they may not read it. The group's existence is never hidden.
pub async fn authorize_read<C: ConnectionTrait>(
    conn: &C,
    group: &group::Model,
    subject: Option<&str>,
) -> AppResult<Viewer> {
    let viewer = match subject {
        Some(subject) => {
            let user = policy::caller(conn, subject).await?;
            let membership = GroupUserRepository::new(conn)
                .find_by_group_and_user(&group.id, &user.id)
                .await?;
            Viewer {
                user_id: Some(user.id),
                membership,
            }
        }
        None => Viewer::default(),
    };

    if !can_read_group(group, viewer.membership.as_ref()) {
        debug!(group_id = %group.id, user_id = ?viewer.user_id, "Private group read denied");
        return Err(AppError::Unauthorized(
            "This group is private to its members".to_string(),
        ));
    }

    Ok(viewer)
}

/// Fail with `Unauthorized` unless `viewer` may see `section`.
pub fn require_section(section: &section::Model, viewer: &Viewer) -> AppResult<()> {
    if can_read_section(section, viewer.is_active_member()) {
        Ok(())
    } else {
        Err(AppError::Unauthorized(
            "This section is private to members".to_string(),
        ))
    }
}
