//! Role policy.
//!
//! The predicates are pure functions over [`GroupRole`]. The `require_*`
//! helpers load the caller's membership and turn a failed predicate into
//! [`AppError::Unauthorized`], which callers keep distinct from `NotFound`.

use huddle_common::{AppError, AppResult};
use huddle_db::entities::group_user::{self, GroupRole};
use huddle_db::entities::user;
use huddle_db::repositories::{GroupUserRepository, UserRepository};
use sea_orm::ConnectionTrait;
use tracing::debug;

/// Baseline access to group-scoped resources of a private group.
#[must_use]
pub const fn is_active(role: GroupRole) -> bool {
    role.is_active()
}

/// Announcement and moderation rights.
#[must_use]
pub const fn is_admin(role: GroupRole) -> bool {
    role.is_admin()
}

/// Category, section and group mutation rights.
#[must_use]
pub const fn is_top_admin(role: GroupRole) -> bool {
    role.is_top_admin()
}

/// Whether `actor` may change the role of a member currently holding `target`.
///
/// Only admins change roles, and a manager never acts on another admin.
#[must_use]
pub const fn can_update_role(actor: GroupRole, target: GroupRole) -> bool {
    actor.is_admin() && (actor.is_top_admin() || !target.is_admin())
}

/// Whether `actor` may expel a member currently holding `target`.
///
/// The target must be strictly junior, so the top manager is never removable.
#[must_use]
pub const fn can_remove(actor: GroupRole, target: GroupRole) -> bool {
    actor.is_admin() && target.rank() < actor.rank()
}

/// Roles a role update may assign. The top manager role only moves by ownership transfer.
#[must_use]
pub const fn is_assignable(role: GroupRole) -> bool {
    matches!(role, GroupRole::Manager | GroupRole::User | GroupRole::Suspended)
}

// ==================== Guards ====================

/// Resolve the caller's subject (their verified email) to a user.
pub async fn caller<C: ConnectionTrait>(conn: &C, subject: &str) -> AppResult<user::Model> {
    UserRepository::new(conn).get_by_email(subject).await
}

/// Load the caller's membership, failing with `Unauthorized` when there is none.
pub async fn membership<C: ConnectionTrait>(
    conn: &C,
    group_id: &str,
    user_id: &str,
) -> AppResult<group_user::Model> {
    GroupUserRepository::new(conn)
        .find_by_group_and_user(group_id, user_id)
        .await?
        .ok_or_else(|| {
            debug!(group_id, user_id, "Caller is not a member");
            AppError::Unauthorized("Not a member of this group".to_string())
        })
}

/// Caller's membership, which must hold an active role.
pub async fn require_active<C: ConnectionTrait>(
    conn: &C,
    group_id: &str,
    user_id: &str,
) -> AppResult<group_user::Model> {
    require(conn, group_id, user_id, is_active, "Membership is not active").await
}

/// Caller's membership, which must hold an admin role.
pub async fn require_admin<C: ConnectionTrait>(
    conn: &C,
    group_id: &str,
    user_id: &str,
) -> AppResult<group_user::Model> {
    require(conn, group_id, user_id, is_admin, "Manager role required").await
}

/// Caller's membership, which must be the top manager.
pub async fn require_top_admin<C: ConnectionTrait>(
    conn: &C,
    group_id: &str,
    user_id: &str,
) -> AppResult<group_user::Model> {
    require(conn, group_id, user_id, is_top_admin, "Top manager role required").await
}

async fn require<C: ConnectionTrait>(
    conn: &C,
    group_id: &str,
    user_id: &str,
    allowed: fn(GroupRole) -> bool,
    message: &str,
) -> AppResult<group_user::Model> {
    let member = membership(conn, group_id, user_id).await?;

    if !allowed(member.role) {
        debug!(group_id, user_id, role = ?member.role, "Role guard failed");
        return Err(AppError::Unauthorized(message.to_string()));
    }

    Ok(member)
}
