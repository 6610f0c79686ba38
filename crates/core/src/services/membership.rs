//! Membership lifecycle.
//!
//! ```text
//! (none) --join request--> PENDING --approve--> USER <--> MANAGER
//! (none) --invitation----> INVITED --accept---> USER
//! USER | MANAGER --suspend--> SUSPENDED --restore--> USER | MANAGER
//! any row except the top manager --remove | leave--> (none)
//! ```
//!
//! Every transition runs in one unit of work. Notifications go out after commit.

use std::sync::Arc;

use chrono::Utc;
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::UnitOfWork;
use huddle_db::entities::category_notification::NotificationSetting;
use huddle_db::entities::group_user::{self, GroupRole};
use huddle_db::entities::notification::NotificationKind;
use huddle_db::repositories::{
    GroupRepository, GroupUserRepository, PreferenceRepository, UserRepository,
};
use sea_orm::{ConnectionTrait, DatabaseConnection, Set};
use serde::Deserialize;
use tracing::{debug, info};
use validator::Validate;

use super::notification::{NotificationEvent, NotificationSink, dispatch};
use super::ranking::RankingService;
use super::{policy, preference, visibility};

/// Input for renaming oneself inside a group.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RenameMemberInput {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
}

/// Service driving the membership state machine.
#[derive(Clone)]
pub struct MembershipService {
    db: DatabaseConnection,
    sink: Arc<dyn NotificationSink>,
    ranking: RankingService,
    id_gen: IdGenerator,
}

impl MembershipService {
    /// Create a new membership service.
    #[must_use]
    pub const fn new(
        db: DatabaseConnection,
        sink: Arc<dyn NotificationSink>,
        ranking: RankingService,
    ) -> Self {
        Self {
            db,
            sink,
            ranking,
            id_gen: IdGenerator::new(),
        }
    }

    // ==================== Entry ====================

    /// Ask to join a group. The new row is `PENDING` until an admin approves it.
    pub async fn request_join(&self, subject: &str, group_id: &str) -> AppResult<group_user::Model> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let member = self
                .create_row(uow.conn(), group_id, &user.id, &user.name, GroupRole::Pending)
                .await?;
            let admins = admins_of(uow.conn(), group_id).await?;
            Ok((member, admins))
        }
        .await;
        let (member, admins) = uow.finish(result).await?;

        info!(group_id, user_id = %member.user_id, "Join requested");

        let events = admins
            .into_iter()
            .map(|admin| {
                NotificationEvent::new(
                    admin.user_id,
                    group_id,
                    NotificationKind::JoinRequested,
                    Some(member.id.clone()),
                )
            })
            .collect();
        dispatch(self.sink.as_ref(), events).await;

        Ok(member)
    }

    /// Invite a user by email. Only admins invite; the row is `INVITED` until accepted.
    pub async fn invite(
        &self,
        subject: &str,
        group_id: &str,
        invitee_email: &str,
    ) -> AppResult<group_user::Model> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            GroupRepository::new(uow.conn()).get_by_id(group_id).await?;
            policy::require_admin(uow.conn(), group_id, &user.id).await?;
            let invitee = UserRepository::new(uow.conn())
                .get_by_email(invitee_email)
                .await?;
            self.create_row(uow.conn(), group_id, &invitee.id, &invitee.name, GroupRole::Invited)
                .await
        }
        .await;
        let member = uow.finish(result).await?;

        info!(group_id, user_id = %member.user_id, "Member invited");
        dispatch(
            self.sink.as_ref(),
            vec![NotificationEvent::new(
                member.user_id.clone(),
                group_id,
                NotificationKind::Invited,
                None,
            )],
        )
        .await;

        Ok(member)
    }

    async fn create_row<C: ConnectionTrait>(
        &self,
        conn: &C,
        group_id: &str,
        user_id: &str,
        name: &str,
        role: GroupRole,
    ) -> AppResult<group_user::Model> {
        GroupRepository::new(conn).get_by_id(group_id).await?;

        let members = GroupUserRepository::new(conn);
        if members.find_by_group_and_user(group_id, user_id).await?.is_some() {
            debug!(group_id, user_id, "Membership already exists");
            return Err(AppError::Conflict(
                "User already has a membership in this group".to_string(),
            ));
        }

        let model = group_user::ActiveModel {
            id: Set(self.id_gen.generate()),
            group_id: Set(group_id.to_string()),
            user_id: Set(user_id.to_string()),
            role: Set(role),
            is_accepted: Set(false),
            is_approved: Set(false),
            name: Set(name.to_string()),
            version: Set(0),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        // The unique index re-checks at commit against a racing request
        members.create(model).await
    }

    // ==================== Activation ====================

    /// Accept one's own invitation.
    pub async fn accept_invitation(
        &self,
        subject: &str,
        group_id: &str,
    ) -> AppResult<group_user::Model> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let member = GroupUserRepository::new(uow.conn())
                .get_by_group_and_user(group_id, &user.id)
                .await?;

            if member.role != GroupRole::Invited {
                return Err(AppError::BadRequest(
                    "No pending invitation to accept".to_string(),
                ));
            }

            let accepted = GroupUserRepository::new(uow.conn())
                .update_state(&member, GroupRole::User, true, member.is_approved)
                .await?;
            preference::bulk_update(uow.conn(), group_id, &accepted.id, NotificationSetting::All)
                .await?;
            Ok(accepted)
        }
        .await;
        let member = uow.finish(result).await?;

        info!(group_id, user_id = %member.user_id, "Invitation accepted");
        self.ranking.record_join(group_id).await;

        Ok(member)
    }

    /// Approve a join request. Approval also marks the row accepted.
    pub async fn approve(
        &self,
        subject: &str,
        group_id: &str,
        membership_id: &str,
    ) -> AppResult<group_user::Model> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            GroupRepository::new(uow.conn()).get_by_id(group_id).await?;
            policy::require_admin(uow.conn(), group_id, &user.id).await?;
            let target = target_in_group(uow.conn(), group_id, membership_id).await?;

            if target.role != GroupRole::Pending {
                return Err(AppError::BadRequest(
                    "Membership has no pending join request".to_string(),
                ));
            }

            let approved = GroupUserRepository::new(uow.conn())
                .update_state(&target, GroupRole::User, true, true)
                .await?;
            preference::bulk_update(uow.conn(), group_id, &approved.id, NotificationSetting::All)
                .await?;
            Ok(approved)
        }
        .await;
        let member = uow.finish(result).await?;

        info!(group_id, user_id = %member.user_id, "Join request approved");
        self.ranking.record_join(group_id).await;
        dispatch(
            self.sink.as_ref(),
            vec![NotificationEvent::new(
                member.user_id.clone(),
                group_id,
                NotificationKind::JoinApproved,
                None,
            )],
        )
        .await;

        Ok(member)
    }

    // ==================== Role Changes ====================

    /// Change another member's role.
    ///
    /// Suspension mutes the member everywhere in the group; restoring an
    /// active role turns notifications back on.
    pub async fn update_role(
        &self,
        subject: &str,
        group_id: &str,
        membership_id: &str,
        new_role: GroupRole,
    ) -> AppResult<group_user::Model> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            GroupRepository::new(uow.conn()).get_by_id(group_id).await?;
            let actor = policy::require_active(uow.conn(), group_id, &user.id).await?;
            let target = target_in_group(uow.conn(), group_id, membership_id).await?;

            if actor.id == target.id {
                return Err(AppError::Unauthorized(
                    "Cannot change your own role".to_string(),
                ));
            }
            if !policy::can_update_role(actor.role, target.role) {
                debug!(group_id, actor = ?actor.role, target = ?target.role, "Role update denied");
                return Err(AppError::Unauthorized(
                    "Insufficient role to change this member".to_string(),
                ));
            }
            if !policy::is_assignable(new_role) {
                return Err(AppError::BadRequest(format!(
                    "Role {new_role:?} cannot be assigned"
                )));
            }
            if matches!(target.role, GroupRole::Pending | GroupRole::Invited) {
                return Err(AppError::BadRequest(
                    "Membership has not been approved or accepted yet".to_string(),
                ));
            }
            if new_role == target.role {
                return Ok((target, None));
            }

            let updated = GroupUserRepository::new(uow.conn())
                .update_state(&target, new_role, target.is_accepted, target.is_approved)
                .await?;

            let cascade = if new_role == GroupRole::Suspended {
                Some(NotificationSetting::None)
            } else if target.role == GroupRole::Suspended {
                Some(NotificationSetting::All)
            } else {
                None
            };
            if let Some(setting) = cascade {
                preference::bulk_update(uow.conn(), group_id, &updated.id, setting).await?;
            }

            Ok((updated, Some(target.role)))
        }
        .await;
        let (member, previous) = uow.finish(result).await?;

        if let Some(previous) = previous {
            info!(group_id, user_id = %member.user_id, from = ?previous, to = ?member.role, "Role updated");
        }

        Ok(member)
    }

    // ==================== Exit ====================

    /// Expel a strictly junior member. Rejecting a join request or withdrawing
    /// an invitation is the same operation.
    pub async fn remove(&self, subject: &str, group_id: &str, membership_id: &str) -> AppResult<()> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let group = GroupRepository::new(uow.conn()).get_by_id(group_id).await?;
            let actor = policy::require_active(uow.conn(), group_id, &user.id).await?;
            let target = target_in_group(uow.conn(), group_id, membership_id).await?;

            if target.user_id == group.creator_id || !policy::can_remove(actor.role, target.role) {
                debug!(group_id, actor = ?actor.role, target = ?target.role, "Removal denied");
                return Err(AppError::Unauthorized(
                    "Insufficient role to remove this member".to_string(),
                ));
            }

            delete_membership(uow.conn(), &target.id).await?;
            Ok(target)
        }
        .await;
        let target = uow.finish(result).await?;

        info!(group_id, user_id = %target.user_id, role = ?target.role, "Member removed");
        Ok(())
    }

    /// Leave a group. Also declines an invitation or withdraws a join request.
    /// The owner never leaves; ownership must be transferred first.
    pub async fn leave(&self, subject: &str, group_id: &str) -> AppResult<()> {
        let uow = UnitOfWork::begin(&self.db).await?;
        let result: AppResult<_> = async {
            let user = policy::caller(uow.conn(), subject).await?;
            let group = GroupRepository::new(uow.conn()).get_by_id(group_id).await?;
            let member = GroupUserRepository::new(uow.conn())
                .get_by_group_and_user(group_id, &user.id)
                .await?;

            if member.role.is_top_admin() || group.creator_id == user.id {
                return Err(AppError::Unauthorized(
                    "The owner cannot leave the group; transfer ownership first".to_string(),
                ));
            }

            delete_membership(uow.conn(), &member.id).await?;
            Ok(member)
        }
        .await;
        let member = uow.finish(result).await?;

        info!(group_id, user_id = %member.user_id, "Member left");
        Ok(())
    }

    // ==================== Queries ====================

    /// Active members of a group, readable by whoever may read the group.
    pub async fn list_members(
        &self,
        subject: Option<&str>,
        group_id: &str,
    ) -> AppResult<Vec<group_user::Model>> {
        let group = GroupRepository::new(&self.db).get_by_id(group_id).await?;
        visibility::authorize_read(&self.db, &group, subject).await?;
        GroupUserRepository::new(&self.db)
            .find_active_by_group(group_id)
            .await
    }

    /// Open join requests and invitations of a group. Admins only.
    pub async fn list_pending(
        &self,
        subject: &str,
        group_id: &str,
    ) -> AppResult<Vec<group_user::Model>> {
        let user = policy::caller(&self.db, subject).await?;
        GroupRepository::new(&self.db).get_by_id(group_id).await?;
        policy::require_admin(&self.db, group_id, &user.id).await?;

        let members = GroupUserRepository::new(&self.db);
        let mut pending = members
            .find_by_group_and_role(group_id, GroupRole::Pending)
            .await?;
        pending.extend(
            members
                .find_by_group_and_role(group_id, GroupRole::Invited)
                .await?,
        );
        Ok(pending)
    }

    /// Every membership of the caller, in any state.
    pub async fn my_memberships(&self, subject: &str) -> AppResult<Vec<group_user::Model>> {
        let user = policy::caller(&self.db, subject).await?;
        GroupUserRepository::new(&self.db)
            .find_by_user(&user.id)
            .await
    }

    /// Change the caller's display name inside a group.
    pub async fn rename(
        &self,
        subject: &str,
        group_id: &str,
        input: RenameMemberInput,
    ) -> AppResult<group_user::Model> {
        input.validate()?;

        let user = policy::caller(&self.db, subject).await?;
        let members = GroupUserRepository::new(&self.db);
        let member = members.get_by_group_and_user(group_id, &user.id).await?;

        let mut active: group_user::ActiveModel = member.into();
        active.name = Set(input.name);
        active.updated_at = Set(Some(Utc::now().into()));
        members.update(active).await
    }
}

/// Load a membership and check it belongs to `group_id`.
async fn target_in_group<C: ConnectionTrait>(
    conn: &C,
    group_id: &str,
    membership_id: &str,
) -> AppResult<group_user::Model> {
    let target = GroupUserRepository::new(conn).get_by_id(membership_id).await?;
    if target.group_id != group_id {
        return Err(AppError::NotFound(format!(
            "Membership not found: {membership_id}"
        )));
    }
    Ok(target)
}

/// Delete a membership together with its preference rows.
pub(crate) async fn delete_membership<C: ConnectionTrait>(
    conn: &C,
    group_user_id: &str,
) -> AppResult<()> {
    PreferenceRepository::new(conn)
        .delete_for_member(group_user_id)
        .await?;
    GroupUserRepository::new(conn).delete(group_user_id).await
}

async fn admins_of<C: ConnectionTrait>(
    conn: &C,
    group_id: &str,
) -> AppResult<Vec<group_user::Model>> {
    Ok(GroupUserRepository::new(conn)
        .find_active_by_group(group_id)
        .await?
        .into_iter()
        .filter(|m| m.role.is_admin())
        .collect())
}
