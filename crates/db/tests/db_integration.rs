//! Schema-level integration tests against an in-memory SQLite database.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use huddle_common::AppError;
use huddle_db::{
    UnitOfWork,
    entities::{group, group_user, group_user::GroupRole, user},
    migrate,
    migrations::Migrator,
    repositories::{GroupRepository, GroupUserRepository, UserRepository},
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, Set};
use sea_orm_migration::MigratorTrait;

async fn connect() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    migrate(&db).await.unwrap();
    db
}

fn new_user(id: &str, email: &str) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(id.to_string()),
        email: Set(email.to_string()),
        name: Set(id.to_string()),
        avatar_url: Set(None),
        password_hash: Set("x".to_string()),
        is_verified: Set(false),
        is_onboarded: Set(false),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

fn new_group(id: &str, creator: &str, name: &str) -> group::ActiveModel {
    group::ActiveModel {
        id: Set(id.to_string()),
        creator_id: Set(creator.to_string()),
        name: Set(name.to_string()),
        image_url: Set(None),
        description: Set(None),
        is_public: Set(true),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

fn new_member(id: &str, group_id: &str, user_id: &str, name: &str) -> group_user::ActiveModel {
    group_user::ActiveModel {
        id: Set(id.to_string()),
        group_id: Set(group_id.to_string()),
        user_id: Set(user_id.to_string()),
        role: Set(GroupRole::User),
        is_accepted: Set(true),
        is_approved: Set(true),
        name: Set(name.to_string()),
        version: Set(0),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

#[tokio::test]
async fn test_migrations_are_idempotent_and_reversible() {
    let db = connect().await;
    migrate(&db).await.unwrap();

    Migrator::down(&db, None).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let found = UserRepository::new(&db)
        .find_by_email("a@example.com")
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_unique_indexes_surface_as_conflicts() {
    let db = connect().await;
    let users = UserRepository::new(&db);
    users.create(new_user("u1", "a@example.com")).await.unwrap();
    users.create(new_user("u2", "b@example.com")).await.unwrap();

    let dup = users.create(new_user("u3", "a@example.com")).await;
    assert!(matches!(dup, Err(AppError::Conflict(_))));

    let groups = GroupRepository::new(&db);
    groups.create(new_group("g1", "u1", "Hikers")).await.unwrap();
    let dup = groups.create(new_group("g2", "u2", "Hikers")).await;
    assert!(matches!(dup, Err(AppError::Conflict(_))));

    let members = GroupUserRepository::new(&db);
    members
        .create(new_member("m1", "g1", "u1", "alpha"))
        .await
        .unwrap();

    let same_pair = members.create(new_member("m2", "g1", "u1", "beta")).await;
    assert!(matches!(same_pair, Err(AppError::Conflict(_))));

    let same_name = members.create(new_member("m3", "g1", "u2", "alpha")).await;
    assert!(matches!(same_name, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_stale_version_is_rejected() {
    let db = connect().await;
    UserRepository::new(&db)
        .create(new_user("u1", "a@example.com"))
        .await
        .unwrap();
    GroupRepository::new(&db)
        .create(new_group("g1", "u1", "Hikers"))
        .await
        .unwrap();

    let members = GroupUserRepository::new(&db);
    let read = members
        .create(new_member("m1", "g1", "u1", "alpha"))
        .await
        .unwrap();

    let first = members
        .update_state(&read, GroupRole::Manager, true, true)
        .await
        .unwrap();
    assert_eq!(first.version, 1);

    let stale = members
        .update_state(&read, GroupRole::Suspended, true, true)
        .await;
    assert!(matches!(stale, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_rolled_back_unit_of_work_leaves_no_rows() {
    let db = connect().await;

    let uow = UnitOfWork::begin(&db).await.unwrap();
    let result: Result<(), AppError> = async {
        UserRepository::new(uow.conn())
            .create(new_user("u1", "a@example.com"))
            .await?;
        Err(AppError::BadRequest("abort".to_string()))
    }
    .await;
    assert!(uow.finish(result).await.is_err());

    let found = UserRepository::new(&db)
        .find_by_email("a@example.com")
        .await
        .unwrap();
    assert!(found.is_none());
}
