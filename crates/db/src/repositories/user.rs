//! User repository.

use huddle_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::entities::{User, user};
use crate::{db_err, insert_err};

/// User repository for database operations.
pub struct UserRepository<'c, C> {
    conn: &'c C,
}

impl<'c, C: ConnectionTrait> UserRepository<'c, C> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id).one(self.conn).await.map_err(db_err)
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found: {id}")))
    }

    /// Find a user by email.
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Email.eq(email))
            .one(self.conn)
            .await
            .map_err(db_err)
    }

    /// Find a user by email, returning an error if not found.
    pub async fn get_by_email(&self, email: &str) -> AppResult<user::Model> {
        self.find_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found: {email}")))
    }

    /// Create a new user. A taken email is a conflict.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.conn)
            .await
            .map_err(|e| insert_err(e, "Email already registered"))
    }

    /// Update a user.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model.update(self.conn).await.map_err(db_err)
    }
}
