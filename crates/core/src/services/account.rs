//! Account service: signup, password login and profile.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use huddle_common::{AppError, AppResult, IdGenerator};
use huddle_db::entities::user;
use huddle_db::repositories::UserRepository;
use sea_orm::{DatabaseConnection, Set};
use serde::Deserialize;
use tracing::{debug, info};
use validator::Validate;

use super::policy;

/// Input for signing up.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(min = 8, max = 256))]
    pub password: String,
}

/// Input for updating one's profile.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    #[validate(url)]
    pub avatar_url: Option<String>,
}

/// Service for user accounts.
#[derive(Clone)]
pub struct AccountService {
    db: DatabaseConnection,
    id_gen: IdGenerator,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new account. A taken email is a conflict.
    pub async fn signup(&self, input: SignupInput) -> AppResult<user::Model> {
        input.validate()?;

        let users = UserRepository::new(&self.db);
        if users.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let user = users
            .create(user::ActiveModel {
                id: Set(self.id_gen.generate()),
                email: Set(input.email),
                name: Set(input.name),
                avatar_url: Set(None),
                password_hash: Set(hash_password(&input.password)?),
                is_verified: Set(false),
                is_onboarded: Set(false),
                created_at: Set(Utc::now().into()),
                updated_at: Set(None),
            })
            .await?;

        info!(user_id = %user.id, "Account created");
        Ok(user)
    }

    /// Check an email and password pair. Unknown emails and wrong passwords
    /// fail the same way.
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<user::Model> {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        let Some(user) = UserRepository::new(&self.db).find_by_email(email).await? else {
            debug!("Login for unknown email");
            return Err(invalid());
        };

        if !verify_password(password, &user.password_hash)? {
            debug!(user_id = %user.id, "Password mismatch");
            return Err(invalid());
        }

        Ok(user)
    }

    /// The caller's account.
    pub async fn me(&self, subject: &str) -> AppResult<user::Model> {
        policy::caller(&self.db, subject).await
    }

    /// Change the caller's display name or avatar.
    pub async fn update_profile(
        &self,
        subject: &str,
        input: UpdateProfileInput,
    ) -> AppResult<user::Model> {
        input.validate()?;

        let user = policy::caller(&self.db, subject).await?;
        let mut active: user::ActiveModel = user.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(avatar_url) = input.avatar_url {
            active.avatar_url = Set(Some(avatar_url));
        }
        active.updated_at = Set(Some(Utc::now().into()));

        UserRepository::new(&self.db).update(active).await
    }

    /// Record that the caller's email has been verified.
    pub async fn mark_verified(&self, subject: &str) -> AppResult<user::Model> {
        let user = policy::caller(&self.db, subject).await?;
        let mut active: user::ActiveModel = user.into();
        active.is_verified = Set(true);
        active.updated_at = Set(Some(Utc::now().into()));
        UserRepository::new(&self.db).update(active).await
    }

    /// Record that the caller finished onboarding.
    pub async fn complete_onboarding(&self, subject: &str) -> AppResult<user::Model> {
        let user = policy::caller(&self.db, subject).await?;
        let mut active: user::ActiveModel = user.into();
        active.is_onboarded = Set(true);
        active.updated_at = Set(Some(Utc::now().into()));
        UserRepository::new(&self.db).update(active).await
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
