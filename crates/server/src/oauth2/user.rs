//! User authenticator and account maintenance.

use crate::entity::oauth_user;
use crate::error::OAuthError;
use crate::oauth2::OAuth2State;
use crate::oauth2::password::SecretHash;
use sea_orm::{ActiveValue::Set, ColumnTrait, Condition, IntoActiveModel};

pub const MIN_PASSWORD_LENGTH: usize = 6;

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl OAuth2State {
    /// Case-insensitive lookup by email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<oauth_user::Model, OAuthError> {
        self.store
            .users()
            .find_one(Condition::all().add(oauth_user::Column::Email.eq(normalize_email(email))))
            .await?
            .ok_or(OAuthError::UserNotFound)
    }

    pub async fn find_user_by_id(&self, id: &str) -> Result<oauth_user::Model, OAuthError> {
        self.store
            .users()
            .find_one(Condition::all().add(oauth_user::Column::Id.eq(id)))
            .await?
            .ok_or(OAuthError::UserNotFound)
    }

    pub async fn user_exists(&self, email: &str) -> Result<bool, OAuthError> {
        match self.find_user_by_email(email).await {
            Ok(_) => Ok(true),
            Err(OAuthError::UserNotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Check an email and password. Callers outside this module collapse the
    /// individual failures with [`OAuthError::into_user_error`].
    #[tracing::instrument(skip(self, password))]
    pub async fn auth_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<oauth_user::Model, OAuthError> {
        let user = self.find_user_by_email(email).await?;
        let Some(hash) = user.password.clone() else {
            return Err(OAuthError::UserPasswordNotSet);
        };
        if !SecretHash::from(hash)
            .matches_blocking(password.to_string())
            .await?
        {
            return Err(OAuthError::InvalidUserPassword);
        }
        Ok(user)
    }

    /// Create a user. An empty password creates a password-less account.
    #[tracing::instrument(skip(self, password))]
    pub async fn create_user(
        &self,
        role_id: &str,
        email: &str,
        password: &str,
    ) -> Result<oauth_user::Model, OAuthError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(OAuthError::CannotSetEmptyUsername);
        }
        if self.user_exists(&email).await? {
            return Err(OAuthError::UsernameTaken);
        }
        let password = self.hash_new_password(password).await?;

        let now = self.now();
        let user = self
            .store
            .users()
            .insert(oauth_user::ActiveModel {
                id: Set(Self::generate_id()),
                role_id: Set(role_id.to_string()),
                email: Set(email),
                password: Set(password),
                created_at: Set(now),
                updated_at: Set(now),
            })
            .await?;
        tracing::info!(user_id = %user.id, role = %user.role_id, "Created user");
        Ok(user)
    }

    pub async fn set_password(
        &self,
        user: &oauth_user::Model,
        password: &str,
    ) -> Result<oauth_user::Model, OAuthError> {
        let password = self.hash_new_password(password).await?;
        let mut active = user.clone().into_active_model();
        active.password = Set(password);
        active.updated_at = Set(self.now());
        Ok(self.store.users().update(active).await?)
    }

    pub async fn update_email(
        &self,
        user: &oauth_user::Model,
        email: &str,
    ) -> Result<oauth_user::Model, OAuthError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(OAuthError::CannotSetEmptyUsername);
        }
        if email != user.email && self.user_exists(&email).await? {
            return Err(OAuthError::UsernameTaken);
        }
        let mut active = user.clone().into_active_model();
        active.email = Set(email);
        active.updated_at = Set(self.now());
        Ok(self.store.users().update(active).await?)
    }

    async fn hash_new_password(&self, password: &str) -> Result<Option<String>, OAuthError> {
        if password.is_empty() {
            return Ok(None);
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(OAuthError::PasswordTooShort(MIN_PASSWORD_LENGTH));
        }
        let hash = SecretHash::compute_blocking(password.to_string()).await?;
        Ok(Some(hash.into_string()))
    }
}
