//! Token lifecycle engine: access tokens, refresh tokens and the composite
//! login used by every user-facing grant.

use crate::entity::{oauth_access_token, oauth_client, oauth_refresh_token, oauth_user};
use crate::error::OAuthError;
use crate::oauth2::OAuth2State;
use crate::oauth2::secret::secrets_match;
use crate::store::Repository;
use sea_orm::{ActiveValue::Set, ColumnTrait, Condition, IntoActiveModel};
use time::Duration;

/// Identifiers a cookie session holds for the logged-in principal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrincipalKey<'a> {
    pub client_id: &'a str,
    pub user_id: Option<&'a str>,
}

/// `client_id = ? AND (user_id = ? | user_id IS NULL)`.
fn principal_filter<C: ColumnTrait>(
    client_column: C,
    user_column: C,
    client_id: &str,
    user_id: Option<&str>,
) -> Condition {
    let filter = Condition::all().add(client_column.eq(client_id));
    match user_id {
        Some(user_id) => filter.add(user_column.eq(user_id)),
        None => filter.add(user_column.is_null()),
    }
}

fn access_filter(client_id: &str, user_id: Option<&str>) -> Condition {
    principal_filter(
        oauth_access_token::Column::ClientId,
        oauth_access_token::Column::UserId,
        client_id,
        user_id,
    )
}

fn refresh_filter(client_id: &str, user_id: Option<&str>) -> Condition {
    principal_filter(
        oauth_refresh_token::Column::ClientId,
        oauth_refresh_token::Column::UserId,
        client_id,
        user_id,
    )
}

impl OAuth2State {
    /// Purge the principal's expired access tokens and mint a new one.
    #[tracing::instrument(skip_all, fields(client_id = %client.client_id))]
    pub async fn grant_access_token(
        &self,
        client: &oauth_client::Model,
        user: Option<&oauth_user::Model>,
        ttl: i64,
        scope: &str,
    ) -> Result<oauth_access_token::Model, OAuthError> {
        let now = self.now();
        let user_id = user.map(|u| u.id.as_str());
        let repo = self.store.access_tokens();

        let purged = repo
            .delete_by_filter(
                access_filter(&client.id, user_id)
                    .add(oauth_access_token::Column::ExpiresAt.lte(now)),
            )
            .await?;
        if purged > 0 {
            tracing::debug!(purged, "Purged expired access tokens");
        }

        let token = repo
            .insert(oauth_access_token::ActiveModel {
                id: Set(Self::generate_id()),
                access_token: Set(self.generate_token()),
                client_id: Set(client.id.clone()),
                user_id: Set(user_id.map(str::to_string)),
                scope: Set(scope.to_string()),
                expires_at: Set(self.expires_in(ttl)),
                created_at: Set(now),
            })
            .await?;
        Ok(token)
    }

    /// Reuse the principal's unexpired refresh token or replace it.
    ///
    /// The lookup, delete and insert run in one transaction; the unique
    /// index on `(client_id, user_id)` settles concurrent first logins.
    #[tracing::instrument(skip_all, fields(client_id = %client.client_id))]
    pub async fn get_or_create_refresh_token(
        &self,
        client: &oauth_client::Model,
        user: Option<&oauth_user::Model>,
        ttl: i64,
        scope: &str,
    ) -> Result<oauth_refresh_token::Model, OAuthError> {
        let now = self.now();
        let user_id = user.map(|u| u.id.as_str());

        let txn = self.store.begin().await?;
        let repo = Repository::<oauth_refresh_token::Entity, _>::new(&txn);

        if let Some(existing) = repo.find_one(refresh_filter(&client.id, user_id)).await? {
            if !existing.is_expired_at(now) {
                txn.commit().await?;
                return Ok(existing);
            }
            repo.delete_by_filter(
                Condition::all().add(oauth_refresh_token::Column::Id.eq(existing.id.clone())),
            )
            .await?;
        }

        let inserted = repo
            .insert(oauth_refresh_token::ActiveModel {
                id: Set(Self::generate_id()),
                token: Set(self.generate_token()),
                client_id: Set(client.id.clone()),
                user_id: Set(user_id.map(str::to_string)),
                scope: Set(scope.to_string()),
                expires_at: Set(self.expires_in(ttl)),
                created_at: Set(now),
            })
            .await;

        match inserted {
            Ok(token) => {
                txn.commit().await?;
                Ok(token)
            }
            Err(e) => {
                txn.rollback().await?;
                // A concurrent login for the same principal won the insert.
                match self
                    .store
                    .refresh_tokens()
                    .find_one(refresh_filter(&client.id, user_id))
                    .await?
                {
                    Some(token) if !token.is_expired_at(now) => Ok(token),
                    _ => Err(e.into()),
                }
            }
        }
    }

    /// Look up an access token and check its expiry. No side effects.
    pub async fn validate_access_token(
        &self,
        token: &str,
    ) -> Result<oauth_access_token::Model, OAuthError> {
        let access = self
            .store
            .access_tokens()
            .find_one(Condition::all().add(oauth_access_token::Column::AccessToken.eq(token)))
            .await?
            .filter(|found| secrets_match(&found.access_token, token))
            .ok_or(OAuthError::AccessTokenNotFound)?;

        if access.is_expired_at(self.now()) {
            return Err(OAuthError::AccessTokenExpired);
        }
        Ok(access)
    }

    /// Push the matching refresh token's expiry forward by one refresh
    /// lifetime. An already expired refresh token is left alone.
    pub async fn touch_refresh_token(
        &self,
        access: &oauth_access_token::Model,
    ) -> Result<Option<oauth_refresh_token::Model>, OAuthError> {
        let now = self.now();
        let repo = self.store.refresh_tokens();
        let Some(refresh) = repo
            .find_one(refresh_filter(&access.client_id, access.user_id.as_deref()))
            .await?
        else {
            return Ok(None);
        };
        if refresh.is_expired_at(now) {
            return Ok(None);
        }

        let extended =
            refresh.expires_at + Duration::seconds(self.lifetimes.refresh_token_lifetime);
        let mut active = refresh.into_active_model();
        active.expires_at = Set(extended);
        Ok(Some(repo.update(active).await?))
    }

    /// Validate an access token and keep the session's refresh token alive.
    pub async fn authenticate(
        &self,
        token: &str,
    ) -> Result<oauth_access_token::Model, OAuthError> {
        let access = self.validate_access_token(token).await?;
        self.touch_refresh_token(&access).await?;
        Ok(access)
    }

    /// Refresh token presented by `client`, unexpired.
    pub async fn get_valid_refresh_token(
        &self,
        token: &str,
        client: &oauth_client::Model,
    ) -> Result<oauth_refresh_token::Model, OAuthError> {
        let refresh = self
            .store
            .refresh_tokens()
            .find_one(
                Condition::all()
                    .add(oauth_refresh_token::Column::ClientId.eq(client.id.clone()))
                    .add(oauth_refresh_token::Column::Token.eq(token)),
            )
            .await?
            .filter(|found| secrets_match(&found.token, token))
            .ok_or(OAuthError::RefreshTokenNotFound)?;

        if refresh.is_expired_at(self.now()) {
            return Err(OAuthError::RefreshTokenExpired);
        }
        Ok(refresh)
    }

    /// Issue an access token and get or create the refresh token.
    pub async fn login(
        &self,
        client: &oauth_client::Model,
        user: Option<&oauth_user::Model>,
        scope: &str,
    ) -> Result<(oauth_access_token::Model, oauth_refresh_token::Model), OAuthError> {
        let access = self
            .grant_access_token(client, user, self.lifetimes.access_token_lifetime, scope)
            .await?;
        let refresh = self
            .get_or_create_refresh_token(client, user, self.lifetimes.refresh_token_lifetime, scope)
            .await?;
        Ok((access, refresh))
    }

    /// Revoke every token a logged-in principal holds. The keys are the
    /// public client id and the user id as carried by the cookie session.
    #[tracing::instrument(skip(self))]
    pub async fn clear_user_tokens(&self, key: PrincipalKey<'_>) -> Result<(), OAuthError> {
        let client = match self.find_client_by_client_id(key.client_id).await {
            Ok(client) => client,
            Err(OAuthError::ClientNotFound) => return Ok(()),
            Err(e) => return Err(e),
        };
        let refresh = self
            .store
            .refresh_tokens()
            .delete_by_filter(refresh_filter(&client.id, key.user_id))
            .await?;
        let access = self
            .store
            .access_tokens()
            .delete_by_filter(access_filter(&client.id, key.user_id))
            .await?;
        tracing::info!(refresh, access, "Cleared user tokens");
        Ok(())
    }
}
