//! Single-use authorization codes issued at consent.

use crate::entity::{oauth_authorization_code, oauth_client, oauth_user};
use crate::error::OAuthError;
use crate::oauth2::OAuth2State;
use crate::oauth2::secret::secrets_match;
use sea_orm::{ActiveValue::Set, ColumnTrait, Condition};

fn by_id(id: &str) -> Condition {
    Condition::all().add(oauth_authorization_code::Column::Id.eq(id))
}

impl OAuth2State {
    #[tracing::instrument(skip_all, fields(client_id = %client.client_id))]
    pub async fn grant_authorization_code(
        &self,
        client: &oauth_client::Model,
        user: &oauth_user::Model,
        ttl: i64,
        redirect_url: &str,
        scope: &str,
    ) -> Result<oauth_authorization_code::Model, OAuthError> {
        let code = self
            .store
            .authorization_codes()
            .insert(oauth_authorization_code::ActiveModel {
                id: Set(Self::generate_id()),
                code: Set(self.generate_token()),
                client_id: Set(client.id.clone()),
                user_id: Set(user.id.clone()),
                redirect_url: Set(redirect_url.to_string()),
                scope: Set(scope.to_string()),
                expires_at: Set(self.expires_in(ttl)),
                created_at: Set(self.now()),
            })
            .await?;
        Ok(code)
    }

    /// Load a code issued to `client` and check it was issued for `redirect_url`
    /// and has not expired. Expired codes are removed on sight.
    pub async fn get_valid_authorization_code(
        &self,
        code: &str,
        redirect_url: &str,
        client: &oauth_client::Model,
    ) -> Result<oauth_authorization_code::Model, OAuthError> {
        let repo = self.store.authorization_codes();
        let found = repo
            .find_one(
                Condition::all()
                    .add(oauth_authorization_code::Column::ClientId.eq(client.id.clone()))
                    .add(oauth_authorization_code::Column::Code.eq(code)),
            )
            .await?
            .filter(|found| secrets_match(&found.code, code))
            .ok_or(OAuthError::AuthorizationCodeNotFound)?;

        if found.redirect_url != redirect_url {
            return Err(OAuthError::InvalidRedirectUri);
        }

        if found.is_expired_at(self.now()) {
            repo.delete_by_filter(by_id(&found.id)).await?;
            return Err(OAuthError::AuthorizationCodeExpired);
        }
        Ok(found)
    }

    /// Delete the code. Exactly one caller observes the row going away; every
    /// other concurrent redemption gets `AuthorizationCodeNotFound`.
    pub async fn consume_authorization_code(
        &self,
        code: &oauth_authorization_code::Model,
    ) -> Result<(), OAuthError> {
        let deleted = self
            .store
            .authorization_codes()
            .delete_by_filter(by_id(&code.id))
            .await?;
        if deleted != 1 {
            return Err(OAuthError::AuthorizationCodeNotFound);
        }
        Ok(())
    }
}
