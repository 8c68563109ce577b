//! Client authenticator.

use crate::entity::oauth_client;
use crate::error::OAuthError;
use crate::oauth2::OAuth2State;
use crate::oauth2::password::SecretHash;
use axum::http::{HeaderMap, header};
use base64::Engine;
use sea_orm::{ActiveValue::Set, ColumnTrait, Condition};

impl OAuth2State {
    /// Case-insensitive lookup by public client id.
    pub async fn find_client_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<oauth_client::Model, OAuthError> {
        self.store
            .clients()
            .find_one(
                Condition::all().add(oauth_client::Column::ClientId.eq(client_id.to_lowercase())),
            )
            .await?
            .ok_or(OAuthError::ClientNotFound)
    }

    pub async fn find_client_by_id(&self, id: &str) -> Result<oauth_client::Model, OAuthError> {
        self.store
            .clients()
            .find_one(Condition::all().add(oauth_client::Column::Id.eq(id)))
            .await?
            .ok_or(OAuthError::ClientNotFound)
    }

    pub async fn client_exists(&self, client_id: &str) -> Result<bool, OAuthError> {
        match self.find_client_by_client_id(client_id).await {
            Ok(_) => Ok(true),
            Err(OAuthError::ClientNotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Verify a client id and secret pair.
    #[tracing::instrument(skip(self, secret))]
    pub async fn auth_client(
        &self,
        client_id: &str,
        secret: &str,
    ) -> Result<oauth_client::Model, OAuthError> {
        let client = self.find_client_by_client_id(client_id).await?;
        if !SecretHash::from(client.client_secret.clone())
            .matches_blocking(secret.to_string())
            .await?
        {
            return Err(OAuthError::InvalidClientSecret);
        }
        Ok(client)
    }

    /// Register a client. The id is stored lowercased and the secret hashed.
    #[tracing::instrument(skip(self, secret))]
    pub async fn create_client(
        &self,
        client_id: &str,
        secret: &str,
        redirect_url: &str,
    ) -> Result<oauth_client::Model, OAuthError> {
        if self.client_exists(client_id).await? {
            return Err(OAuthError::ClientIdTaken);
        }
        url::Url::parse(redirect_url).map_err(|_| OAuthError::InvalidRedirectUri)?;
        let client_secret = SecretHash::compute_blocking(secret.to_string())
            .await?
            .into_string();

        let client = self
            .store
            .clients()
            .insert(oauth_client::ActiveModel {
                id: Set(Self::generate_id()),
                client_id: Set(client_id.to_lowercase()),
                client_secret: Set(client_secret),
                redirect_url: Set(redirect_url.to_string()),
                app_name: Set(None),
                scopes: Set(None),
                publisher_name: Set(None),
                website: Set(None),
                contact_email: Set(None),
                created_at: Set(self.now()),
            })
            .await?;
        tracing::info!(client_id = %client.client_id, "Created OAuth client");
        Ok(client)
    }

    /// Authenticate the client named in the `Authorization: Basic` header.
    /// Every failure collapses to [`OAuthError::InvalidClientIdOrSecret`].
    pub async fn basic_auth_client(
        &self,
        headers: &HeaderMap,
    ) -> Result<oauth_client::Model, OAuthError> {
        let (client_id, secret) =
            basic_auth_credentials(headers).ok_or(OAuthError::InvalidClientIdOrSecret)?;
        self.auth_client(&client_id, &secret)
            .await
            .map_err(OAuthError::into_client_error)
    }
}

/// Decode `Authorization: Basic base64(id:secret)`.
pub fn basic_auth_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value
        .strip_prefix("Basic ")
        .or_else(|| value.strip_prefix("basic "))?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (id, secret) = decoded.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn parses_basic_credentials() {
        // acme:s3cr3t
        let creds = basic_auth_credentials(&headers("Basic YWNtZTpzM2NyM3Q="));
        assert_eq!(creds, Some(("acme".to_string(), "s3cr3t".to_string())));
    }

    #[test]
    fn secret_may_contain_colons() {
        // svc:a:b
        let creds = basic_auth_credentials(&headers("Basic c3ZjOmE6Yg=="));
        assert_eq!(creds, Some(("svc".to_string(), "a:b".to_string())));
    }

    #[test]
    fn rejects_malformed_headers() {
        assert_eq!(basic_auth_credentials(&HeaderMap::new()), None);
        assert_eq!(basic_auth_credentials(&headers("Bearer abc")), None);
        assert_eq!(basic_auth_credentials(&headers("Basic !!!")), None);
        // "nocolon"
        assert_eq!(basic_auth_credentials(&headers("Basic bm9jb2xvbg==")), None);
    }
}
