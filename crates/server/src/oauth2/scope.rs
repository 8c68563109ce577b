//! Scope calculator.
//!
//! Scopes are single-space separated tokens checked against the
//! `oauth_scopes` catalog.

use crate::entity::oauth_scope;
use crate::error::OAuthError;
use crate::oauth2::OAuth2State;
use sea_orm::{ColumnTrait, Condition};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// A scope token with its human readable description, for the consent page.
#[derive(Clone, Debug, Serialize)]
pub struct ScopeInfo {
    pub name: String,
    pub description: String,
}

impl OAuth2State {
    /// Canonical scope for a request: the default scope when nothing was
    /// requested, otherwise the request itself if every token is known.
    pub async fn get_scope(&self, requested: &str) -> Result<String, OAuthError> {
        if requested.is_empty() {
            return self.get_default_scope().await;
        }
        if self.scope_exists(requested).await? {
            Ok(requested.to_string())
        } else {
            Err(OAuthError::InvalidScope)
        }
    }

    pub async fn get_default_scope(&self) -> Result<String, OAuthError> {
        let defaults = self
            .store
            .scopes()
            .find_all(Condition::all().add(oauth_scope::Column::IsDefault.eq(true)))
            .await?;
        Ok(join_sorted(defaults.iter().map(|s| s.scope.as_str())))
    }

    /// True when every space separated token exists in the catalog.
    pub async fn scope_exists(&self, requested: &str) -> Result<bool, OAuthError> {
        let wanted: Vec<&str> = requested.split(' ').collect();
        let found = self
            .store
            .scopes()
            .find_all(Condition::all().add(oauth_scope::Column::Scope.is_in(wanted.iter().copied())))
            .await?;
        let known: HashSet<&str> = found.iter().map(|s| s.scope.as_str()).collect();
        Ok(wanted.iter().all(|token| known.contains(token)))
    }

    /// Describe each token of `scope` using the catalog descriptions.
    pub async fn describe_scope(&self, scope: &str) -> Result<Vec<ScopeInfo>, OAuthError> {
        let tokens: Vec<&str> = scope.split(' ').filter(|s| !s.is_empty()).collect();
        let found = self
            .store
            .scopes()
            .find_all(Condition::all().add(oauth_scope::Column::Scope.is_in(tokens.iter().copied())))
            .await?;

        Ok(tokens
            .iter()
            .map(|token| {
                let description = found
                    .iter()
                    .find(|s| s.scope == *token)
                    .and_then(|s| s.description.clone())
                    .unwrap_or_else(|| format!("Access to {token}"));
                ScopeInfo {
                    name: token.to_string(),
                    description,
                }
            })
            .collect())
    }
}

/// Sorted, de-duplicated, single-space joined.
pub fn join_sorted<'a>(scopes: impl IntoIterator<Item = &'a str>) -> String {
    scopes
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether every token of `requested` is also in `granted`.
pub fn scope_not_greater(requested: &str, granted: &str) -> bool {
    if requested.is_empty() {
        return true;
    }
    let granted: HashSet<&str> = granted.split(' ').collect();
    requested.split(' ').all(|token| granted.contains(token))
}
