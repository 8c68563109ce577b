//! OAuth client entity - registered applications.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "oauth_clients")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Public client identifier, always stored lowercase
    #[sea_orm(unique)]
    pub client_id: String,
    /// Argon2id PHC string, never the plaintext secret
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub redirect_url: String,
    pub app_name: Option<String>,
    /// Space-separated scopes the application advertises
    pub scopes: Option<String>,
    pub publisher_name: Option<String>,
    pub website: Option<String>,
    pub contact_email: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Name shown on the login and consent pages
    pub fn display_name(&self) -> &str {
        self.app_name.as_deref().unwrap_or(&self.client_id)
    }
}
