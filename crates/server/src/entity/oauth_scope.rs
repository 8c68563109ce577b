//! OAuth scope entity - the static scope catalog.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "oauth_scopes")]
pub struct Model {
    /// Lowercase, whitespace-free scope token
    #[sea_orm(primary_key, auto_increment = false)]
    pub scope: String,
    pub description: Option<String>,
    /// Included in the default scope when a request names none
    pub is_default: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
