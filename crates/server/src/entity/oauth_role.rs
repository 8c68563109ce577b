//! OAuth role entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role given to administrators created through the admin CLI
pub const SUPERUSER: &str = "superuser";
/// Role given to accounts created through signup
pub const USER: &str = "user";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "oauth_roles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
