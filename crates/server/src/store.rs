//! Credential store adapter.
//!
//! Business logic talks to the record store only through [`Repository`], a
//! filter-based CRUD surface over one entity. A repository borrows either the
//! pooled [`DatabaseConnection`] or an open [`DatabaseTransaction`], so the
//! same code runs inside and outside a transaction.

use crate::entity::{
    oauth_access_token, oauth_authorization_code, oauth_client, oauth_refresh_token, oauth_role,
    oauth_scope, oauth_user,
};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, IntoActiveModel, QueryFilter, TransactionTrait,
};
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed CRUD over a single entity collection.
pub struct Repository<'c, E, C> {
    conn: &'c C,
    entity: PhantomData<E>,
}

impl<'c, E, C> Repository<'c, E, C>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    pub fn new(conn: &'c C) -> Self {
        Self {
            conn,
            entity: PhantomData,
        }
    }

    /// First record matching `filter`.
    pub async fn find_one(&self, filter: Condition) -> Result<Option<E::Model>, DbErr> {
        E::find().filter(filter).one(self.conn).await
    }

    /// Every record matching `filter`.
    pub async fn find_all(&self, filter: Condition) -> Result<Vec<E::Model>, DbErr> {
        E::find().filter(filter).all(self.conn).await
    }

    pub async fn insert<A>(&self, model: A) -> Result<E::Model, DbErr>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + 'static,
        E::Model: IntoActiveModel<A>,
    {
        model.insert(self.conn).await
    }

    pub async fn update<A>(&self, model: A) -> Result<E::Model, DbErr>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + 'static,
        E::Model: IntoActiveModel<A>,
    {
        model.update(self.conn).await
    }

    /// Delete every record matching `filter`, returning how many went away.
    pub async fn delete_by_filter(&self, filter: Condition) -> Result<u64, DbErr> {
        let result = E::delete_many().filter(filter).exec(self.conn).await?;
        Ok(result.rows_affected)
    }
}

/// Handle on the record store. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Store {
    db: Arc<DatabaseConnection>,
}

impl Store {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        self.db.as_ref()
    }

    pub fn clients(&self) -> Repository<'_, oauth_client::Entity, DatabaseConnection> {
        Repository::new(self.connection())
    }

    pub fn users(&self) -> Repository<'_, oauth_user::Entity, DatabaseConnection> {
        Repository::new(self.connection())
    }

    pub fn roles(&self) -> Repository<'_, oauth_role::Entity, DatabaseConnection> {
        Repository::new(self.connection())
    }

    pub fn scopes(&self) -> Repository<'_, oauth_scope::Entity, DatabaseConnection> {
        Repository::new(self.connection())
    }

    pub fn access_tokens(&self) -> Repository<'_, oauth_access_token::Entity, DatabaseConnection> {
        Repository::new(self.connection())
    }

    pub fn refresh_tokens(
        &self,
    ) -> Repository<'_, oauth_refresh_token::Entity, DatabaseConnection> {
        Repository::new(self.connection())
    }

    pub fn authorization_codes(
        &self,
    ) -> Repository<'_, oauth_authorization_code::Entity, DatabaseConnection> {
        Repository::new(self.connection())
    }

    /// Open a transaction; wrap it in [`Repository::new`] to work inside it.
    pub async fn begin(&self) -> Result<DatabaseTransaction, DbErr> {
        self.db.begin().await
    }

    /// Round-trip to the database, used by the health check.
    pub async fn ping(&self) -> Result<(), DbErr> {
        self.db.ping().await
    }
}
