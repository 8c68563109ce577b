//! Creates the authorization server schema.
//!
//! Creates tables for:
//! - oauth_clients: Registered OAuth clients
//! - oauth_roles / oauth_users: Resource owners
//! - oauth_scopes: The scope catalog
//! - oauth_authorization_codes: Single-use consent codes
//! - oauth_access_tokens / oauth_refresh_tokens: Issued tokens
//!
//! Seeds the scope catalog (`read` and `write` default, `admin` opt-in) and
//! the `superuser` and `user` roles.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 1. Clients
        manager
            .create_table(
                Table::create()
                    .table(OAuthClients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuthClients::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OAuthClients::ClientId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(OAuthClients::ClientSecret).string().not_null())
                    .col(ColumnDef::new(OAuthClients::RedirectUrl).string().not_null())
                    .col(ColumnDef::new(OAuthClients::AppName).string().null())
                    .col(ColumnDef::new(OAuthClients::Scopes).text().null())
                    .col(ColumnDef::new(OAuthClients::PublisherName).string().null())
                    .col(ColumnDef::new(OAuthClients::Website).string().null())
                    .col(ColumnDef::new(OAuthClients::ContactEmail).string().null())
                    .col(
                        ColumnDef::new(OAuthClients::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 2. Roles
        manager
            .create_table(
                Table::create()
                    .table(OAuthRoles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuthRoles::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OAuthRoles::Name).string().not_null())
                    .to_owned(),
            )
            .await?;

        // 3. Users
        manager
            .create_table(
                Table::create()
                    .table(OAuthUsers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuthUsers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OAuthUsers::RoleId).string().not_null())
                    .col(
                        ColumnDef::new(OAuthUsers::Email)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(OAuthUsers::Password).string().null())
                    .col(
                        ColumnDef::new(OAuthUsers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuthUsers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_oauth_users_role_id")
                            .from(OAuthUsers::Table, OAuthUsers::RoleId)
                            .to(OAuthRoles::Table, OAuthRoles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // 4. Scope catalog
        manager
            .create_table(
                Table::create()
                    .table(OAuthScopes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuthScopes::Scope)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OAuthScopes::Description).text().null())
                    .col(
                        ColumnDef::new(OAuthScopes::IsDefault)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // 5. Authorization codes
        manager
            .create_table(
                Table::create()
                    .table(OAuthAuthorizationCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuthAuthorizationCodes::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OAuthAuthorizationCodes::Code)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(OAuthAuthorizationCodes::ClientId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuthAuthorizationCodes::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuthAuthorizationCodes::RedirectUrl)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OAuthAuthorizationCodes::Scope).text().not_null())
                    .col(
                        ColumnDef::new(OAuthAuthorizationCodes::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuthAuthorizationCodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_oauth_authorization_codes_client_id")
                            .from(
                                OAuthAuthorizationCodes::Table,
                                OAuthAuthorizationCodes::ClientId,
                            )
                            .to(OAuthClients::Table, OAuthClients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_oauth_authorization_codes_user_id")
                            .from(
                                OAuthAuthorizationCodes::Table,
                                OAuthAuthorizationCodes::UserId,
                            )
                            .to(OAuthUsers::Table, OAuthUsers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 6. Access tokens
        manager
            .create_table(
                Table::create()
                    .table(OAuthAccessTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuthAccessTokens::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OAuthAccessTokens::AccessToken)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(OAuthAccessTokens::ClientId).string().not_null())
                    .col(ColumnDef::new(OAuthAccessTokens::UserId).string().null())
                    .col(ColumnDef::new(OAuthAccessTokens::Scope).text().not_null())
                    .col(
                        ColumnDef::new(OAuthAccessTokens::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuthAccessTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_oauth_access_tokens_client_id")
                            .from(OAuthAccessTokens::Table, OAuthAccessTokens::ClientId)
                            .to(OAuthClients::Table, OAuthClients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_oauth_access_tokens_user_id")
                            .from(OAuthAccessTokens::Table, OAuthAccessTokens::UserId)
                            .to(OAuthUsers::Table, OAuthUsers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 7. Refresh tokens
        manager
            .create_table(
                Table::create()
                    .table(OAuthRefreshTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OAuthRefreshTokens::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OAuthRefreshTokens::Token)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(OAuthRefreshTokens::ClientId).string().not_null())
                    .col(ColumnDef::new(OAuthRefreshTokens::UserId).string().null())
                    .col(ColumnDef::new(OAuthRefreshTokens::Scope).text().not_null())
                    .col(
                        ColumnDef::new(OAuthRefreshTokens::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OAuthRefreshTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_oauth_refresh_tokens_client_id")
                            .from(OAuthRefreshTokens::Table, OAuthRefreshTokens::ClientId)
                            .to(OAuthClients::Table, OAuthClients::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_oauth_refresh_tokens_user_id")
                            .from(OAuthRefreshTokens::Table, OAuthRefreshTokens::UserId)
                            .to(OAuthUsers::Table, OAuthUsers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Indexes
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth_refresh_tokens_principal")
                    .table(OAuthRefreshTokens::Table)
                    .col(OAuthRefreshTokens::ClientId)
                    .col(OAuthRefreshTokens::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth_access_tokens_principal")
                    .table(OAuthAccessTokens::Table)
                    .col(OAuthAccessTokens::ClientId)
                    .col(OAuthAccessTokens::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth_access_tokens_expires_at")
                    .table(OAuthAccessTokens::Table)
                    .col(OAuthAccessTokens::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_oauth_authorization_codes_client_id")
                    .table(OAuthAuthorizationCodes::Table)
                    .col(OAuthAuthorizationCodes::ClientId)
                    .to_owned(),
            )
            .await?;

        // Seed data
        let roles = Query::insert()
            .into_table(OAuthRoles::Table)
            .columns([OAuthRoles::Id, OAuthRoles::Name])
            .values_panic(["superuser".into(), "Superuser".into()])
            .values_panic(["user".into(), "User".into()])
            .to_owned();
        manager.exec_stmt(roles).await?;

        let scopes = Query::insert()
            .into_table(OAuthScopes::Table)
            .columns([
                OAuthScopes::Scope,
                OAuthScopes::Description,
                OAuthScopes::IsDefault,
            ])
            .values_panic(["read".into(), "Read your data".into(), true.into()])
            .values_panic(["write".into(), "Modify your data".into(), true.into()])
            .values_panic([
                "admin".into(),
                "Administer the service".into(),
                false.into(),
            ])
            .to_owned();
        manager.exec_stmt(scopes).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop indexes first
        manager
            .drop_index(
                Index::drop()
                    .name("idx_oauth_authorization_codes_client_id")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_oauth_access_tokens_expires_at")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_oauth_access_tokens_principal")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_oauth_refresh_tokens_principal")
                    .to_owned(),
            )
            .await?;

        // Then tables, dependents before their parents
        for table in [
            OAuthRefreshTokens::Table.into_iden(),
            OAuthAccessTokens::Table.into_iden(),
            OAuthAuthorizationCodes::Table.into_iden(),
            OAuthScopes::Table.into_iden(),
            OAuthUsers::Table.into_iden(),
            OAuthRoles::Table.into_iden(),
            OAuthClients::Table.into_iden(),
        ] {
            manager
                .drop_table(Table::drop().table(table).to_owned())
                .await?;
        }

        Ok(())
    }
}

#[derive(DeriveIden)]
enum OAuthClients {
    #[sea_orm(iden = "oauth_clients")]
    Table,
    Id,
    ClientId,
    ClientSecret,
    RedirectUrl,
    AppName,
    Scopes,
    PublisherName,
    Website,
    ContactEmail,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OAuthRoles {
    #[sea_orm(iden = "oauth_roles")]
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum OAuthUsers {
    #[sea_orm(iden = "oauth_users")]
    Table,
    Id,
    RoleId,
    Email,
    Password,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum OAuthScopes {
    #[sea_orm(iden = "oauth_scopes")]
    Table,
    Scope,
    Description,
    IsDefault,
}

#[derive(DeriveIden)]
enum OAuthAuthorizationCodes {
    #[sea_orm(iden = "oauth_authorization_codes")]
    Table,
    Id,
    Code,
    ClientId,
    UserId,
    RedirectUrl,
    Scope,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OAuthAccessTokens {
    #[sea_orm(iden = "oauth_access_tokens")]
    Table,
    Id,
    AccessToken,
    ClientId,
    UserId,
    Scope,
    ExpiresAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum OAuthRefreshTokens {
    #[sea_orm(iden = "oauth_refresh_tokens")]
    Table,
    Id,
    Token,
    ClientId,
    UserId,
    Scope,
    ExpiresAt,
    CreatedAt,
}
