//! Out-of-band administration for the authorization server.
//!
//! Usage:
//! ```bash
//! # Register a client
//! oauth2-admin create-client acme s3cr3t https://acme.example/cb
//!
//! # Create a user (password-less when --password is omitted)
//! oauth2-admin create-user alice@example.com --password hunter22
//!
//! # Create a superuser
//! oauth2-admin create-user root@example.com --password changeme --role superuser
//!
//! # Change a user's password
//! oauth2-admin set-password alice@example.com --password hunter23
//! ```

use axum_extra::extract::cookie::Key;
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Result, WrapErr};
use oauth2_server::config::OAuthConfig;
use oauth2_server::entity::oauth_role;
use oauth2_server::oauth2::OAuth2State;
use sea_orm::Database;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "oauth2-admin",
    about = "OAuth2 server administration",
    long_about = "Register OAuth clients and manage user accounts directly in the database."
)]
struct AdminArgs {
    #[command(subcommand)]
    command: AdminCommand,

    /// Database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Subcommand)]
enum AdminCommand {
    /// Register a new OAuth client
    CreateClient {
        /// Public client id (stored lowercase)
        client_id: String,
        /// Client secret (stored hashed)
        secret: String,
        /// Absolute redirect URL
        redirect_url: String,
    },

    /// Create a user account
    CreateUser {
        /// Login email (stored lowercase)
        email: String,
        /// Password; omit for a password-less account
        #[arg(long, default_value = "")]
        password: String,
        #[arg(long, value_enum, default_value_t = Role::User)]
        role: Role,
    },

    /// Replace a user's password
    SetPassword {
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Role {
    User,
    Superuser,
}

impl Role {
    fn id(self) -> &'static str {
        match self {
            Role::User => oauth_role::USER,
            Role::Superuser => oauth_role::SUPERUSER,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();
    let args = AdminArgs::parse();

    let default_directives = if args.verbose {
        "oauth2_server=debug,sea_orm=info"
    } else {
        "oauth2_server=info,sea_orm=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false))
        .init();

    let db = Database::connect(&args.database_url)
        .await
        .wrap_err("Failed to connect to database")?;
    // Admin commands never touch session cookies.
    let state = OAuth2State::new(Arc::new(db), OAuthConfig::default(), Key::generate());

    match args.command {
        AdminCommand::CreateClient {
            client_id,
            secret,
            redirect_url,
        } => {
            let client = state
                .create_client(&client_id, &secret, &redirect_url)
                .await
                .wrap_err("Failed to create client")?;
            println!("Created client {} ({})", client.client_id, client.id);
        }
        AdminCommand::CreateUser {
            email,
            password,
            role,
        } => {
            let user = state
                .create_user(role.id(), &email, &password)
                .await
                .wrap_err("Failed to create user")?;
            println!("Created user {} ({})", user.email, user.id);
        }
        AdminCommand::SetPassword { email, password } => {
            let user = state
                .find_user_by_email(&email)
                .await
                .wrap_err("Failed to find user")?;
            state
                .set_password(&user, &password)
                .await
                .wrap_err("Failed to set password")?;
            println!("Updated password for {}", user.email);
        }
    }
    Ok(())
}
