use oauth2_server::AppResources;
use oauth2_server::api::start_webserver;
use oauth2_server::config::load_config_or_panic;
use sea_orm::Database;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "oauth2_server=info,tower_http=info,sea_orm=warn";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    // -------- Tracing Initialization --------
    initialize_tracing();

    // Load config
    let config = Arc::new(load_config_or_panic());
    tracing::info!(config = ?config, "Loaded configuration");

    // Set up SeaORM database connection
    let db = Arc::new(Database::connect(&config.database_url).await?);

    start_webserver(AppResources { db, config }).await?;
    Ok(())
}
