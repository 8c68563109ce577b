use serde::Deserialize;
use thiserror::Error;

/// Minimum length of the cookie signing secret, in bytes.
pub const MIN_SESSION_SECRET_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Token and code lifetimes, in seconds.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct OAuthConfig {
    #[serde(default = "default_access_token_lifetime")]
    pub access_token_lifetime: i64,
    #[serde(default = "default_refresh_token_lifetime")]
    pub refresh_token_lifetime: i64,
    #[serde(default = "default_auth_code_lifetime")]
    pub auth_code_lifetime: i64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime: default_access_token_lifetime(),
            refresh_token_lifetime: default_refresh_token_lifetime(),
            auth_code_lifetime: default_auth_code_lifetime(),
        }
    }
}

fn default_access_token_lifetime() -> i64 {
    3600
}

fn default_refresh_token_lifetime() -> i64 {
    15_552_000 // 180 days
}

fn default_auth_code_lifetime() -> i64 {
    600
}

fn default_port() -> u16 {
    8080
}

#[derive(Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Secret used to sign the session cookie
    pub session_secret: String,
    #[serde(default)]
    pub oauth: OAuthConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("oauth", &self.oauth)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ConfigError::Validation(format!(
                "session_secret must be at least {MIN_SESSION_SECRET_LEN} bytes"
            )));
        }
        let OAuthConfig {
            access_token_lifetime,
            refresh_token_lifetime,
            auth_code_lifetime,
        } = self.oauth;
        if access_token_lifetime <= 0 || refresh_token_lifetime <= 0 || auth_code_lifetime <= 0 {
            return Err(ConfigError::Validation(
                "oauth lifetimes must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Load application configuration from an optional `config.yaml` + environment overrides.
///
/// Any variable matching the key path separated by double underscores
/// (e.g. `OAUTH__ACCESS_TOKEN_LIFETIME`) overrides the file value; top-level
/// keys map directly (`PORT`, `DATABASE_URL`, `SESSION_SECRET`).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};

    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();

    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml").required(false))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// Convenience helper for binaries wanting panic-on-error behaviour.
pub fn load_config_or_panic() -> AppConfig {
    match load_config() {
        Ok(c) => c,
        Err(e) => panic!("Failed to load configuration: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".into(),
            port: 8080,
            session_secret: secret.into(),
            oauth: OAuthConfig::default(),
        }
    }

    #[test]
    fn defaults_match_protocol_lifetimes() {
        let oauth = OAuthConfig::default();
        assert_eq!(oauth.access_token_lifetime, 3600);
        assert_eq!(oauth.refresh_token_lifetime, 15_552_000);
        assert_eq!(oauth.auth_code_lifetime, 600);
    }

    #[test]
    fn rejects_short_session_secret() {
        assert!(matches!(
            config("too-short").validate(),
            Err(ConfigError::Validation(_))
        ));
        assert!(config(&"x".repeat(64)).validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_lifetimes() {
        let mut cfg = config(&"x".repeat(64));
        cfg.oauth.auth_code_lifetime = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cfg = config(&"s".repeat(64));
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("sss"));
        assert!(!rendered.contains("sqlite"));
    }
}
