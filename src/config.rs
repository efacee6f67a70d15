use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use compute::Settings;
use config::{Config, Environment, File};
use moka::future::Cache;
use sea_orm::{Database, DatabaseConnection};
use serde::Deserialize;
use tracing::{debug, info};

use crate::schemas::AppState;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://foodgram.db?mode=rwc";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Runtime configuration.
///
/// Read from an optional `foodgram.{toml,yaml,json}` file (or the file given
/// with `--config`) and overridden by `FOODGRAM__*` environment variables,
/// e.g. `FOODGRAM__RULES__MAX_COOKING_TIME=600`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    /// Catalog cache lifetime in seconds.
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
    /// Business rules handed to every domain operation.
    pub rules: Settings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            cache_ttl_secs: 300,
            cache_capacity: 1000,
            rules: Settings::default(),
        }
    }
}

impl AppConfig {
    /// Load `.env`, then the config file, then the environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(path) => File::with_name(path),
            None => File::with_name("foodgram").required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("FOODGRAM")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("rules.banned_usernames")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        let loaded: AppConfig = config
            .try_deserialize()
            .context("Invalid configuration")?;
        debug!(?loaded.rules, "Configuration loaded");
        Ok(loaded)
    }

    /// Replace the database URL and bind address with explicit CLI values.
    pub fn with_overrides(
        mut self,
        database_url: Option<String>,
        bind_address: Option<String>,
    ) -> Self {
        if let Some(url) = database_url {
            self.database_url = url;
        }
        if let Some(address) = bind_address {
            self.bind_address = address;
        }
        self
    }
}

/// Build the shared state around an open connection.
pub fn build_app_state(db: DatabaseConnection, config: &AppConfig) -> AppState {
    let cache = Cache::builder()
        .max_capacity(config.cache_capacity)
        .time_to_live(Duration::from_secs(config.cache_ttl_secs))
        .build();

    AppState {
        db,
        cache,
        settings: Arc::new(config.rules.clone()),
    }
}

/// Connect to the configured database and build the shared state.
pub async fn initialize_app_state(config: &AppConfig) -> Result<AppState> {
    info!("Connecting to database: {}", config.database_url);
    let db = Database::connect(&config.database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", config.database_url))?;

    Ok(build_app_state(db, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use compute::IngredientMergeMode;

    #[test]
    fn test_defaults_without_sources() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.rules, Settings::default());
    }

    #[test]
    fn test_file_values_override_defaults() {
        let dir = std::env::temp_dir().join(format!("foodgram-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("foodgram.toml");
        std::fs::write(
            &path,
            r#"
bind_address = "127.0.0.1:8080"

[rules]
max_cooking_time = 600
banned_usernames = ["me", "admin"]
ingredient_merge = "additive"
"#,
        )
        .unwrap();

        let config = AppConfig::load(path.to_str()).unwrap();
        assert_eq!(config.bind_address, "127.0.0.1:8080");
        assert_eq!(config.rules.max_cooking_time, 600);
        assert_eq!(config.rules.min_cooking_time, 1);
        assert_eq!(config.rules.banned_usernames, vec!["me", "admin"]);
        assert_eq!(config.rules.ingredient_merge, IngredientMergeMode::Additive);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_cli_overrides() {
        let config = AppConfig::default()
            .with_overrides(Some("sqlite::memory:".to_string()), None);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
    }
}
