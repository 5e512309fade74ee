use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Application configuration loaded from config.toml or environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Location of the ticket registry database
    pub path: PathBuf,
}

impl AppConfig {
    /// Load configuration from config.toml file and environment variables.
    /// Environment variables take precedence over file configuration.
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("database.path", "./tickets.db")?
            // Load from config.toml if it exists
            .add_source(File::with_name("config").required(false))
            // TICKET_DATABASE_PATH and friends override file settings
            .add_source(config::Environment::with_prefix("TICKET").separator("_"))
            .build()?;

        let mut app_config: AppConfig = config.try_deserialize()?;

        if let Ok(db_path) = env::var("TICKET_REGISTRY_PATH") {
            app_config.database.path = PathBuf::from(db_path);
        }

        Ok(app_config)
    }

    /// Get default config values for CLI argument defaults
    pub fn get_defaults() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(_) => Self {
                database: DatabaseConfig {
                    path: PathBuf::from("./tickets.db"),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_defaults() {
        let config = AppConfig::get_defaults();
        assert!(!config.database.path.as_os_str().is_empty());
    }
}
