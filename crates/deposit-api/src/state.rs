//! # Application State
//!
//! Shared state for the axum mirror: the JSON-file store, the dorm
//! catalog, and env-driven configuration.

use deposit_core::catalog::DormCatalog;
use deposit_store::JsonFileStore;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Directory for the JSON collection files
    pub data_dir: String,
    /// Environment (development, staging, production)
    pub environment: String,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("Invalid socket address")
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Flat-file store behind every collection
    pub store: Arc<JsonFileStore>,
    /// Dorm listings
    pub catalog: DormCatalog,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create state from env config
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let store = Arc::new(JsonFileStore::open(&config.data_dir)?);
        let catalog = load_dorm_catalog()?;

        Ok(Self {
            store,
            catalog,
            config,
        })
    }

    /// Create state over an explicit store and catalog (for tests)
    pub fn with_store(store: Arc<JsonFileStore>, catalog: DormCatalog) -> Self {
        Self {
            store,
            catalog,
            config: AppConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                data_dir: String::new(),
                environment: "test".to_string(),
            },
        }
    }
}

/// Load dorm catalog from config file
fn load_dorm_catalog() -> anyhow::Result<DormCatalog> {
    let config_paths = [
        "config/dorms.toml",
        "../config/dorms.toml",
        "../../config/dorms.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = DormCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded {} dorms from {}", catalog.dorms.len(), path);
            return Ok(catalog);
        }
    }

    // Empty catalog if no config found; the frontend carries its own data
    tracing::warn!("No dorm catalog found, using empty catalog");
    Ok(DormCatalog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_defaults() {
        std::env::remove_var("HOST");
        std::env::remove_var("PORT");
        std::env::remove_var("DATA_DIR");

        let config = AppConfig::from_env();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3001);
        assert_eq!(config.data_dir, "data");
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3001,
            data_dir: "data".to_string(),
            environment: "test".to_string(),
        };
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:3001");
    }
}
