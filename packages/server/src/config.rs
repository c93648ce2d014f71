use std::path::PathBuf;
use std::time::Duration;

use catalog::QuerySettings;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Login name of the single administrator account.
    pub admin_username: String,
    /// Argon2 PHC string of the administrator password.
    pub admin_password_hash: String,
    pub token_ttl_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory uploaded media is written to.
    pub root: PathBuf,
    /// Base URL objects are served under, usually `<origin>/storage`.
    pub public_base_url: String,
    /// Upper bound on a single uploaded file, in bytes.
    pub max_object_size: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    pub featured_limit: u64,
    /// Optional freshness bound for cached reads, in seconds.
    pub max_age_secs: Option<u64>,
}

impl CatalogConfig {
    pub fn query_settings(&self) -> QuerySettings {
        QuerySettings {
            featured_limit: self.featured_limit,
            max_age: self.max_age_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://catalog.db?mode=rwc")?
            .set_default("auth.admin_username", "admin")?
            .set_default("auth.token_ttl_hours", 24)?
            .set_default("storage.root", "./data/storage")?
            .set_default("storage.public_base_url", "http://127.0.0.1:3000/storage")?
            .set_default("storage.max_object_size", 50 * 1024 * 1024)?
            .set_default("catalog.featured_limit", 3)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., CATALOG__AUTH__JWT_SECRET)
            .add_source(
                Environment::with_prefix("CATALOG")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors.allow_origins")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
