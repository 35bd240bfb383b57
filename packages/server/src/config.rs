use std::path::PathBuf;

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
    pub token_ttl_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// Directory uploaded images are written to.
    pub root: PathBuf,
    /// URL prefix the media directory is served under, e.g. `/media`.
    pub public_url: String,
    pub max_image_bytes: u64,
}

/// Numeric bounds enforced on recipe payloads.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RecipeRules {
    pub min_cooking_time: i32,
    pub max_cooking_time: i32,
    pub min_amount: i32,
    pub max_amount: i32,
}

impl Default for RecipeRules {
    fn default() -> Self {
        Self {
            min_cooking_time: 1,
            max_cooking_time: 1000,
            min_amount: 1,
            max_amount: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct PaginationConfig {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 6,
            max_page_size: 100,
        }
    }
}

/// Fixture files loaded on startup. Both are optional.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SeedConfig {
    pub ingredients_csv: Option<PathBuf>,
    pub tags_json: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub media: MediaConfig,
    #[serde(default)]
    pub recipe: RecipeRules,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("auth.token_ttl_hours", 24 * 7)?
            .set_default("media.root", "./media")?
            .set_default("media.public_url", "/media")?
            .set_default("media.max_image_bytes", 5 * 1024 * 1024)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., FOODGRAM__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("FOODGRAM").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
