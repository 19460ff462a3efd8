//! Application configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Uploaded media storage.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Outgoing email.
    #[serde(default)]
    pub email: EmailSettings,
    /// Imgflip template API.
    #[serde(default)]
    pub imgflip: ImgflipConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance, used in email links.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Local media storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory uploaded files are written to.
    #[serde(default = "default_storage_path")]
    pub base_path: PathBuf,
    /// URL prefix the directory is served under.
    #[serde(default = "default_storage_url")]
    pub base_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_storage_path(),
            base_url: default_storage_url(),
        }
    }
}

/// Email delivery configuration.
///
/// With neither `smtp` nor `brevo_api_key` set, emails are logged instead of
/// sent.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    /// Sender address.
    #[serde(default = "default_from_address")]
    pub from_address: String,
    /// Sender display name.
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// SMTP relay (e.g. Brevo SMTP).
    #[serde(default)]
    pub smtp: Option<SmtpSettings>,
    /// Brevo transactional email API key.
    #[serde(default)]
    pub brevo_api_key: Option<String>,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            from_address: default_from_address(),
            from_name: default_from_name(),
            smtp: None,
            brevo_api_key: None,
        }
    }
}

/// SMTP relay settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpSettings {
    /// SMTP host.
    pub host: String,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    /// Login name.
    pub username: String,
    /// Password or API key.
    pub password: String,
}

/// Imgflip configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ImgflipConfig {
    /// Endpoint returning the popular template list.
    #[serde(default = "default_imgflip_url")]
    pub api_url: String,
}

impl Default for ImgflipConfig {
    fn default() -> Self {
        Self {
            api_url: default_imgflip_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./public/uploads")
}

fn default_storage_url() -> String {
    "/uploads".to_string()
}

fn default_from_address() -> String {
    "noreply@memehub.com".to_string()
}

fn default_from_name() -> String {
    "MemeHub".to_string()
}

const fn default_smtp_port() -> u16 {
    587
}

fn default_imgflip_url() -> String {
    "https://api.imgflip.com/get_memes".to_string()
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `MEMEHUB_ENV`)
    /// 4. Environment variables with `MEMEHUB_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let _ = dotenvy::dotenv();
        let env = std::env::var("MEMEHUB_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("MEMEHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("MEMEHUB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
