use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;

/// Name of the environment variable carrying the blob storage connection string.
pub const STORAGE_CONNECTION_VAR: &str = "AzureWebJobsStorage";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// The storage connection string lacks a field needed to address or sign blobs.
    #[error("{0} not found in storage connection string")]
    MissingConnectionField(&'static str),
}

/// Runtime configuration for the resume insights service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Endpoint of the document analysis (form recognizer) resource.
    pub form_endpoint: String,
    /// Subscription key for the document analysis resource.
    pub form_key: String,
    /// Endpoint of the language (text analytics) resource.
    pub text_endpoint: String,
    /// Subscription key for the language resource.
    pub text_key: String,
    /// Cosmos DB account endpoint.
    pub cosmos_endpoint: String,
    /// Cosmos DB master key (base64).
    pub cosmos_key: String,
    /// Database holding resume records.
    pub cosmos_database: String,
    /// Collection holding resume records.
    pub cosmos_container: String,
    /// Parsed blob storage connection string.
    pub storage: StorageConnection,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Language hint attached to text analytics documents.
    pub text_language: String,
    /// Default delay between long-running operation polls.
    pub poll_interval: Duration,
    /// Upper bound on how long a long-running operation is polled.
    pub poll_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            form_endpoint: load_env("FORM_ENDPOINT")?,
            form_key: load_env("FORM_KEY")?,
            text_endpoint: load_env("TEXT_ENDPOINT")?,
            text_key: load_env("TEXT_KEY")?,
            cosmos_endpoint: load_env("COSMOS_DB_ENDPOINT")?,
            cosmos_key: load_env("COSMOS_DB_KEY")?,
            cosmos_database: load_env("COSMOS_DB_DATABASE")?,
            cosmos_container: load_env("COSMOS_DB_CONTAINER")?,
            storage: StorageConnection::parse(&load_env(STORAGE_CONNECTION_VAR)?)?,
            server_port: parse_optional("SERVER_PORT")?,
            text_language: load_env_optional("TEXT_LANGUAGE").unwrap_or_else(|| "en".into()),
            poll_interval: Duration::from_millis(
                parse_optional("POLL_INTERVAL_MS")?.unwrap_or(1_000),
            ),
            poll_timeout: Duration::from_secs(parse_optional("POLL_TIMEOUT_SECS")?.unwrap_or(300)),
        })
    }
}

/// Blob storage account settings extracted from a `key=value;...` connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConnection {
    /// Storage account name.
    pub account_name: String,
    /// Base64 shared account key used for SAS signing.
    pub account_key: String,
    /// Blob service base URL, without a trailing slash.
    pub blob_endpoint: String,
}

impl StorageConnection {
    /// Parse a storage connection string.
    ///
    /// `BlobEndpoint` wins over the endpoint derived from `DefaultEndpointsProtocol`,
    /// `AccountName` and `EndpointSuffix`, which lets emulators be addressed directly.
    pub fn parse(connection_string: &str) -> Result<Self, ConfigError> {
        let mut account_name = None;
        let mut account_key = None;
        let mut protocol = None;
        let mut suffix = None;
        let mut blob_endpoint = None;

        for pair in connection_string.split(';') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "AccountName" => account_name = Some(value.to_string()),
                "AccountKey" => account_key = Some(value.to_string()),
                "DefaultEndpointsProtocol" => protocol = Some(value.to_string()),
                "EndpointSuffix" => suffix = Some(value.to_string()),
                "BlobEndpoint" => blob_endpoint = Some(value.trim_end_matches('/').to_string()),
                _ => {}
            }
        }

        let account_name = account_name.ok_or(ConfigError::MissingConnectionField("AccountName"))?;
        let account_key = account_key.ok_or(ConfigError::MissingConnectionField("AccountKey"))?;
        let blob_endpoint = blob_endpoint.unwrap_or_else(|| {
            format!(
                "{}://{}.blob.{}",
                protocol.as_deref().unwrap_or("https"),
                account_name,
                suffix.as_deref().unwrap_or("core.windows.net"),
            )
        });

        Ok(Self {
            account_name,
            account_key,
            blob_endpoint,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        form_endpoint = %config.form_endpoint,
        text_endpoint = %config.text_endpoint,
        cosmos_endpoint = %config.cosmos_endpoint,
        database = %config.cosmos_database,
        container = %config.cosmos_container,
        storage_account = %config.storage.account_name,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
