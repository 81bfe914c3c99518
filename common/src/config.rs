// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use config::{Config as ConfigFile, File, Environment};

/// Central configuration for the relay and the signing client
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub relay: RelayConfig,
    pub storage: StorageConfig,
    pub client: ClientConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bind_addr: String,
    /// Origins that receive CORS headers
    pub allowed_origins: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// S3-compatible object storage (AWS, Cloudflare R2, MinIO)
    S3,
    /// Process-local map, contents are lost on restart
    Memory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

/// S3 settings once every required value is present
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl StorageConfig {
    /// `None` when credentials or endpoint are missing
    pub fn s3_settings(&self) -> Option<S3Settings> {
        let non_empty = |v: &Option<String>| v.as_ref().filter(|s| !s.is_empty()).cloned();
        Some(S3Settings {
            bucket: self.bucket.clone(),
            endpoint: non_empty(&self.endpoint)?,
            region: self.region.clone(),
            access_key_id: non_empty(&self.access_key_id)?,
            secret_access_key: non_empty(&self.secret_access_key)?,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the session relay
    pub backend_url: String,
    /// JSON-RPC endpoint of the wallet
    pub rpc_url: String,
    pub wallet_core_address: String,
    pub domain_name: String,
    pub domain_version: String,
    pub executor: String,
    pub validator: String,
    /// Seconds on each side of "now" a new session is valid for
    pub validity_secs: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            relay: RelayConfig::default(),
            storage: StorageConfig::default(),
            client: ClientConfig::default(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3001".to_string(),
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            bucket: "mesh-context".to_string(),
            endpoint: None,
            region: "auto".to_string(),
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3001".to_string(),
            rpc_url: "http://localhost:8545".to_string(),
            wallet_core_address: "0x80296FF8D1ED46f8e3C7992664D13B833504c2Bb".to_string(),
            domain_name: crate::eip712::DEFAULT_DOMAIN_NAME.to_string(),
            domain_version: crate::eip712::DEFAULT_DOMAIN_VERSION.to_string(),
            executor: "0x1e8e3a338046913149c84002e22744780200e3be".to_string(),
            validator: "0x0000000000000000000000000000000000000001".to_string(),
            validity_secs: crate::models::session::DEFAULT_VALIDITY_SECS,
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        tracing::info!("Loading configuration from {}", config_dir.display());
        tracing::info!("Using run mode: {}", run_mode);

        let config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // e.g. APP__STORAGE__BUCKET, APP__RELAY__BIND_ADDR
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Load from files, falling back to plain environment variables
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => {
                tracing::info!("Configuration loaded from files and environment");
                config
            },
            Err(e) => {
                tracing::warn!("Failed to load configuration from files: {}", e);
                tracing::info!("Falling back to environment variables only");
                Self::from_plain_env(|key| env::var(key).ok())
            }
        }
    }

    /// Build from un-prefixed variables (`PORT`, `S3_BUCKET`, `BACKEND_URL`, ...)
    pub fn from_plain_env(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind_addr = var("RELAY_ADDR")
            .or_else(|| var("PORT").map(|port| format!("127.0.0.1:{}", port)))
            .unwrap_or(defaults.relay.bind_addr);

        let allowed_origins = var("ALLOWED_ORIGINS")
            .map(|v| v.split(',').map(|o| o.trim().to_string()).filter(|o| !o.is_empty()).collect())
            .unwrap_or(defaults.relay.allowed_origins);

        let backend = match var("STORAGE_BACKEND").map(|v| v.to_lowercase()).as_deref() {
            Some("memory") => StorageBackend::Memory,
            _ => StorageBackend::S3,
        };

        Self {
            log_level: var("LOG_LEVEL").unwrap_or(defaults.log_level),
            relay: RelayConfig { bind_addr, allowed_origins },
            storage: StorageConfig {
                backend,
                bucket: var("S3_BUCKET").unwrap_or(defaults.storage.bucket),
                endpoint: var("S3_ENDPOINT"),
                region: var("S3_REGION").unwrap_or(defaults.storage.region),
                access_key_id: var("S3_ACCESS_KEY"),
                secret_access_key: var("S3_SECRET_KEY"),
            },
            client: ClientConfig {
                backend_url: var("BACKEND_URL").unwrap_or(defaults.client.backend_url),
                rpc_url: var("RPC_URL").unwrap_or(defaults.client.rpc_url),
                ..defaults.client
            },
        }
    }
}
