//! Configuration management with validation and defaults
//!
//! Values come from a TOML file (optional), then `ROULETTE_*` environment
//! variables, then validation.

use crate::errors::{ConfigurationError, RouletteResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RouletteConfig {
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub entropy: EntropyConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Who may trigger a table's spin
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpinAuthority {
    OwnerOnly,
    Anyone,
}

impl std::str::FromStr for SpinAuthority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner_only" => Ok(SpinAuthority::OwnerOnly),
            "anyone" => Ok(SpinAuthority::Anyone),
            other => Err(format!("unknown spin authority '{}'", other)),
        }
    }
}

/// Table rules applied by the state machine
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TableConfig {
    pub max_bets_per_table: usize,
    pub min_bet: u64,
    pub max_bet: Option<u64>,
    pub spin_authority: SpinAuthority,
    /// Debited from the owner on create, returned on close
    pub rent_reserve: u64,
    pub max_identifier_len: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_bets_per_table: 13,
            min_bet: 1,
            max_bet: None,
            spin_authority: SpinAuthority::OwnerOnly,
            rent_reserve: 0,
            max_identifier_len: 64,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntropyMode {
    /// Schnorrkel-signed spins with a stored proof
    Vrf,
    Os,
    Seeded,
}

impl std::str::FromStr for EntropyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vrf" => Ok(EntropyMode::Vrf),
            "os" => Ok(EntropyMode::Os),
            "seeded" => Ok(EntropyMode::Seeded),
            other => Err(format!("unknown entropy mode '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EntropyConfig {
    pub mode: EntropyMode,
    /// Required when `mode = "seeded"`
    pub seed: Option<u64>,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            mode: EntropyMode::Vrf,
            seed: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Rocksdb,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_directory: String,
    /// Whether to clear the database on startup (testing only!)
    pub clear_on_start: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Rocksdb,
            data_directory: "./DB/roulette_data".to_string(),
            clear_on_start: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub require_signatures: bool,
    /// Dev-only funding endpoint
    pub allow_airdrop: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            request_timeout_secs: 30,
            require_signatures: true,
            allow_airdrop: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
    pub enable_metrics: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            enable_metrics: true,
        }
    }
}

impl RouletteConfig {
    /// In-memory, unsigned, airdrop-enabled setup for local play and tests
    pub fn development() -> Self {
        Self {
            table: TableConfig {
                spin_authority: SpinAuthority::Anyone,
                ..Default::default()
            },
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                ..Default::default()
            },
            api: ApiConfig {
                require_signatures: false,
                allow_airdrop: true,
                ..Default::default()
            },
            monitoring: MonitoringConfig {
                log_level: "debug".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> RouletteResult<RouletteConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => RouletteConfig::default(),
        };

        self.apply_overrides(&mut config, |key| env::var(key).ok())?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> RouletteResult<RouletteConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    /// Apply `ROULETTE_*` overrides read through `lookup`
    fn apply_overrides<F>(&self, config: &mut RouletteConfig, lookup: F) -> RouletteResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("ROULETTE_API_HOST") {
            config.api.host = host;
        }
        if let Some(port) = lookup("ROULETTE_API_PORT") {
            config.api.port = parse_override("ROULETTE_API_PORT", port, "Invalid port number")?;
        }
        if let Some(data_dir) = lookup("ROULETTE_DATA_DIR") {
            config.storage.data_directory = data_dir;
        }
        if let Some(authority) = lookup("ROULETTE_SPIN_AUTHORITY") {
            config.table.spin_authority =
                parse_override("ROULETTE_SPIN_AUTHORITY", authority, "Expected owner_only or anyone")?;
        }
        if let Some(max_bets) = lookup("ROULETTE_MAX_BETS") {
            config.table.max_bets_per_table =
                parse_override("ROULETTE_MAX_BETS", max_bets, "Invalid bet count")?;
        }
        if let Some(mode) = lookup("ROULETTE_ENTROPY") {
            config.entropy.mode = parse_override("ROULETTE_ENTROPY", mode, "Expected vrf, os or seeded")?;
        }
        if let Some(require) = lookup("ROULETTE_REQUIRE_SIGNATURES") {
            config.api.require_signatures =
                parse_override("ROULETTE_REQUIRE_SIGNATURES", require, "Invalid boolean value")?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self, config: &RouletteConfig) -> RouletteResult<()> {
        let table = &config.table;

        if table.max_bets_per_table == 0 {
            return Err(invalid("table.max_bets_per_table", "0", "Tables must accept at least one bet"));
        }
        if table.min_bet == 0 {
            return Err(invalid("table.min_bet", "0", "Bets must be positive"));
        }
        if let Some(max_bet) = table.max_bet {
            if max_bet < table.min_bet {
                return Err(invalid(
                    "table.max_bet",
                    &max_bet.to_string(),
                    "max_bet cannot be below min_bet",
                ));
            }
        }
        if table.max_identifier_len == 0 {
            return Err(invalid("table.max_identifier_len", "0", "Identifiers cannot be empty"));
        }

        if config.entropy.mode == EntropyMode::Seeded && config.entropy.seed.is_none() {
            return Err(ConfigurationError::MissingRequired("entropy.seed".to_string()).into());
        }

        if config.storage.backend == StorageBackend::Rocksdb && config.storage.data_directory.is_empty() {
            return Err(ConfigurationError::MissingRequired("storage.data_directory".to_string()).into());
        }

        if config.api.port == 0 {
            return Err(invalid("api.port", "0", "Port cannot be zero"));
        }
        if config.api.request_timeout_secs == 0 {
            return Err(invalid("api.request_timeout_secs", "0", "Timeout must be positive"));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &RouletteConfig, path: &str) -> RouletteResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

fn parse_override<T: std::str::FromStr>(field: &str, value: String, reason: &str) -> RouletteResult<T> {
    value.parse().map_err(|_| {
        ConfigurationError::InvalidValue {
            field: field.to_string(),
            value,
            reason: reason.to_string(),
        }
        .into()
    })
}

fn invalid(field: &str, value: &str, reason: &str) -> crate::errors::RouletteError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Builder pattern for creating configurations
pub struct ConfigBuilder {
    config: RouletteConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RouletteConfig::default(),
        }
    }

    pub fn table(mut self, table: TableConfig) -> Self {
        self.config.table = table;
        self
    }

    pub fn entropy(mut self, entropy: EntropyConfig) -> Self {
        self.config.entropy = entropy;
        self
    }

    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    pub fn api(mut self, api: ApiConfig) -> Self {
        self.config.api = api;
        self
    }

    pub fn monitoring(mut self, monitoring: MonitoringConfig) -> Self {
        self.config.monitoring = monitoring;
        self
    }

    pub fn build(self) -> RouletteConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &str) -> RouletteResult<()> {
    ConfigLoader::new().save(&RouletteConfig::default(), path)
}
