//! Configuration module for the EVM indexer process.
//!
//! Values are loaded from a JSON config file (path from `--config`/`CONFIG`),
//! with secrets able to reference an environment variable via
//! [`LiteralOrEnv`] instead of being written in plaintext.

use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::IpAddr;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// CLI arguments for the indexer process.
#[derive(Parser, Debug)]
#[command(name = "evm-indexer")]
#[command(about = "EVM chain indexer: ingestion, derivation, verification")]
struct CliArgs {
    /// Path to the JSON configuration file.
    #[arg(long, short, env = "CONFIG", default_value = "config.json")]
    config: PathBuf,
}

/// Wraps a config value that may be given literally or as an environment
/// variable reference (`$VAR` or `${VAR}`), so secrets like `database.url`
/// and `rpc.urls` never need to live in a committed config file.
///
/// Accepted forms:
/// - Literal: `"postgres://localhost/evm_indexer"`
/// - Simple env var: `"$DATABASE_URL"`
/// - Braced env var: `"${DATABASE_URL}"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralOrEnv<T>(T);

impl<T> LiteralOrEnv<T> {
    pub fn inner(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }

    fn parse_env_var_syntax(s: &str) -> Option<String> {
        if let Some(inner) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
            Some(inner.to_string())
        } else if let Some(name) = s.strip_prefix('$') {
            if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                Some(name.to_string())
            } else {
                None
            }
        } else {
            None
        }
    }
}

impl<T> Deref for LiteralOrEnv<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for LiteralOrEnv<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<'de, T> Deserialize<'de> for LiteralOrEnv<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let value = if let Some(var_name) = Self::parse_env_var_syntax(&s) {
            std::env::var(&var_name).map_err(|_| {
                serde::de::Error::custom(format!(
                    "environment variable '{var_name}' not found (referenced as '{s}')"
                ))
            })?
        } else {
            s
        };
        value
            .parse::<T>()
            .map(LiteralOrEnv)
            .map_err(|e| serde::de::Error::custom(format!("failed to parse value: {e}")))
    }
}

impl<T: Serialize> Serialize for LiteralOrEnv<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: LiteralOrEnv<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    pub urls: Vec<LiteralOrEnv<Url>>,
}

fn default_confirmations() -> u64 {
    2
}

fn default_retry_backoff_secs() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    #[serde(default = "default_retry_backoff_secs")]
    pub retry_backoff_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            confirmations: default_confirmations(),
            retry_backoff_secs: default_retry_backoff_secs(),
        }
    }
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("./backups")
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BackupConfig {
    #[serde(default = "default_backup_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub honeypot_database: Option<String>,
    #[serde(default)]
    pub maintenance_url: Option<LiteralOrEnv<String>>,
}

fn default_restart_after() -> u32 {
    3
}

fn default_exit_after() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_restart_after")]
    pub restart_after: u32,
    #[serde(default = "default_exit_after")]
    pub exit_after: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            restart_after: default_restart_after(),
            exit_after: default_exit_after(),
        }
    }
}

mod config_defaults {
    use std::env;
    use std::net::IpAddr;

    pub const DEFAULT_PORT: u16 = 8080;
    pub const DEFAULT_HOST: &str = "0.0.0.0";

    pub fn default_port() -> u16 {
        env::var("PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_PORT)
    }

    pub fn default_host() -> IpAddr {
        env::var("HOST")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(IpAddr::V4(DEFAULT_HOST.parse().unwrap()))
    }
}

/// Root configuration, loaded once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "config_defaults::default_port")]
    port: u16,
    #[serde(default = "config_defaults::default_host")]
    host: IpAddr,
    database: DatabaseConfig,
    rpc: RpcConfig,
    #[serde(default)]
    ingest: IngestConfig,
    #[serde(default)]
    backup: BackupConfig,
    #[serde(default)]
    health: HealthConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn host(&self) -> IpAddr {
        self.host
    }

    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    pub fn rpc_urls(&self) -> Vec<Url> {
        self.rpc.urls.iter().map(|u| u.inner().clone()).collect()
    }

    pub fn ingest(&self) -> &IngestConfig {
        &self.ingest
    }

    pub fn backup(&self) -> &BackupConfig {
        &self.backup
    }

    pub fn health(&self) -> &HealthConfig {
        &self.health
    }

    /// Loads configuration from `--config`/`CONFIG` (default `config.json`).
    /// Missing fields fall back to `LiteralOrEnv`-resolved environment
    /// variables or the hardcoded defaults above.
    pub fn load() -> Result<Self, ConfigError> {
        let cli_args = CliArgs::parse();
        let config_path = Path::new(&cli_args.config)
            .canonicalize()
            .map_err(|e| ConfigError::FileRead(cli_args.config, e))?;
        Self::load_from_path(config_path)
    }

    fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::FileRead(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_or_env_resolves_a_literal() {
        let json = r#""postgres://localhost/db""#;
        let value: LiteralOrEnv<String> = serde_json::from_str(json).unwrap();
        assert_eq!(value.into_inner(), "postgres://localhost/db");
    }

    #[test]
    fn literal_or_env_resolves_braced_env_var() {
        std::env::set_var("EVM_INDEXER_TEST_DB_URL", "postgres://env/db");
        let json = r#""${EVM_INDEXER_TEST_DB_URL}""#;
        let value: LiteralOrEnv<String> = serde_json::from_str(json).unwrap();
        assert_eq!(value.into_inner(), "postgres://env/db");
        std::env::remove_var("EVM_INDEXER_TEST_DB_URL");
    }

    #[test]
    fn literal_or_env_errors_on_missing_env_var() {
        let json = r#""$EVM_INDEXER_TEST_DOES_NOT_EXIST""#;
        let result: Result<LiteralOrEnv<String>, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
