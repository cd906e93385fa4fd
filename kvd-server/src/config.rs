//! Config-file loading and CLI/env merge, grounded on
//! `original_source/conf/conf.go`'s `LoadConfig` reading `config.toml`,
//! extended with CLI/env precedence the way the teacher's `Options` layers
//! `#[arg(env = ...)]` over file-provided values.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// The on-disk shape of an optional TOML config file. Every field is
/// optional: only fields present in the file override the built-in
/// defaults, and CLI/env values always take precedence over the file.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub port: Option<u16>,
    pub http_addr: Option<String>,
    pub cron_interval_ms: Option<u64>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&text)?;
        Ok(file)
    }
}

/// Built-in defaults, used when neither the CLI/env nor the config file
/// supply a value.
pub const DEFAULT_PORT: u16 = 7878;
pub const DEFAULT_CRON_INTERVAL_MS: u64 = 100;

/// The fully resolved server configuration, after merging CLI/env values
/// over an optional config file's values over the built-in defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub http_addr: Option<SocketAddr>,
    pub cron_interval_ms: u64,
}

impl ServerConfig {
    /// Merge CLI/env-supplied values over an optional config file's values
    /// over the built-in defaults. `cli_*` parameters are `None` when the
    /// corresponding flag/env var was not given, which is what lets the
    /// file's value show through.
    pub fn merge(
        file: Option<ConfigFile>,
        cli_port: Option<u16>,
        cli_http_addr: Option<String>,
        cli_cron_interval_ms: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let file = file.unwrap_or_default();
        let port = cli_port.or(file.port).unwrap_or(DEFAULT_PORT);
        let http_addr = cli_http_addr
            .or(file.http_addr)
            .map(|s| s.parse())
            .transpose()?;
        let cron_interval_ms = cli_cron_interval_ms
            .or(file.cron_interval_ms)
            .unwrap_or(DEFAULT_CRON_INTERVAL_MS);
        Ok(ServerConfig {
            port,
            http_addr,
            cron_interval_ms,
        })
    }
}
