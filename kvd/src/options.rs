//! Command-line/env configuration surface, grounded on the
//! `clap::Parser`-plus-`#[arg(env = ...)]` style in the teacher's
//! `readyset/src/lib.rs::Options`.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Starts a kvd server.
#[derive(Debug, Parser)]
#[command(name = "kvd", version, about)]
pub struct Options {
    /// TCP port the client protocol listens on.
    #[arg(long, env = "KVD_PORT")]
    pub port: Option<u16>,

    /// Optional bind address for the auxiliary HTTP admin facade.
    #[arg(long, env = "KVD_HTTP_ADDR")]
    pub http_addr: Option<SocketAddr>,

    /// Optional TOML config file; CLI flags and environment variables
    /// override values it supplies.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Active-expiration cron tick interval, in milliseconds.
    #[arg(long, env = "KVD_CRON_INTERVAL_MS")]
    pub cron_interval_ms: Option<u64>,

    /// `tracing_subscriber::EnvFilter` directive string.
    #[arg(long, env = "KVD_LOG", default_value = "info")]
    pub log_filter: String,
}
