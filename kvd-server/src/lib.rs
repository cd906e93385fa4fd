//! The event loop, client protocol state machine, command dispatch, cron
//! sweep, and auxiliary HTTP facade for kvd.
//!
//! Grounded throughout on `original_source/redis.go` and the `ae/` event
//! loop package; see `DESIGN.md` for the full per-module ledger.

pub mod client;
pub mod config;
pub mod cron;
pub mod dispatch;
pub mod error;
pub mod event_loop;
pub mod handler;
pub mod http_facade;
pub mod metrics_recorder;
pub mod server;

pub use config::ServerConfig;
pub use error::{ConfigError, DispatchError};
pub use server::Server;
