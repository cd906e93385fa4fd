//! Local error types for the server crate.

use thiserror::Error;

/// The three user-visible `-ERR:` kinds from `spec.md` §7, also used as the
/// `kind` label on the `kvd_commands_errors_total` metric.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    #[error("unknow command")]
    UnknownCommand,
    #[error("wrong number of args")]
    WrongArity,
    #[error("wrong type")]
    WrongType,
}

impl DispatchError {
    /// Label value for `kvd_commands_errors_total{kind}`.
    pub fn metric_label(self) -> &'static str {
        match self {
            DispatchError::UnknownCommand => "unknown_command",
            DispatchError::WrongArity => "wrong_arity",
            DispatchError::WrongType => "wrong_type",
        }
    }
}

/// Config-file/CLI merge failures, surfaced through `anyhow::Context` in
/// the `kvd` binary's `main`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid http_addr in config: {0}")]
    InvalidHttpAddr(#[from] std::net::AddrParseError),
}
