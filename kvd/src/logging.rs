//! Structured logging init, replacing the original's
//! `log.SetFlags(log.Lshortfile | log.Ldate | log.Ltime)` call at the top
//! of `original_source/redis.go`'s `main` with the ecosystem-idiomatic
//! `tracing` equivalent.

use tracing_subscriber::EnvFilter;

/// Install a `tracing_subscriber::fmt` subscriber as the global default.
/// Must be called once, before `Server::bind`.
pub fn init(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();
}
