//! Binary entry point: parse CLI/env options, merge an optional config
//! file, install logging and metrics, bind, and run.
//!
//! Mirrors `original_source/redis.go`'s `main`: load config, bind listen
//! socket, create the loop, register handlers, run until stopped.

mod logging;
mod options;

use anyhow::Context;
use clap::Parser;
use kvd_server::config::ConfigFile;
use kvd_server::{Server, ServerConfig};

use options::Options;

fn main() -> anyhow::Result<()> {
    let options = Options::parse();
    logging::init(&options.log_filter);
    kvd_server::metrics_recorder::install();
    kvd_server::metrics_recorder::describe();

    let file = options
        .config
        .as_ref()
        .map(|path| ConfigFile::load(path))
        .transpose()
        .context("loading config file")?;

    let config = ServerConfig::merge(
        file,
        options.port,
        options.http_addr.map(|a| a.to_string()),
        options.cron_interval_ms,
    )
    .context("merging configuration")?;

    tracing::info!(port = config.port, http_addr = ?config.http_addr, "starting kvd");

    let mut server = Server::bind(&config).context("binding server")?;
    server.run().context("server loop failed")?;
    Ok(())
}
