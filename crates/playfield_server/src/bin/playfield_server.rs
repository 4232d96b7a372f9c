//! # PLAYFIELD Server
//!
//! ```bash
//! # Defaults: 0.0.0.0:3000, lyrics lookup disabled
//! ./playfield_server
//!
//! # With a config file and an LRCLIB-compatible upstream
//! RUST_LOG=playfield_server=debug ./playfield_server \
//!     --config server.toml --lyrics-upstream 127.0.0.1:8081
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use playfield_server::{ConfiguredProvider, InMemoryStore, Server, ServerConfig, ServerResult};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// HTTP API for the PLAYFIELD site.
#[derive(Debug, Parser)]
#[command(name = "playfield_server", version, about)]
struct Args {
    /// Listen address; overrides the config file.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// `host:port` of an LRCLIB-compatible lyrics service (plain HTTP).
    #[arg(long)]
    lyrics_upstream: Option<String>,
}

fn load_config(args: &Args) -> ServerResult<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_toml_file(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(upstream) = &args.lyrics_upstream {
        config.lyrics.upstream = Some(upstream.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn run(config: ServerConfig) -> ServerResult<()> {
    let lyrics = ConfiguredProvider::from_config(&config.lyrics);
    match &config.lyrics.upstream {
        Some(upstream) => info!(%upstream, "lyrics lookup enabled"),
        None => info!("lyrics lookup disabled; every track falls back"),
    }

    let server = Server::bind(config, InMemoryStore::new(), lyrics).await?;
    server
        .serve(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(%err, "signal handler failed");
            }
        })
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(version = env!("CARGO_PKG_VERSION"), bind = %config.bind, "PLAYFIELD server starting");
    match run(config).await {
        Ok(()) => {
            info!("server stopped");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(%err, "server failed");
            ExitCode::FAILURE
        }
    }
}
