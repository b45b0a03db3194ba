//! anvild: reference harness wiring the Anvil core crates into a runnable
//! process. The full HTTP API and job driver are assumed external (see
//! SPEC_FULL.md §1); this binary exists to prove the core crates compose
//! and to run the background sweeps against an in-memory store.

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod config;
mod error;
mod health;
mod scheduler;
mod server;

use config::DaemonConfig;
use error::DaemonResult;
use server::Server;

#[derive(Parser)]
#[command(name = "anvild")]
#[command(about = "Anvil reference daemon: scheduler and health endpoint", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML/YAML/JSON, resolved by the `config` crate)
    #[arg(short, long, env = "ANVIL_CONFIG")]
    config: Option<String>,

    /// Listen address for the health/admin HTTP surface
    #[arg(short, long, env = "ANVIL_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level
    #[arg(long, env = "ANVIL_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "ANVIL_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let mut config = DaemonConfig::load(cli.config.as_deref())?;

    if let Some(listen) = cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|err| error::DaemonError::Config(format!("invalid listen address: {err}")))?;
    }

    println!(
        r#"
   anvild {}
   listening on {}
   reclaim every {}s, retention every {}s, agreement batch every {}s
"#,
        env!("CARGO_PKG_VERSION"),
        config.server.listen_addr,
        config.scheduler.reclaim_interval_secs,
        config.scheduler.retention_interval_secs,
        config.scheduler.agreement_interval_secs,
    );

    let server = Server::new(config)?;
    server.run().await
}
