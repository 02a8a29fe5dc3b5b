//! rtcm-relay: take an RTCM 3 feed from a GNSS receiver or caster and serve a
//! copy of it to every client that connects.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use rtcm_relay::server::config::parse_duration;
use rtcm_relay::{Relay, RelayConfig};

#[derive(Parser)]
#[command(name = "rtcm-relay")]
#[command(about = "Simple GNSS correction relay", long_about = None)]
#[command(version)]
struct Cli {
    /// GNSS receiver end-point
    #[arg(long, default_value = "192.168.59.22:8855")]
    receiver: String,

    /// Local listening address for clients
    #[arg(long, default_value = "0.0.0.0:8855")]
    listener: SocketAddr,

    /// How often stale connections are purged
    #[arg(long, default_value = "1m", value_parser = parse_duration)]
    reap: Duration,

    /// Per-client write timeout (0 disables the deadline)
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    timeout: Duration,

    /// Maximum connected clients (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_clients: usize,

    /// Extra details (per-frame logging)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = RelayConfig::new(cli.receiver)
        .listen(cli.listener)
        .reap_interval(cli.reap)
        .write_timeout(cli.timeout)
        .max_subscribers(cli.max_clients);

    let relay = match Relay::new(config) {
        Ok(relay) => relay,
        Err(e) => {
            tracing::error!(error = %e, "Unable to start relay");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Unable to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };

    match relay.run_until(shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Relay stopped");
            ExitCode::FAILURE
        }
    }
}
