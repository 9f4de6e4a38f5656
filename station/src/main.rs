//! Station server: hosts migrating runners, or serves the discovery registry.

mod host;
mod lease;
mod registry;
mod roster;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use axum::Router;
use clap::{Args, Parser, Subcommand};
use tokio::runtime::Handle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use tag_runner::core::station::STATION_SERVICE_TYPE;
use tag_runner::io::http_station::StationTimeouts;
use tag_runner::io::protocol::Registration;
use tag_runner::io::registry_client::HttpDirectory;
use tag_runner::io::sleeper::ThreadSleeper;

use crate::host::{HostConfig, StationHost};
use crate::lease::LeaseKeeper;
use crate::registry::RegistryState;
use crate::state::AppState;

#[derive(Parser)]
#[command(name = "station")]
#[command(about = "Station host and discovery registry for the tag game")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Host runners and register with a discovery registry.
    Host(HostArgs),
    /// Serve the in-memory discovery registry.
    Registry(RegistryArgs),
}

#[derive(Args)]
struct HostArgs {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "4001")]
    port: u16,

    /// Station identity (defaults to `station-<port>`)
    #[arg(long)]
    id: Option<String>,

    /// Discovery registry base URL
    #[arg(long, default_value = "http://127.0.0.1:4000")]
    registry: String,

    /// URL other processes use to reach this station (defaults to the bind address)
    #[arg(long)]
    public_url: Option<String>,

    /// Registration lease in seconds; renewed at half this interval
    #[arg(long, default_value = "30")]
    lease_secs: u64,

    /// Extra advertised property, `key=value`; repeatable
    #[arg(long = "prop", value_parser = parse_property)]
    properties: Vec<(String, String)>,
}

#[derive(Args)]
struct RegistryArgs {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "4000")]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tag_station=info".parse()?)
                .add_directive("tag_runner=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Host(args) => run_host(args).await,
        Command::Registry(args) => run_registry(args).await,
    }
}

async fn run_host(args: HostArgs) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    let id = args
        .id
        .clone()
        .unwrap_or_else(|| format!("station-{}", args.port));
    let public_url = args
        .public_url
        .clone()
        .unwrap_or_else(|| format!("http://{addr}"));

    let directory = HttpDirectory::new(&args.registry, StationTimeouts::default())?;
    let host = StationHost::new(
        HostConfig {
            id: id.clone(),
            endpoint: public_url.clone(),
            properties: args.properties,
        },
        Arc::new(directory),
        Arc::new(ThreadSleeper),
        Handle::current(),
    );

    let keeper = LeaseKeeper::new(
        &args.registry,
        Registration {
            id: id.clone(),
            url: public_url.clone(),
            service_type: STATION_SERVICE_TYPE.to_string(),
            lease_secs: args.lease_secs,
        },
    )?;

    let app = Router::new()
        .merge(routes::station_router())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(host));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(station = %id, addr = %addr, url = %public_url, "station listening");

    let renewal = keeper.clone().spawn();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    renewal.abort();
    if let Err(err) = keeper.deregister().await {
        warn!(station = %id, "deregistration failed: {err:#}");
    }
    info!(station = %id, "station stopped");
    Ok(())
}

async fn run_registry(args: RegistryArgs) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    let app = Router::new()
        .merge(registry::registry_router())
        .layer(TraceLayer::new_for_http())
        .with_state(RegistryState::default());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(addr = %addr, "registry listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("ctrl-c handler failed: {err}");
    }
    info!("shutting down");
}

fn parse_property(raw: &str) -> Result<(String, String)> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("expected key=value, got `{raw}`");
    };
    if key.is_empty() {
        bail!("property key is empty in `{raw}`");
    }
    Ok((key.to_string(), value.to_string()))
}
