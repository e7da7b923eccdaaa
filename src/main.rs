use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use tracing::info;

use websocket_stat::endpoints::{request_router, AppState};
use websocket_stat::{Config, FileSink, LogSink, LogTemplates, Monitor, TracingSink, VariableRegistry};

/// Websocket proxy that counts and logs the frames passing through it.
#[derive(Parser, Debug)]
#[command(name = "websocket-stat", version)]
struct Args {
    /// Path to configuration file (JSON).
    #[arg(short, long, env = "WS_STAT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the config file.
    #[arg(short, long, env = "WS_STAT_LISTEN")]
    listen: Option<std::net::SocketAddr>,

    /// Upstream websocket server (host:port), overrides the config file.
    #[arg(short, long, env = "WS_STAT_UPSTREAM")]
    upstream: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "WS_STAT_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config file: {:?}", path))?,
        None => Config::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(upstream) = args.upstream {
        config.upstream = Some(upstream);
    }
    config.validate().context("Invalid configuration")?;

    let sink: Arc<dyn LogSink> = match &config.log_path {
        Some(path) => Arc::new(
            FileSink::open(path)
                .with_context(|| format!("Failed to open websocket log: {:?}", path))?,
        ),
        None => Arc::new(TracingSink),
    };
    let templates = LogTemplates::compile(&config.log_format, &VariableRegistry::builtin());
    let monitor = Arc::new(Monitor::new(templates, sink, config.limits()));

    let addr = config.listen;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        upstream = ?config.upstream,
        stat_path = %config.stat_path,
        "starting websocket-stat"
    );
    let state = AppState::new(monitor, config);

    let service = make_service_fn(move |conn: &AddrStream| {
        let remote_addr = conn.remote_addr();
        let state = state.clone();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                request_router(req, state.clone(), remote_addr)
            }))
        }
    });
    let server = Server::try_bind(&addr)
        .with_context(|| format!("Failed to bind {}", addr))?
        .serve(service);

    info!("Listening at http://{}", addr);

    server.await.context("Server error")?;

    Ok(())
}
