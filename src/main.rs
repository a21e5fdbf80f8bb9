use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use murmur::api;
use murmur::cli;
use murmur::config_error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse args and env vars
    let args = cli::Cli::parse();
    let settings = args.into_settings();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "murmur=debug,tower_http=debug".into());
    if settings.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    settings.validate()?;

    // Socket server listen address setup
    let listen_address: IpAddr = settings
        .listen_address
        .parse::<IpAddr>()
        .map_err(|err| config_error!("Invalid ip address {}: {}", settings.listen_address, err))?;
    let socket_address = SocketAddr::from((listen_address, settings.listen_port));

    let state = api::AppState::new(&settings);
    let sweeper = state.limiter.clone().spawn_sweeper();
    let registry = state.registry.clone();

    // Build Axum Router
    let api = api::api(state).await?;

    // Start server
    info!("Starting Murmur on {}", socket_address);
    let listener = tokio::net::TcpListener::bind(socket_address).await?;
    axum::serve(listener, api)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, draining chat room");
    registry.shutdown().await?;
    sweeper.abort();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        // without a signal handler the server runs until killed
        std::future::pending::<()>().await;
    }
}
