use airrohr2mqtt::build_router;
use airrohr2mqtt::config::Config;
use airrohr2mqtt::handlers::AppState;
use airrohr2mqtt::publisher::MqttPublisher;
use anyhow::Result;
use clap::Parser;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();

    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let publisher = MqttPublisher::new(config.mqtt_server.clone(), config.publish_timeout());
    tracing::info!(on_publish_error = ?config.on_publish_error, "mqtt -> {}", publisher.broker());
    let state = Arc::new(AppState {
        publisher: Arc::new(publisher),
        on_publish_error: config.on_publish_error,
    });
    let app = build_router(state);

    let addr = SocketAddr::new(config.bind, config.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("starting airrohr2mqtt gateway on port {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("airrohr2mqtt gateway stopped");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigint = signal(SignalKind::interrupt()).expect("listen SIGINT");
    let mut sigterm = signal(SignalKind::terminate()).expect("listen SIGTERM");
    tokio::select! {
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
    }
    tracing::info!("interrupted");
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    tracing::info!("interrupted");
}
