use daily_ratings::{dispatch::spawn_poller, load_ledger, load_ratings, router, AppConfig, AppState};
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = AppConfig::from_env()?;
    let transport = config.build_transport()?;

    let ratings = load_ratings(&config.ratings_path).await;
    let ledger = load_ledger(&config.ledger_path).await;
    info!(
        ratings = ratings.len(),
        sent = ledger.len(),
        categories = config.categories.len(),
        transport = transport.name(),
        "data loaded"
    );
    if config.recipients.is_empty() {
        warn!("APP_REPORT_TO is empty; reports will have no recipients");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let poll_interval = config.poll_interval;
    let state = AppState::new(config, transport, ratings, ledger);

    if let Some(every) = poll_interval {
        info!(every_secs = every.as_secs(), "polling for due reports");
        spawn_poller(state.clone(), every);
    }

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
