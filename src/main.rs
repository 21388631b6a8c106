use std::sync::Arc;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use map_warper::api::create_router;
use map_warper::{Config, Error, Pipeline, Result};

fn setup_logging(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Config(format!("cannot install log subscriber: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    setup_logging(config.log_level)?;
    config.validate()?;

    let pipeline = Arc::new(Pipeline::from_config(&config)?);
    let app = create_router(pipeline, config.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;

    info!(
        addr = %config.bind_addr(),
        sink_mode = ?config.sink_mode,
        upload_failure_policy = ?config.upload_failure_policy,
        translate = %config.translate_bin.display(),
        warp = %config.warp_bin.display(),
        "map-warper listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
