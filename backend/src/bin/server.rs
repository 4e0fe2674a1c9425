//! Timetable ingest HTTP server binary.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin timetable-server
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `INGEST_PROBE_TIMEOUT_MS`, `INGEST_COMMIT_TIMEOUT_MS`,
//!   `INGEST_PROBE_CONCURRENCY`, `INGEST_HEADER_ROWS`: pipeline overrides
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use timetable_ingest::db::{LocalRepository, TimetableRepository};
use timetable_ingest::http::{create_router, AppState};
use timetable_ingest::{IngestConfig, IngestPipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting timetable ingest server");

    let config = IngestConfig::load().context("Failed to load configuration")?;
    info!(
        "Pipeline: probe timeout {}ms, commit timeout {}ms, {} probes in flight, {} header rows",
        config.pipeline.probe_timeout_ms,
        config.pipeline.commit_timeout_ms,
        config.pipeline.probe_concurrency,
        config.pipeline.header_rows
    );

    let repository: Arc<dyn TimetableRepository> = Arc::new(LocalRepository::new());
    let pipeline = IngestPipeline::new(repository, config.pipeline.clone());
    let app = create_router(AppState::new(pipeline, config.server.max_upload_bytes));

    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .context("Invalid bind address")?;

    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
