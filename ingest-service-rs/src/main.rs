// ingest-service-rs/src/main.rs
// Pilot Telemetry Ingest - HTTP entry point for usage capture
// Port 5050 - REST boundary for the tutoring frontend
//
// Implements:
// - POST /feedback with session attribution and rating validation
// - Sampling and privacy filtering ahead of durable JSONL persistence
// - Request payload size limits
// - Origin-restricted CORS, enabled only when configured

use std::net::SocketAddr;
use std::sync::Arc;

use ingest_service::{app, AppState, IngestConfig, START_TIME};
use pilot_ledger::UsageRecorder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let _ = *START_TIME;

    let config = IngestConfig::from_env();

    // Invalid capture configuration (a bad sampling rate) fails startup
    // here instead of surfacing per request.
    let recorder = UsageRecorder::from_env()?;
    log::info!(
        "Telemetry capture enabled: {}, sample rate: {}, data dir: {}",
        recorder.config().enabled,
        recorder.config().sample_rate,
        recorder.config().data_dir.display()
    );

    if config.allowed_origins.is_empty() {
        log::info!("No ALLOWED_ORIGINS configured; CORS stays disabled");
    } else {
        log::info!(
            "Allowing cross-origin requests from: {}",
            config.allowed_origins.join(", ")
        );
    }

    let state = Arc::new(AppState {
        recorder: Arc::new(recorder),
        version: config.version.clone(),
    });

    let app = app(state, &config.allowed_origins);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("Ingest service starting on {}", addr);
    println!("Pilot telemetry ingest listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
