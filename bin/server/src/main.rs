mod config;
mod constants;
mod handlers;
mod state;

use actix_web::{web, App, HttpServer};
use config::ServerConfig;
use intake::TempJanitor;
use state::AppState;
use std::sync::Arc;
use storage::FilesystemStorage;
use tracing::{error, info};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing with env filter
    // Filter out actix-server worker shutdown messages
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info")
                    .add_directive("actix_server::worker=warn".parse().unwrap())
                    .add_directive("actix_server::accept=warn".parse().unwrap())
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting upload server (PID: {})", std::process::id());

    let config = ServerConfig::load().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;
    info!(
        temp_dir = ?config.temp_dir,
        data_dir = ?config.data_dir,
        mode = ?config.mode,
        "Configuration loaded"
    );

    let janitor = Arc::new(TempJanitor::new(&config.temp_dir));
    janitor.ensure_directory().await.map_err(|e| {
        error!("Failed to create temp directory {:?}: {}", config.temp_dir, e);
        e
    })?;
    tokio::fs::create_dir_all(&config.data_dir).await.map_err(|e| {
        error!("Failed to create data directory {:?}: {}", config.data_dir, e);
        e
    })?;

    // Last-resort cleanup of anything a crashed request left behind
    let _sweeper = janitor
        .clone()
        .spawn_sweeper(config.sweep_interval, config.temp_max_age);

    let state = web::Data::new(AppState::new(
        janitor,
        Arc::new(FilesystemStorage::new(&config.data_dir)),
        config.document_limits(),
        config.registration_limits(),
        config.mode,
    ));

    let bind_address = config.bind_address();
    info!("Starting server on http://{}", bind_address);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(handlers::document::upload_document)
            .service(handlers::registration::upload_registration)
            .service(handlers::health::health)
    })
    .bind(&bind_address)
    .map_err(|e| {
        error!("Failed to bind to {}: {}", bind_address, e);
        e
    })?;

    info!("Server bound successfully to http://{}", bind_address);

    server.run().await
}
