//! Notes Service — a directory of plain-text notes behind a small REST API.
//!
//! Each note is one file under the notes directory; the file name is the
//! note's name. Endpoints:
//!
//!   GET    /notes         list every note as `[{name, text}]`
//!   GET    /notes/:name   raw note text
//!   POST   /notes/:name   create (400 if it exists)
//!   PUT    /notes/:name   replace (404 if missing)
//!   DELETE /notes/:name   delete (404 if missing)
//!   GET    /rpc/status    service status
//!
//! Default: http://127.0.0.1:9104/

mod config;
mod error;
mod routes;
mod store;

use clap::Parser;
use config::{Cli, ServiceConfig};
use error::ServiceError;
use routes::AppState;
use std::sync::Arc;
use store::NoteStore;

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = ServiceConfig::from_cli(Cli::parse())?;

    log::info!("Using notes directory: {}", config.notes_dir.display());
    let store = NoteStore::open(&config.notes_dir)?;

    let state = Arc::new(AppState::new(store));
    let app = routes::router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ServiceError::Bind {
            addr: addr.clone(),
            source,
        })?;

    log::info!("Notes Service listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Notes Service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}
