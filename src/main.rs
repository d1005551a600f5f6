mod avatar;
mod config;
mod db;
mod errors;
mod logging;
mod models;
mod page;
mod routes;
mod schema;
mod security;
mod state;
mod store;

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use config::Config;
use routes::create_router;
use state::AppState;
use store::{MemoryStore, NotebookStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::debug!(?config, "Loaded configuration");

    let store: Arc<dyn NotebookStore> = match &config.database_url {
        Some(url) => {
            let pool = db::establish_pool(url, config.db_pool_max_size).await?;
            Arc::new(PgStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL is not set; notebooks are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let addr = config.bind_addr;
    let app = create_router(AppState::new(config, store))
        .into_make_service_with_connect_info::<SocketAddr>();

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Notebook server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
