mod api_doc;
mod app;
mod config;
mod error;
mod handlers;
mod models;
mod routes;
mod service;
mod state;
mod store;
#[cfg(test)]
mod test_utils;

use anyhow::Context;
use config::Config;
use service::TodoService;
use state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("rust-spanner-todo starting");

    let config = Config::from_env()?;
    config.log_startup();

    let store = store::connect(&config.storage).await?;
    let todos = TodoService::new(store, config.partition_key.as_str())
        .with_list_limit(config.list_limit);
    let app = app::router(AppState { todos });

    let addr = format!("{}:{}", config.service_host, config.service_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("rust-spanner-todo stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
