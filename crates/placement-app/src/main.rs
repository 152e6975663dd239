use std::sync::Arc;

use salvo::conn::TcpListener;
use salvo::logging::Logger;
use salvo::{Listener, Router};
use placement_app::app::api::routes;
use placement_app::config::ConfigHandler;
use placement_app::middleware::rate_limit::with_rate_limit;
use placement_app::store_handler::{FileStorageHandler, StoreHandler};
use placement_core::config::load_config;
use placement_db::db::connection::{create_pool, run_migrations};
use placement_db::pg::PgStore;
use placement_service::storage::LocalFileStorage;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();

    tracing::info!("Starting placement negotiation server");

    let config = load_config()?;

    tracing::info!(config = ?config, "Configuration loaded");

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    if config.database.run_migrations {
        run_migrations(&config.database.url).await?;
        tracing::info!("Database migrations applied.");
    }

    let pool = create_pool(
        &config.database.url,
        u32::from(config.database.max_connections),
    )
    .await?;

    tracing::info!("Database connection pool created.");

    tokio::fs::create_dir_all(&config.storage.upload_dir).await?;
    let files = LocalFileStorage::new(&config.storage.upload_dir);

    tracing::info!(upload_dir = %config.storage.upload_dir, "File storage ready.");

    let bind_addr = config.server.bind_addr();
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = Router::new()
        .hoop(Logger::new())
        .hoop(StoreHandler {
            store: Arc::new(PgStore::new(pool)),
        })
        .hoop(FileStorageHandler {
            files: Arc::new(files),
        })
        .hoop(ConfigHandler {
            settings: Arc::new(config.clone()),
        });
    let router = with_rate_limit(router, &config.rate_limit).push(routes());

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor).serve(router).await;

    Ok(())
}
