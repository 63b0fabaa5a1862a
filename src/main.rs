use actix_web::{middleware, web, App, HttpServer};
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use std::sync::Arc;

mod api;
mod config;
mod domain;
mod logging;
mod metrics;
mod store;
mod utils;

use config::{Config, StorageBackend};
use domain::order::{OrderRepository, OrderService, ServiceConfig};
use metrics::Metrics;
use store::{InMemoryOrderRepository, ScyllaOrderRepository, ScyllaSettings};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    logging::init(&config.log_level, config.log_format);

    tracing::info!(
        storage = ?config.storage,
        port = config.server_port,
        "Starting POS order service"
    );

    // === 1. Metrics registry ===
    let metrics = Arc::new(Metrics::new()?);

    // === 2. Order storage ===
    let repository = build_repository(&config, metrics.clone()).await?;

    // === 3. Order service ===
    let service = web::Data::new(OrderService::new(
        repository,
        metrics.clone(),
        ServiceConfig {
            code_regenerations: config.code_regenerations,
        },
    ));
    let metrics = web::Data::new(metrics);

    // === 4. HTTP server ===
    let address = config.bind_address();
    tracing::info!(host = %address.0, port = address.1, "HTTP server listening");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(service.clone())
            .app_data(metrics.clone())
            .configure(api::configure)
    })
    .bind(address)?
    .run()
    .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn build_repository(
    config: &Config,
    metrics: Arc<Metrics>,
) -> anyhow::Result<Arc<dyn OrderRepository>> {
    match config.storage {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; orders are lost on restart");
            Ok(Arc::new(InMemoryOrderRepository::new()))
        }
        StorageBackend::Scylla => {
            tracing::info!(nodes = ?config.scylla_nodes, "Connecting to ScyllaDB");
            let session: Session = SessionBuilder::new()
                .known_nodes(&config.scylla_nodes)
                .connection_timeout(config.database_timeout)
                .build()
                .await?;

            session
                .query_unpaged(
                    format!(
                        "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = \
                         {{'class': 'SimpleStrategy', 'replication_factor': 1}}",
                        config.scylla_keyspace
                    ),
                    (),
                )
                .await?;
            session.use_keyspace(&config.scylla_keyspace, false).await?;

            let repository = ScyllaOrderRepository::new(
                Arc::new(session),
                ScyllaSettings {
                    timeout: config.database_timeout,
                    ..Default::default()
                },
                metrics,
            );
            repository.init_schema().await?;
            tracing::info!(keyspace = %config.scylla_keyspace, "ScyllaDB schema ready");

            Ok(Arc::new(repository))
        }
    }
}
