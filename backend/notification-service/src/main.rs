use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notification_service::handlers::register_routes as register_websocket;
use notification_service::store::{
    MedicationStore, MemoryMedicationStore, MemoryNotificationStore, NotificationStore,
    PgMedicationStore, PgNotificationStore,
};
use notification_service::websocket::ConnectionRegistry;
use notification_service::{metrics, Config, NotificationWorker, PushChannel};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting notification service");

    let config = Config::from_env().context("failed to load configuration")?;

    // Connect-or-warn: without a database the service still serves the
    // real-time plane, backed by empty in-memory stores.
    let (notifications, medications): (Arc<dyn NotificationStore>, Arc<dyn MedicationStore>) =
        match PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await
        {
            Ok(pool) => {
                tracing::info!("Successfully connected to database");
                (
                    Arc::new(PgNotificationStore::new(pool.clone())),
                    Arc::new(PgMedicationStore::new(pool)),
                )
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Failed to connect to database, running on in-memory stores"
                );
                (
                    Arc::new(MemoryNotificationStore::new()),
                    Arc::new(MemoryMedicationStore::new()),
                )
            }
        };

    let registry = ConnectionRegistry::new();
    let push = PushChannel::new(registry.clone());

    let worker = Arc::new(NotificationWorker::new(
        notifications,
        medications,
        push.clone(),
        config.worker.clone(),
    ));
    let worker_handle = worker.start();

    let addr = format!("0.0.0.0:{}", config.app.port);
    tracing::info!(addr = %addr, env = %config.app.env, "Starting HTTP server");

    let registry_data = web::Data::new(registry);
    let push_data = web::Data::new(push);

    HttpServer::new(move || {
        App::new()
            .app_data(registry_data.clone())
            .app_data(push_data.clone())
            .wrap(middleware::Logger::default())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/metrics", web::get().to(metrics::serve_metrics))
            .configure(register_websocket)
    })
    .bind(&addr)
    .with_context(|| format!("failed to bind {addr}"))?
    .run()
    .await?;

    tracing::info!("HTTP server exited, stopping worker");
    worker.stop();
    if let Err(e) = worker_handle.await {
        tracing::error!(error = %e, "worker task did not shut down cleanly");
    }

    Ok(())
}
