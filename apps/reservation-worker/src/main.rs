use std::sync::Arc;

use anyhow::{anyhow, Context};
use dotenv::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resource_cell::HttpResourceClient;
use shared_config::AppConfig;
use workflow_cell::{
    CamundaClient, HttpAppointmentConfirmation, ReservationTaskWorker, ReserveResourcesHandler,
    WorkerConfig,
};

/// Standalone external-task worker: reserves resources for appointments handed out by the
/// workflow engine, then confirms them to the appointment service.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    let resource_url = config
        .resource_service_url
        .clone()
        .ok_or_else(|| anyhow!("RESOURCE_SERVICE_URL must be set for the reservation worker"))?;

    let engine = Arc::new(
        CamundaClient::from_config(&config).context("failed to create workflow engine client")?,
    );
    let resources = Arc::new(
        HttpResourceClient::from_config(&resource_url, &config)
            .context("failed to create resource service client")?,
    );
    let confirmation = Arc::new(
        HttpAppointmentConfirmation::from_config(&config)
            .context("failed to create appointment service client")?,
    );

    let worker_config = WorkerConfig::from_app_config(&config);
    info!(
        "Starting reservation worker {} against {}",
        worker_config.worker_id, config.workflow_engine_url
    );

    let handler = Arc::new(ReserveResourcesHandler::new(
        engine.clone(),
        resources,
        confirmation,
        worker_config.worker_id.clone(),
    ));
    let worker = Arc::new(ReservationTaskWorker::new(engine, handler, worker_config));

    let running = {
        let worker = worker.clone();
        tokio::spawn(async move { worker.start().await })
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
    worker.shutdown().await;

    match running.await {
        Ok(Ok(())) => info!("Reservation worker stopped"),
        Ok(Err(e)) => error!("Reservation worker failed: {}", e),
        Err(e) => error!("Reservation worker task panicked: {}", e),
    }
    Ok(())
}
