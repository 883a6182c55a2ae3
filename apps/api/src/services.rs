use std::sync::Arc;

use tracing::{error, info};

use appointment_cell::{
    AppointmentBookingService, AppointmentStore, BookingCoordinator, HttpParticipantDirectory,
    InMemoryAppointmentStore, ParticipantDirectory, SyncCoordinator, UncheckedDirectory,
};
use booking_events_cell::{
    ConsumerConfig, EventBus, EventCoordinator, InMemoryEventBus, RedisEventBus,
    ReservationConsumerService, ReservationOutcomeListener,
};
use resource_cell::{
    seed_catalog, HttpResourceClient, InMemoryResourceStore, ReservationService,
    ResourceReservationClient,
};
use shared_config::{AppConfig, BookingStrategy};
use workflow_cell::{
    CamundaClient, ReservationTaskWorker, ReserveResourcesHandler, WorkerConfig,
    WorkflowCoordinator, WorkflowEngine,
};

/// Everything the HTTP layer and the background loops need, wired for the configured
/// booking strategy.
pub struct AppServices {
    pub booking: Arc<AppointmentBookingService>,
    pub reservations: Arc<ReservationService>,
    pub background: BackgroundServices,
}

impl AppServices {
    pub async fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let resource_store = Arc::new(InMemoryResourceStore::new());
        let seeded = seed_catalog(resource_store.as_ref()).await?;
        info!("Resource catalog seeded with {} resources", seeded);
        let reservations = Arc::new(ReservationService::new(resource_store));

        let resources: Arc<dyn ResourceReservationClient> = match &config.resource_service_url {
            Some(url) => {
                info!("Reserving resources through {}", url);
                Arc::new(HttpResourceClient::from_config(url, config)?)
            }
            None => reservations.clone(),
        };

        let directory: Arc<dyn ParticipantDirectory> = match &config.directory_service_url {
            Some(url) => Arc::new(HttpParticipantDirectory::from_config(url, config)?),
            None => Arc::new(UncheckedDirectory),
        };

        let store: Arc<dyn AppointmentStore> = Arc::new(InMemoryAppointmentStore::new());
        let mut background = BackgroundServices::default();

        let booking = match config.booking_strategy {
            BookingStrategy::Sync => {
                let coordinator = Arc::new(SyncCoordinator::new(store.clone(), resources.clone()));
                booking_service(store, coordinator, resources, directory)
            }
            BookingStrategy::Event => {
                let bus = event_bus(config).await?;
                let coordinator = Arc::new(EventCoordinator::new(store.clone(), bus.clone()));
                let booking =
                    booking_service(store, coordinator, resources.clone(), directory);

                if config.run_embedded_consumers {
                    background.consumer = Some(Arc::new(ReservationConsumerService::new(
                        bus.clone(),
                        resources,
                        ConsumerConfig::from_app_config("reservation-consumer", config),
                    )));
                    background.listener = Some(Arc::new(ReservationOutcomeListener::new(
                        bus,
                        booking.clone(),
                        ConsumerConfig::from_app_config("reservation-outcome-listener", config),
                    )));
                }
                booking
            }
            BookingStrategy::Workflow => {
                let engine: Arc<dyn WorkflowEngine> = Arc::new(CamundaClient::from_config(config)?);
                let coordinator = Arc::new(WorkflowCoordinator::new(
                    store.clone(),
                    engine.clone(),
                    config.workflow_process_key.clone(),
                ));
                let booking =
                    booking_service(store, coordinator, resources.clone(), directory);

                if config.run_embedded_consumers {
                    let worker_config = WorkerConfig::from_app_config(config);
                    let handler = Arc::new(ReserveResourcesHandler::new(
                        engine.clone(),
                        resources,
                        booking.clone(),
                        worker_config.worker_id.clone(),
                    ));
                    background.worker = Some(Arc::new(ReservationTaskWorker::new(
                        engine,
                        handler,
                        worker_config,
                    )));
                }
                booking
            }
        };

        Ok(Self {
            booking,
            reservations,
            background,
        })
    }
}

fn booking_service(
    store: Arc<dyn AppointmentStore>,
    coordinator: Arc<dyn BookingCoordinator>,
    resources: Arc<dyn ResourceReservationClient>,
    directory: Arc<dyn ParticipantDirectory>,
) -> Arc<AppointmentBookingService> {
    Arc::new(AppointmentBookingService::new(
        store,
        coordinator,
        resources,
        directory,
    ))
}

async fn event_bus(config: &AppConfig) -> anyhow::Result<Arc<dyn EventBus>> {
    match &config.redis_url {
        Some(url) => {
            info!("Using Redis event bus");
            Ok(Arc::new(RedisEventBus::new(url).await?))
        }
        None => {
            info!("Using in-process event bus");
            Ok(Arc::new(InMemoryEventBus::new()))
        }
    }
}

// ==============================================================================
// BACKGROUND LOOPS
// ==============================================================================

/// Consumers and workers embedded in the API process.
#[derive(Default)]
pub struct BackgroundServices {
    consumer: Option<Arc<ReservationConsumerService>>,
    listener: Option<Arc<ReservationOutcomeListener>>,
    worker: Option<Arc<ReservationTaskWorker>>,
}

impl BackgroundServices {
    pub fn spawn(&self) {
        if let Some(consumer) = self.consumer.clone() {
            tokio::spawn(async move {
                if let Err(e) = consumer.start().await {
                    error!("Reservation consumer exited: {}", e);
                }
            });
        }
        if let Some(listener) = self.listener.clone() {
            tokio::spawn(async move {
                if let Err(e) = listener.start().await {
                    error!("Outcome listener exited: {}", e);
                }
            });
        }
        if let Some(worker) = self.worker.clone() {
            tokio::spawn(async move {
                if let Err(e) = worker.start().await {
                    error!("Task worker exited: {}", e);
                }
            });
        }
    }

    pub async fn shutdown(&self) {
        if let Some(consumer) = &self.consumer {
            consumer.shutdown().await;
        }
        if let Some(listener) = &self.listener {
            listener.shutdown().await;
        }
        if let Some(worker) = &self.worker {
            worker.shutdown().await;
        }
    }
}
