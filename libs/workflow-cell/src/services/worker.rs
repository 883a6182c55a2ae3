use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{RwLock, Semaphore};
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, instrument, warn};

use resource_cell::ResourceReservationClient;
use shared_models::resource::ReleaseScope;

use crate::error::WorkflowError;
use crate::models::{
    CompleteRequest, ExternalTask, FailureRequest, TaskOutcome, Variables, WorkerConfig,
};
use crate::services::confirmation::AppointmentConfirmation;
use crate::services::engine::WorkflowEngine;
use crate::services::variables::parse_reserve_task;

// ==============================================================================
// TASK HANDLER
// ==============================================================================

/// Executes one `appointment-reserve-resources` task end to end and reports the result to
/// the engine. Retries and backoff belong to the engine, so every failure is reported
/// with zero retries left.
pub struct ReserveResourcesHandler {
    engine: Arc<dyn WorkflowEngine>,
    resources: Arc<dyn ResourceReservationClient>,
    confirmation: Arc<dyn AppointmentConfirmation>,
    worker_id: String,
}

impl ReserveResourcesHandler {
    pub fn new(
        engine: Arc<dyn WorkflowEngine>,
        resources: Arc<dyn ResourceReservationClient>,
        confirmation: Arc<dyn AppointmentConfirmation>,
        worker_id: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            resources,
            confirmation,
            worker_id: worker_id.into(),
        }
    }

    #[instrument(skip(self, task), fields(task_id = %task.id))]
    pub async fn handle(&self, task: &ExternalTask) -> TaskOutcome {
        match self.execute(task).await {
            Ok(()) => match self.complete(task).await {
                Ok(()) => TaskOutcome::Completed,
                Err(e) => {
                    // The lock expires and the engine hands the task out again.
                    error!("failed to complete task {}: {}", task.id, e);
                    TaskOutcome::Failed {
                        error_message: format!("failed to complete task: {}", e),
                    }
                }
            },
            Err(e) => {
                let error_message = e.to_string();
                warn!("Task {} failed: {}", task.id, error_message);
                if let Err(report_error) = self.fail(task, &error_message).await {
                    error!(
                        "Reporting failure of task {} to the engine failed: {}",
                        task.id, report_error
                    );
                }
                TaskOutcome::Failed { error_message }
            }
        }
    }

    async fn execute(&self, task: &ExternalTask) -> Result<(), WorkflowError> {
        let reserve = parse_reserve_task(&task.variables)?;
        let appointment_id = reserve.appointment_id;

        let reserved = self
            .resources
            .reserve(appointment_id, &reserve.reservation_request())
            .await?;
        debug!("Resources reserved for appointment {}", appointment_id);

        // Without a definite refusal the appointment may already reference the rows.
        if let Err(e) = self.confirmation.confirm(&reserved).await {
            if matches!(e, WorkflowError::ConfirmationRejected(_)) && !reserved.is_empty() {
                let scope = ReleaseScope::of(&reserved);
                if let Err(release_error) = self.resources.release(appointment_id, &scope).await {
                    error!(
                        "Releasing reservations of appointment {} failed: {}",
                        appointment_id, release_error
                    );
                }
            }
            return Err(e);
        }

        info!("Appointment {} confirmed with its resources", appointment_id);
        Ok(())
    }

    async fn complete(&self, task: &ExternalTask) -> Result<(), WorkflowError> {
        let request = CompleteRequest {
            worker_id: self.worker_id.clone(),
            variables: Variables::new(),
        };
        self.engine.complete(&task.id, &request).await
    }

    async fn fail(&self, task: &ExternalTask, error_message: &str) -> Result<(), WorkflowError> {
        let request = FailureRequest {
            worker_id: self.worker_id.clone(),
            error_message: error_message.to_string(),
            retries: 0,
            retry_timeout: 0,
        };
        self.engine.handle_failure(&task.id, &request).await
    }
}

// ==============================================================================
// FETCH LOOP
// ==============================================================================

/// Long-polls the engine and runs tasks concurrently, bounded by `max_parallel_tasks`.
pub struct ReservationTaskWorker {
    engine: Arc<dyn WorkflowEngine>,
    handler: Arc<ReserveResourcesHandler>,
    config: WorkerConfig,
    permits: Arc<Semaphore>,
    is_shutdown: RwLock<bool>,
}

impl ReservationTaskWorker {
    pub fn new(
        engine: Arc<dyn WorkflowEngine>,
        handler: Arc<ReserveResourcesHandler>,
        config: WorkerConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_parallel_tasks));
        Self {
            engine,
            handler,
            config,
            permits,
            is_shutdown: RwLock::new(false),
        }
    }

    #[instrument(skip(self), fields(worker_id = %self.config.worker_id))]
    pub async fn start(&self) -> Result<(), WorkflowError> {
        info!(
            "Starting task worker {} on topic {}",
            self.config.worker_id, self.config.topic_name
        );

        loop {
            if *self.is_shutdown.read().await {
                debug!("Task worker received shutdown signal");
                break;
            }

            let available = self.permits.available_permits();
            if available == 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
                continue;
            }
            let max_tasks = self.config.max_tasks.min(available as u32);

            let tasks = match self.engine.fetch_and_lock(&self.config.fetch_request(max_tasks)).await {
                Ok(tasks) => tasks,
                Err(e) => {
                    error!("Fetching tasks failed: {}", e);
                    tokio::time::sleep(self.config.fetch_interval).await;
                    continue;
                }
            };

            if tasks.is_empty() {
                tokio::time::sleep(self.config.fetch_interval).await;
                continue;
            }

            debug!("Locked {} task(s)", tasks.len());
            for task in tasks {
                let permit = match self.permits.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                let handler = Arc::clone(&self.handler);
                tokio::spawn(async move {
                    handler.handle(&task).await;
                    drop(permit);
                });
            }
        }

        info!("Task worker {} stopped", self.config.worker_id);
        Ok(())
    }

    /// Stops fetching and waits for in-flight tasks, up to the graceful timeout.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown for task worker {}", self.config.worker_id);
        *self.is_shutdown.write().await = true;

        let shutdown_timeout = Duration::from_secs(self.config.graceful_shutdown_timeout_seconds);
        let all = self.config.max_parallel_tasks as u32;
        match timeout(shutdown_timeout, self.permits.acquire_many(all)).await {
            Ok(_) => info!("Task worker {} drained", self.config.worker_id),
            Err(_) => warn!(
                "Task worker {} still had tasks in flight after {}s",
                self.config.worker_id, self.config.graceful_shutdown_timeout_seconds
            ),
        }
    }

    /// Fetches one batch and handles it inline.
    pub async fn process_batch(&self) -> Result<Vec<TaskOutcome>, WorkflowError> {
        let tasks = self
            .engine
            .fetch_and_lock(&self.config.fetch_request(self.config.max_tasks))
            .await?;
        Ok(join_all(tasks.iter().map(|task| self.handler.handle(task))).await)
    }
}
