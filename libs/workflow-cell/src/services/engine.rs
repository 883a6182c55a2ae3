use async_trait::async_trait;
use reqwest::Method;
use tracing::{debug, instrument};

use shared_client::RestClient;
use shared_config::AppConfig;

use crate::error::WorkflowError;
use crate::models::{
    CompleteRequest, ExternalTask, FailureRequest, FetchAndLockRequest, ProcessInstance,
    StartProcessRequest,
};

/// The slice of the workflow engine's REST API the booking flow needs.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    async fn start_process(
        &self,
        process_key: &str,
        request: &StartProcessRequest,
    ) -> Result<ProcessInstance, WorkflowError>;

    /// Long-polls for tasks and locks them to the requesting worker.
    async fn fetch_and_lock(
        &self,
        request: &FetchAndLockRequest,
    ) -> Result<Vec<ExternalTask>, WorkflowError>;

    async fn complete(&self, task_id: &str, request: &CompleteRequest)
        -> Result<(), WorkflowError>;

    async fn handle_failure(
        &self,
        task_id: &str,
        request: &FailureRequest,
    ) -> Result<(), WorkflowError>;
}

/// Camunda 7 style engine reached over `engine-rest`.
pub struct CamundaClient {
    rest: RestClient,
}

impl CamundaClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, WorkflowError> {
        let rest = RestClient::from_config(config.workflow_engine_url.clone(), config)?;
        Ok(Self::new(rest))
    }
}

#[async_trait]
impl WorkflowEngine for CamundaClient {
    #[instrument(skip(self, request), fields(business_key = %request.business_key))]
    async fn start_process(
        &self,
        process_key: &str,
        request: &StartProcessRequest,
    ) -> Result<ProcessInstance, WorkflowError> {
        let body = serde_json::to_value(request)?;
        let instance: ProcessInstance = self
            .rest
            .request(
                Method::POST,
                &format!("/process-definition/key/{}/start", process_key),
                Some(body),
            )
            .await?;

        debug!("Started process instance {} of {}", instance.id, process_key);
        Ok(instance)
    }

    async fn fetch_and_lock(
        &self,
        request: &FetchAndLockRequest,
    ) -> Result<Vec<ExternalTask>, WorkflowError> {
        let body = serde_json::to_value(request)?;
        let tasks = self
            .rest
            .request(Method::POST, "/external-task/fetchAndLock", Some(body))
            .await?;
        Ok(tasks)
    }

    async fn complete(
        &self,
        task_id: &str,
        request: &CompleteRequest,
    ) -> Result<(), WorkflowError> {
        let body = serde_json::to_value(request)?;
        self.rest
            .execute(
                Method::POST,
                &format!("/external-task/{}/complete", task_id),
                Some(body),
            )
            .await?;
        Ok(())
    }

    async fn handle_failure(
        &self,
        task_id: &str,
        request: &FailureRequest,
    ) -> Result<(), WorkflowError> {
        let body = serde_json::to_value(request)?;
        self.rest
            .execute(
                Method::POST,
                &format!("/external-task/{}/failure", task_id),
                Some(body),
            )
            .await?;
        Ok(())
    }
}
