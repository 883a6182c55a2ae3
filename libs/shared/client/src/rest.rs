use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE},
    Client, Method, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

#[derive(Error, Debug)]
pub enum RestError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Undecodable response: {0}")]
    Decode(String),

    #[error("Client configuration error: {0}")]
    Configuration(String),
}

impl RestError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::Status { status, .. } => Some(*status),
            RestError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// JSON-over-HTTP client for one collaborator service, with a fixed request timeout.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RestError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| RestError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(base_url: impl Into<String>, config: &AppConfig) -> Result<Self, RestError> {
        Self::new(base_url, config.http_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends the request and returns the raw response whatever its status.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Response, RestError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self.client.request(method, &url);
        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        Ok(req.send().await?)
    }

    /// Sends the request, requires a 2xx status and decodes the JSON body.
    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, RestError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, body).await?;
        let response = Self::ensure_success(response).await?;

        response
            .json::<T>()
            .await
            .map_err(|e| RestError::Decode(e.to_string()))
    }

    /// Sends the request and requires a 2xx status, ignoring the body.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<StatusCode, RestError> {
        let response = self.send(method, path, body).await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.status())
    }

    async fn ensure_success(response: Response) -> Result<Response, RestError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            error!("API error ({}): {}", status, error_text);
        } else {
            debug!("API rejected request ({}): {}", status, error_text);
        }

        Err(RestError::Status {
            status: status.as_u16(),
            body: error_text,
        })
    }
}
