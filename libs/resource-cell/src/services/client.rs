use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_client::{RestClient, RestError};
use shared_config::AppConfig;
use shared_models::error::ErrorBody;

use crate::error::ResourceError;
use crate::models::{ReleaseScope, Reservation, ReserveResourcesRequest, ReservedResources};
use crate::services::reservation::ReservationService;

/// How coordinators reach the resource service, in-process or over HTTP.
#[async_trait]
pub trait ResourceReservationClient: Send + Sync {
    /// All-or-nothing reservation of the requested resources for one appointment.
    async fn reserve(
        &self,
        appointment_id: Uuid,
        request: &ReserveResourcesRequest,
    ) -> Result<ReservedResources, ResourceError>;

    /// Drops the appointment's reservations that fall in `scope`.
    async fn release(
        &self,
        appointment_id: Uuid,
        scope: &ReleaseScope,
    ) -> Result<(), ResourceError>;
}

#[async_trait]
impl ResourceReservationClient for ReservationService {
    async fn reserve(
        &self,
        appointment_id: Uuid,
        request: &ReserveResourcesRequest,
    ) -> Result<ReservedResources, ResourceError> {
        self.reserve_appointment_resources(appointment_id, request)
            .await
    }

    async fn release(
        &self,
        appointment_id: Uuid,
        scope: &ReleaseScope,
    ) -> Result<(), ResourceError> {
        self.release_reservations(appointment_id, scope)
            .await
            .map(|_| ())
    }
}

pub struct HttpResourceClient {
    rest: RestClient,
}

impl HttpResourceClient {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }

    pub fn from_config(base_url: &str, config: &AppConfig) -> Result<Self, ResourceError> {
        let rest = RestClient::from_config(base_url, config)
            .map_err(|e| ResourceError::ExternalServiceError(e.to_string()))?;
        Ok(Self::new(rest))
    }

    async fn owned_reservations(
        &self,
        appointment_id: Uuid,
    ) -> Result<Vec<Reservation>, ResourceError> {
        self.rest
            .request::<Vec<Reservation>>(
                Method::GET,
                &format!("/resources/{}/reservations", appointment_id),
                None,
            )
            .await
            .map_err(|e| ResourceError::ExternalServiceError(e.to_string()))
    }
}

#[async_trait]
impl ResourceReservationClient for HttpResourceClient {
    async fn reserve(
        &self,
        appointment_id: Uuid,
        request: &ReserveResourcesRequest,
    ) -> Result<ReservedResources, ResourceError> {
        let body = serde_json::to_value(request)
            .map_err(|e| ResourceError::ValidationError(e.to_string()))?;

        let response = self
            .rest
            .send(
                Method::POST,
                &format!("/resources/{}/reservations", appointment_id),
                Some(body),
            )
            .await
            .map_err(|e| ResourceError::ExternalServiceError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(map_rejection(status, &text));
        }

        debug!("Resource service accepted reservation for appointment {}", appointment_id);

        // The reservation endpoint answers 204; read back the rows for their summaries.
        let requested: Vec<Uuid> = request.requested().into_iter().map(|(_, id)| id).collect();
        let mut reserved = ReservedResources::for_window(appointment_id, request.start);
        for reservation in self.owned_reservations(appointment_id).await? {
            if reservation.start == request.start && requested.contains(&reservation.resource_id) {
                reserved.set(reservation.summary());
            }
        }

        Ok(reserved)
    }

    async fn release(
        &self,
        appointment_id: Uuid,
        scope: &ReleaseScope,
    ) -> Result<(), ResourceError> {
        let result = if *scope == ReleaseScope::all() {
            self.rest
                .execute(
                    Method::DELETE,
                    &format!("/resources/{}/reservations", appointment_id),
                    None,
                )
                .await
        } else {
            let body = serde_json::to_value(scope)
                .map_err(|e| ResourceError::ValidationError(e.to_string()))?;
            self.rest
                .execute(
                    Method::POST,
                    &format!("/resources/{}/reservations/release", appointment_id),
                    Some(body),
                )
                .await
        };

        result
            .map(|_| ())
            .map_err(|e| match e {
                RestError::Status { status, body } => map_rejection(
                    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                    &body,
                ),
                other => ResourceError::ExternalServiceError(other.to_string()),
            })
    }
}

/// Maps a non-2xx answer of the resource service onto the local taxonomy.
fn map_rejection(status: StatusCode, body: &str) -> ResourceError {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .map(|error| error.detail)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::NOT_FOUND => ResourceError::NotFound(detail),
        StatusCode::CONFLICT => ResourceError::Unavailable(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            ResourceError::ValidationError(detail)
        }
        other => {
            warn!("Resource service answered {}: {}", other, body);
            ResourceError::ExternalServiceError(format!("resource service returned {}", other))
        }
    }
}
