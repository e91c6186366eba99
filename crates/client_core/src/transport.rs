//! HTTP seam between the lifecycle coordinator and the ride service.
//!
//! The service encodes business outcomes in the status code (200/201/202), so
//! the transport hands back the raw status and body and leaves interpretation
//! to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{DriverId, RideId, RideStatus, RiderId},
    error::ApiMessage,
    protocol::{CreateRideRequest, EditRideRequest},
};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::error::LifecycleError;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid ride service url: {0}")]
    Url(#[from] url::ParseError),
    #[error("ride service url cannot carry a path: {0}")]
    NotABase(String),
}

/// Status code and raw body of a ride service response.
#[derive(Debug, Clone)]
pub struct ApiReply {
    pub status: StatusCode,
    pub body: String,
}

impl ApiReply {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        if self.body.trim().is_empty() {
            serde_json::from_str("{}")
        } else {
            serde_json::from_str(&self.body)
        }
    }

    pub fn server_message(&self) -> Option<String> {
        serde_json::from_str::<ApiMessage>(&self.body)
            .ok()
            .and_then(|message| message.text().map(str::to_string))
    }

    /// Turns a non-success reply into the error shown to the user, keeping
    /// the service's own wording when it sent any.
    pub fn rejection(&self, fallback: &str) -> LifecycleError {
        let message = self
            .server_message()
            .unwrap_or_else(|| format!("{fallback} (HTTP {})", self.status.as_u16()));
        LifecycleError::rejected(self.status.as_u16(), message)
    }

    pub fn into_success(self, fallback: &str) -> Result<Self, LifecycleError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(self.rejection(fallback))
        }
    }
}

#[async_trait]
pub trait RideApi: Send + Sync {
    async fn create_ride(&self, request: &CreateRideRequest) -> Result<ApiReply, TransportError>;
    async fn queue_position(&self, rider: &RiderId) -> Result<ApiReply, TransportError>;
    async fn delete_ride(&self, ride_id: RideId) -> Result<ApiReply, TransportError>;
    async fn edit_ride(
        &self,
        ride_id: RideId,
        update: &EditRideRequest,
    ) -> Result<ApiReply, TransportError>;
    async fn fetch_ride(&self, ride_id: RideId) -> Result<ApiReply, TransportError>;
    async fn fetch_driver_ride(
        &self,
        driver: &DriverId,
        status: RideStatus,
    ) -> Result<ApiReply, TransportError>;
    async fn search_locations(&self, query: &str) -> Result<ApiReply, TransportError>;
}

pub struct HttpRideApi {
    http: Client,
    base_url: Url,
    access_token: Option<String>,
}

impl HttpRideApi {
    pub fn new(base_url: Url) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: Url, timeout: Duration) -> Result<Self, TransportError> {
        if base_url.cannot_be_a_base() {
            return Err(TransportError::NotABase(base_url.to_string()));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            access_token: None,
        })
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|token| !token.is_empty());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::NotABase(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<ApiReply, TransportError> {
        let request = match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), "transport: response received");
        Ok(ApiReply { status, body })
    }
}

#[async_trait]
impl RideApi for HttpRideApi {
    async fn create_ride(&self, request: &CreateRideRequest) -> Result<ApiReply, TransportError> {
        let url = self.endpoint(&["rides", "create"])?;
        self.send(self.http.post(url).json(request)).await
    }

    async fn queue_position(&self, rider: &RiderId) -> Result<ApiReply, TransportError> {
        let url = self.endpoint(&["rides", "queue-position", rider.as_str()])?;
        self.send(self.http.get(url)).await
    }

    async fn delete_ride(&self, ride_id: RideId) -> Result<ApiReply, TransportError> {
        let ride_id = ride_id.to_string();
        let url = self.endpoint(&["rides", "delete", &ride_id])?;
        self.send(self.http.delete(url)).await
    }

    async fn edit_ride(
        &self,
        ride_id: RideId,
        update: &EditRideRequest,
    ) -> Result<ApiReply, TransportError> {
        let ride_id = ride_id.to_string();
        let url = self.endpoint(&["rides", "edit", &ride_id])?;
        self.send(self.http.put(url).json(update)).await
    }

    async fn fetch_ride(&self, ride_id: RideId) -> Result<ApiReply, TransportError> {
        let ride_id = ride_id.to_string();
        let url = self.endpoint(&["rides", "get-by-id", &ride_id])?;
        self.send(self.http.get(url)).await
    }

    async fn fetch_driver_ride(
        &self,
        driver: &DriverId,
        status: RideStatus,
    ) -> Result<ApiReply, TransportError> {
        let url = self.endpoint(&[
            "rides",
            "get-by-driver-id",
            driver.as_str(),
            "status",
            status.as_wire(),
        ])?;
        self.send(self.http.get(url)).await
    }

    async fn search_locations(&self, query: &str) -> Result<ApiReply, TransportError> {
        let url = self.endpoint(&["locations", "search", ""])?;
        self.send(self.http.get(url).query(&[("query", query)]))
            .await
    }
}
