//! Collector transports
//!
//! Two delivery primitives with different guarantees:
//! - `send`: awaited, reports success or failure, retried by the dispatcher.
//! - `send_beacon`: queued and forgotten, used while the page unloads.

use crate::store::TrackingBundle;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PAGE_EXIT_EVENT: &str = "page_exit";

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Collector responded with status {0}")]
    Status(u16),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Page metadata sent with every payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub page_url: String,
    pub user_agent: String,
}

/// Request body understood by the collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectorPayload {
    pub data: TrackingBundle,
    pub page_url: String,
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl CollectorPayload {
    /// Regular batch payload
    pub fn batch(data: TrackingBundle, page: &PageContext) -> Self {
        Self {
            data,
            page_url: page.page_url.clone(),
            user_agent: page.user_agent.clone(),
            timestamp: Utc::now(),
            event: None,
        }
    }

    /// Unload-time payload tagged `page_exit`
    pub fn page_exit(data: TrackingBundle, page: &PageContext) -> Self {
        Self {
            event: Some(PAGE_EXIT_EVENT.to_string()),
            ..Self::batch(data, page)
        }
    }

    /// JSON request body
    pub fn to_body(&self) -> DeliveryResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a batch; any error leaves the data queued for the next cycle.
    async fn send(&self, payload: &CollectorPayload) -> DeliveryResult<()>;

    /// Queue a best-effort request that must not block or be awaited.
    ///
    /// Returns whether the request was queued. The outcome of the request
    /// itself is never observable.
    fn send_beacon(&self, payload: CollectorPayload) -> bool;
}

/// JSON-over-HTTP transport backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> DeliveryResult<Self> {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: &str) -> DeliveryResult<Self> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| DeliveryError::Rejected(format!("invalid endpoint {}: {}", endpoint, e)))?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, payload: &CollectorPayload) -> DeliveryResult<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_body()?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }
        Ok(())
    }

    fn send_beacon(&self, payload: CollectorPayload) -> bool {
        // Without a runtime there is nothing to hand the request to
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return false;
        };

        let body = match payload.to_body() {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Beacon payload not serializable: {}", e);
                return false;
            }
        };

        let request = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(body);

        runtime.spawn(async move {
            if let Err(e) = request.send().await {
                tracing::debug!("Beacon delivery failed: {}", e);
            }
        });
        true
    }
}
