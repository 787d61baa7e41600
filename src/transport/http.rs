//! HTTPS transport for the ingestion endpoint.
//!
//! Endpoint: POST {api_url}/v1/events
//! Auth: Bearer token

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use super::{Delivery, DeliveryError, Transport};
use crate::config::ClientConfig;
use crate::evidence::EvidenceRecord;

/// Upper bound on the TCP/TLS connect phase
const MAX_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// reqwest-backed transport. The connection pool lives inside `client`
/// and is only ever driven by the dispatcher thread.
pub struct HttpTransport {
    endpoint: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport from client configuration
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(MAX_CONNECT_TIMEOUT))
            .user_agent(user_agent())
            // A redirect would be replayed as a body-less GET
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            endpoint: config.events_endpoint(),
            api_key: config.api_key.clone(),
            timeout,
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, err: reqwest::Error) -> DeliveryError {
        if err.is_timeout() {
            DeliveryError::Timeout(self.timeout)
        } else if err.is_connect() {
            DeliveryError::Connect(err.to_string())
        } else {
            DeliveryError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, record: &EvidenceRecord) -> Result<Delivery, DeliveryError> {
        let body = record.to_wire()?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();

        // A reply cut short is a failed attempt, whatever its status line said
        response.bytes().await.map_err(|e| self.classify(e))?;

        if status.is_success() {
            Ok(Delivery {
                status: status.as_u16(),
            })
        } else {
            Err(DeliveryError::Status {
                status: status.as_u16(),
            })
        }
    }
}

fn user_agent() -> String {
    format!("provit-sdk-rust/{}", crate::SDK_VERSION)
}
