use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Client;
use tracing::debug;

use crate::client::{TransportError, TransportSetupError};
use crate::config::Settings;
use crate::models::WireRecord;

/// Raw HTTP response as seen by the submitter.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into()
        }
    }
}

/// Sends one wire record to the remote API. A single call is a single attempt; retries live above.
pub trait Transport: Send + Sync + 'static {
    fn post(&self, record: &WireRecord) -> impl Future<Output = Result<HttpReply, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn post(&self, record: &WireRecord) -> impl Future<Output = Result<HttpReply, TransportError>> + Send {
        self.as_ref().post(record)
    }
}

/// JSON POST with bearer authorization to `{base_url}{endpoint}`.
pub struct HttpTransport {
    client: Client,
    url: String,
    token: String
}

impl HttpTransport {
    pub fn new(base_url: &str, endpoint: &str, token: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            url: format!("{base_url}{endpoint}"),
            token: token.to_string()
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, TransportSetupError> {
        let token = settings.token.as_deref().ok_or(TransportSetupError::MissingToken)?;

        Ok(Self::new(&settings.base_url, &settings.endpoint, token, settings.request_timeout)?)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    async fn post(&self, record: &WireRecord) -> Result<HttpReply, TransportError> {
        let response = self.client.post(&self.url)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
            .json(record)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!("Status code: {status}");
        debug!("Response: {body}");

        Ok(HttpReply::new(status, body))
    }
}
