use std::fmt;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::client::{HttpReply, Transport, TransportError};
use crate::models::{FormatError, VehicleRecord, WireRecord};

/// Classified result of submitting one record, after retries.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// HTTP 200/201. Carries the parsed body, or `{"status": "success"}` when the body is not JSON.
    Success(Value),
    /// HTTP 409, the record already exists remotely.
    Duplicate(String),
    /// Any other 4xx. Never retried.
    ClientError(String),
    /// 5xx or any status outside the handled ranges.
    ServerError(String),
    TransportError(TransportError)
}

impl SubmitOutcome {
    pub fn from_reply(reply: HttpReply) -> Self {
        let HttpReply { status, body } = reply;

        match status {
            200 | 201 => {
                let value = serde_json::from_str::<Value>(&body).unwrap_or_else(|_| json!({ "status": "success" }));
                SubmitOutcome::Success(value)
            }
            409 => SubmitOutcome::Duplicate(format!("Duplicate or conflict: {body}")),
            400..=499 => SubmitOutcome::ClientError(format!("Client error ({status}): {body}")),
            _ => SubmitOutcome::ServerError(format!("Server error ({status}): {body}"))
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitOutcome::ServerError(_) | SubmitOutcome::TransportError(_))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Success(_))
    }
}

impl Display for SubmitOutcome {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SubmitOutcome::Success(_) => formatter.write_str("Success"),
            SubmitOutcome::Duplicate(message)
            | SubmitOutcome::ClientError(message)
            | SubmitOutcome::ServerError(message) => formatter.write_str(message),
            SubmitOutcome::TransportError(error) => write!(formatter, "{error}")
        }
    }
}

/// Bounded retries with exponential backoff: `base_delay * 2^n` before retry `n` (zero based), no jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_secs(1)
        }
    }

    pub fn backoff_delay(&self, retry_index: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry_index))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Formats vehicle records into the wire schema and submits them with retries.
pub struct RemoteSubmitter<T: Transport> {
    transport: T,
    policy: RetryPolicy
}

impl<T: Transport> RemoteSubmitter<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy
        }
    }

    pub fn format(&self, record: &VehicleRecord) -> Result<WireRecord, FormatError> {
        WireRecord::try_from(record).inspect_err(|error| error!("{error}"))
    }

    /// Submits one record. Only server and transport failures are retried; the last observed outcome is
    /// returned once attempts run out.
    pub async fn submit(&self, record: &WireRecord) -> SubmitOutcome {
        let max_attempts = self.policy.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            info!("Submitting record (attempt {attempt}/{max_attempts})");

            if let Ok(payload) = serde_json::to_string(record) {
                debug!("Payload: {payload}");
            }

            let outcome = match self.transport.post(record).await {
                Ok(reply) => SubmitOutcome::from_reply(reply),
                Err(error) => SubmitOutcome::TransportError(error)
            };

            match &outcome {
                SubmitOutcome::Success(_) => info!("Record submitted successfully"),
                SubmitOutcome::Duplicate(message) => warn!("{message}"),
                _ => error!("{outcome} (attempt {attempt}/{max_attempts})")
            }

            if !outcome.is_retryable() || attempt >= max_attempts {
                return outcome;
            }

            let delay = self.policy.backoff_delay(attempt - 1);
            info!("Retrying in {delay:?}");
            sleep(delay).await;
        }
    }
}
