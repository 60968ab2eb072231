use serde::Serialize;
use serde_json::Value;

use crate::client::{RemoteSubmitter, SubmitOutcome, Transport};
use crate::models::WireRecord;

/// Result of probing the remote API with a synthetic record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionReport {
    /// Whether a probe was actually sent.
    pub connection_test: bool,
    pub success: bool,
    pub response: Option<Value>,
    pub error: Option<String>,
    pub token_configured: bool
}

pub async fn check_connection<T: Transport>(submitter: Option<&RemoteSubmitter<T>>) -> ConnectionReport {
    let Some(submitter) = submitter else {
        return ConnectionReport {
            connection_test: false,
            success: false,
            response: None,
            error: Some("API token is not configured".to_string()),
            token_configured: false
        };
    };

    let (success, response, error) = match submitter.submit(&WireRecord::probe()).await {
        SubmitOutcome::Success(body) => (true, Some(body), None),
        other => (false, None, Some(other.to_string()))
    };

    ConnectionReport {
        connection_test: true,
        success,
        response,
        error,
        token_configured: true
    }
}
