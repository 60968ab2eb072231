use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::time::Instant;

use crate::client::{HttpReply, Transport, TransportError};
use crate::models::WireRecord;

/// Transport that replays a fixed script of replies and records when each call happened.
///
/// Once the script runs out every further call answers `fallback`.
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpReply, TransportError>>>,
    fallback: Result<HttpReply, TransportError>,
    calls: Mutex<Vec<(Instant, WireRecord)>>
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Result<HttpReply, TransportError>>) -> Self {
        Self::with_fallback(script, Ok(HttpReply::new(201, "{}")))
    }

    pub(crate) fn with_fallback(script: Vec<Result<HttpReply, TransportError>>, fallback: Result<HttpReply, TransportError>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new())
        }
    }

    pub(crate) fn always(reply: HttpReply) -> Self {
        Self::with_fallback(Vec::new(), Ok(reply))
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
    }

    pub(crate) fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().map(|calls| calls.iter().map(|(at, _)| *at).collect()).unwrap_or_default()
    }

    pub(crate) fn submitted_brands(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.iter().map(|(_, record)| record.brand.clone()).collect()).unwrap_or_default()
    }
}

impl Transport for ScriptedTransport {
    async fn post(&self, record: &WireRecord) -> Result<HttpReply, TransportError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((Instant::now(), record.clone()));
        }

        let next = self.script.lock().ok().and_then(|mut script| script.pop_front());

        next.unwrap_or_else(|| self.fallback.clone())
    }
}
