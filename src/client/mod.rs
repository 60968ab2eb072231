mod errors;
mod submitter;
#[cfg(test)]
pub(crate) mod testing;
mod transport;

pub use errors::{TransportError, TransportSetupError};
pub use submitter::{RemoteSubmitter, RetryPolicy, SubmitOutcome};
pub use transport::{HttpReply, HttpTransport, Transport};
