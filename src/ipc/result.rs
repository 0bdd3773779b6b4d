//! Result normalization for backend calls
//!
//! Every call resolves into exactly one [`CallResult`] variant. Transport
//! failures mean the command never semantically executed; backend failures
//! mean it executed and declined. Callers branch on that distinction, for
//! example to decide whether a retry is meaningful.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, warn};

use super::{CommandEnvelope, TransportError};

/// Message used when the backend declines without saying why
pub const MISSING_BACKEND_MESSAGE: &str = "backend reported failure without a message";

/// Normalized outcome of a backend call
#[derive(Debug, Clone, PartialEq)]
pub enum CallResult<T> {
    /// The command ran and returned its payload
    Success(T),
    /// The round trip failed; the command never ran
    TransportFailure(TransportError),
    /// The command ran and the backend declined with a message
    BackendFailure(String),
}

/// Error form of the two failure variants, for callers using `?`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("backend error: {0}")]
    Backend(String),
}

impl<T> CallResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, CallResult::Success(_))
    }

    /// Whether repeating the call could change the outcome.
    ///
    /// Only transport faults qualify; a context error fails the same way
    /// every time, and a backend decline already executed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CallResult::TransportFailure(cause) => !cause.is_context_error(),
            _ => false,
        }
    }

    /// Payload if successful
    pub fn ok(self) -> Option<T> {
        match self {
            CallResult::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CallResult<U> {
        match self {
            CallResult::Success(data) => CallResult::Success(f(data)),
            CallResult::TransportFailure(cause) => CallResult::TransportFailure(cause),
            CallResult::BackendFailure(message) => CallResult::BackendFailure(message),
        }
    }

    pub fn into_result(self) -> Result<T, CallError> {
        match self {
            CallResult::Success(data) => Ok(data),
            CallResult::TransportFailure(cause) => Err(CallError::Transport(cause)),
            CallResult::BackendFailure(message) => Err(CallError::Backend(message)),
        }
    }
}

/// Await a call and classify its outcome. Never fails.
pub async fn normalize<T, F>(call: F) -> CallResult<T>
where
    T: DeserializeOwned,
    F: Future<Output = Result<CommandEnvelope<T>, TransportError>>,
{
    let envelope = match call.await {
        Ok(envelope) => envelope,
        Err(cause) => {
            warn!("Backend call failed in transport: {}", cause);
            return CallResult::TransportFailure(cause);
        }
    };

    if !envelope.success {
        let message = envelope
            .error
            .unwrap_or_else(|| MISSING_BACKEND_MESSAGE.to_string());
        debug!("Backend declined call: {}", message);
        return CallResult::BackendFailure(message);
    }

    match envelope.data {
        Some(data) => CallResult::Success(data),
        // Unit-returning commands reply with `data: null`
        None => match serde_json::from_value(Value::Null) {
            Ok(data) => CallResult::Success(data),
            Err(e) => CallResult::TransportFailure(TransportError::Decode(format!(
                "successful reply carried no data: {}",
                e
            ))),
        },
    }
}
