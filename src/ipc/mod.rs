//! Backend Call Boundary
//!
//! The single crossing point between the overlay client and the privileged
//! backend process. Every named command goes through [`invoke`], which checks
//! that the backend is reachable, crosses the boundary exactly once and
//! decodes the reply envelope. Results are then classified by [`normalize`].

pub mod envelope;
pub mod result;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub use envelope::CommandEnvelope;
pub use result::{normalize, CallError, CallResult};

/// Failure of the round trip itself: the command never semantically ran
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Call issued outside a context where the backend is reachable
    #[error("backend is not reachable from this context")]
    Unavailable,
    /// Arguments could not be encoded for the boundary
    #[error("failed to encode arguments: {0}")]
    Encode(String),
    /// The backend process could not be reached
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    /// The reply could not be decoded into the expected shape
    #[error("failed to decode reply: {0}")]
    Decode(String),
    /// Any other fault reported by the boundary
    #[error("transport fault: {0}")]
    Fault(String),
}

impl TransportError {
    /// True for the fail-fast context error
    pub fn is_context_error(&self) -> bool {
        matches!(self, TransportError::Unavailable)
    }
}

/// A named-call mechanism into the backend process
#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether calls can reach the backend from the current context
    fn is_available(&self) -> bool;

    /// Perform one raw call and return the undecoded reply
    async fn invoke(&self, command: &str, args: Option<Value>) -> Result<Value, TransportError>;
}

/// Execute a named command and decode its reply envelope.
///
/// Fails with [`TransportError::Unavailable`] without touching the transport
/// when the backend is not reachable. No retry, no batching.
pub async fn invoke<T>(
    transport: &dyn Transport,
    command: &str,
    args: Option<Value>,
) -> Result<CommandEnvelope<T>, TransportError>
where
    T: DeserializeOwned,
{
    if !transport.is_available() {
        debug!("Refusing '{}': backend not reachable", command);
        return Err(TransportError::Unavailable);
    }

    debug!("Invoking '{}'", command);
    let reply = transport.invoke(command, args).await?;

    serde_json::from_value(reply).map_err(|e| TransportError::Decode(e.to_string()))
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_invoke_fails_fast_when_unavailable() {
        let transport = ScriptedTransport::unavailable();

        let result = invoke::<()>(&transport, "open_devtools", None).await;

        assert_eq!(result, Err(TransportError::Unavailable));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invoke_crosses_boundary_once() {
        let transport = ScriptedTransport::new().reply(Ok(json!({
            "success": true,
            "data": 5,
            "error": null,
            "execution_time_ms": 1,
            "timestamp": "2024-01-01T00:00:00Z",
        })));

        let envelope = invoke::<u32>(&transport, "count", Some(json!({"a": 1})))
            .await
            .unwrap();

        assert_eq!(envelope.data, Some(5));
        assert_eq!(
            transport.calls(),
            vec![("count".to_string(), Some(json!({"a": 1})))]
        );
    }

    #[tokio::test]
    async fn test_invoke_propagates_transport_cause_unchanged() {
        let cause = TransportError::Unreachable("socket closed".to_string());
        let transport = ScriptedTransport::new().reply(Err(cause.clone()));

        let result = invoke::<()>(&transport, "open_devtools", None).await;

        assert_eq!(result, Err(cause));
    }

    #[tokio::test]
    async fn test_invoke_undecodable_reply() {
        let transport = ScriptedTransport::new().reply(Ok(json!("not an envelope")));

        let result = invoke::<()>(&transport, "open_devtools", None).await;

        assert!(matches!(result, Err(TransportError::Decode(_))));
    }

    #[test]
    fn test_context_error_classification() {
        assert!(TransportError::Unavailable.is_context_error());
        assert!(!TransportError::Decode("x".to_string()).is_context_error());
    }
}
