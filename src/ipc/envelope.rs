//! Wire envelope returned by every backend command

use serde::{Deserialize, Serialize};

/// Standardized reply for a backend command.
///
/// `success == true` implies `error == None`, and `success == false` implies
/// `data == None`. The constructors are the only way the backend builds one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(default)]
    pub execution_time_ms: u64,
    #[serde(default)]
    pub timestamp: String,
}

impl<T> CommandEnvelope<T> {
    /// Create a successful envelope
    pub fn success(data: T, execution_time_ms: u64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            execution_time_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create a failed envelope
    pub fn failure(error: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            execution_time_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
