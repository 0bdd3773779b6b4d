//! Typed backend commands
//!
//! Each command is a static declaration of its wire name, argument shape and
//! return shape. [`Commands`] composes [`ipc::invoke`](crate::ipc::invoke) with
//! [`normalize`] for every declared command. No caching, no business logic.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ipc::{self, normalize, CallResult, Transport, TransportError};

/// Declaration of one backend command
pub trait Command {
    /// Wire name of the command
    const NAME: &'static str;
    /// Argument shape; `()` for commands taking no arguments
    type Args: Serialize + Send + Sync;
    /// Payload returned on success
    type Output: DeserializeOwned + Send;
}

/// Information about one editor window as reported by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub app_name: String,
    #[serde(default)]
    pub window_name: Option<String>,
    pub pid: i32,
    pub window_number: u32,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub active_editor_tab: Option<String>,
    #[serde(default)]
    pub app_icon: Option<String>,
}

/// Severity for logs forwarded to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Focus a specific window of a running application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BringWindowToFront {
    pub pid: i32,
    pub window_number: u32,
}

impl Command for BringWindowToFront {
    const NAME: &'static str = "bring_window_to_front";
    type Args = Self;
    type Output = ();
}

/// Enumerate open editor windows
pub struct ListEditorWindows;

impl Command for ListEditorWindows {
    const NAME: &'static str = "list_editor_windows";
    type Args = ();
    type Output = Vec<WindowInfo>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFromFrontend {
    pub level: LogLevel,
    pub tag: String,
    pub message: String,
}

impl Command for LogFromFrontend {
    const NAME: &'static str = "log_from_frontend";
    type Args = Self;
    type Output = ();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogFromFrontendWithData {
    pub level: LogLevel,
    pub tag: String,
    pub message: String,
    pub data: Value,
}

impl Command for LogFromFrontendWithData {
    const NAME: &'static str = "log_from_frontend_with_data";
    type Args = Self;
    type Output = ();
}

pub struct OpenDevtools;

impl Command for OpenDevtools {
    const NAME: &'static str = "open_devtools";
    type Args = ();
    type Output = ();
}

/// Wire names of every declared command
pub fn all_command_names() -> [&'static str; 5] {
    [
        BringWindowToFront::NAME,
        ListEditorWindows::NAME,
        LogFromFrontend::NAME,
        LogFromFrontendWithData::NAME,
        OpenDevtools::NAME,
    ]
}

/// Encode arguments for the wire; an empty shape means "no arguments"
fn encode_args<A: Serialize>(args: &A) -> Result<Option<Value>, TransportError> {
    match serde_json::to_value(args) {
        Ok(Value::Null) => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(TransportError::Encode(e.to_string())),
    }
}

/// Dispatches declared commands over a transport
#[derive(Clone, Copy)]
pub struct Commands<'a> {
    transport: &'a dyn Transport,
}

impl<'a> Commands<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self { transport }
    }

    /// Execute any declared command
    pub async fn execute<C: Command>(&self, args: C::Args) -> CallResult<C::Output> {
        let transport = self.transport;
        normalize(async move {
            let args = encode_args(&args)?;
            ipc::invoke::<C::Output>(transport, C::NAME, args).await
        })
        .await
    }

    pub async fn bring_window_to_front(&self, pid: i32, window_number: u32) -> CallResult<()> {
        self.execute::<BringWindowToFront>(BringWindowToFront { pid, window_number })
            .await
    }

    pub async fn list_editor_windows(&self) -> CallResult<Vec<WindowInfo>> {
        self.execute::<ListEditorWindows>(()).await
    }

    pub async fn log_from_frontend(
        &self,
        level: LogLevel,
        tag: impl Into<String>,
        message: impl Into<String>,
    ) -> CallResult<()> {
        self.execute::<LogFromFrontend>(LogFromFrontend {
            level,
            tag: tag.into(),
            message: message.into(),
        })
        .await
    }

    pub async fn log_from_frontend_with_data(
        &self,
        level: LogLevel,
        tag: impl Into<String>,
        message: impl Into<String>,
        data: Value,
    ) -> CallResult<()> {
        self.execute::<LogFromFrontendWithData>(LogFromFrontendWithData {
            level,
            tag: tag.into(),
            message: message.into(),
            data,
        })
        .await
    }

    pub async fn open_devtools(&self) -> CallResult<()> {
        self.execute::<OpenDevtools>(()).await
    }
}
