//! In-Process Backend
//!
//! Answers the declared commands inside the client process. Used when the
//! client runs without a privileged companion process, and as the reference
//! implementation of the reply envelope. Every handler goes through
//! [`run_command`], which times it, logs it and wraps its outcome.

pub mod wrapper;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::commands::{
    BringWindowToFront, Command, ListEditorWindows, LogFromFrontend, LogFromFrontendWithData,
    LogLevel, OpenDevtools, WindowInfo,
};
use crate::editor;
use crate::ipc::{Transport, TransportError};
pub use wrapper::{run_command, CommandContext};

/// Message returned when no window focuser is available
pub const FOCUS_UNSUPPORTED: &str = "Window focusing is only supported on macOS";

/// A window as reported by the platform, before editor filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawWindow {
    pub app_name: String,
    pub title: Option<String>,
    pub pid: i32,
    pub window_number: u32,
}

/// Backend serving the declared commands from memory
#[derive(Debug)]
pub struct LocalBackend {
    windows: RwLock<Vec<WindowInfo>>,
    devtools_enabled: bool,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self {
            windows: RwLock::new(Vec::new()),
            devtools_enabled: cfg!(debug_assertions),
        }
    }

    /// Replace the windows reported by `list_editor_windows`
    pub fn set_windows(&self, windows: Vec<WindowInfo>) {
        *self.windows.write() = windows;
    }

    /// Keep the editor windows of a platform snapshot, with project and tab
    /// parsed from their titles. Returns how many were kept.
    pub fn observe_windows(&self, raw: &[RawWindow]) -> usize {
        let windows: Vec<WindowInfo> = raw
            .iter()
            .filter_map(|w| {
                editor::describe_window(&w.app_name, w.title.as_deref(), w.pid, w.window_number)
            })
            .collect();
        debug!("Kept {} of {} windows as editor windows", windows.len(), raw.len());

        let kept = windows.len();
        self.set_windows(windows);
        kept
    }

    fn list_editor_windows(&self) -> Value {
        run_command(ListEditorWindows::NAME, None, |ctx| {
            let windows = self.windows.read().clone();
            ctx.info(&format!("Found {} editor windows", windows.len()));
            Ok(windows)
        })
    }

    fn bring_window_to_front(&self, args: Option<Value>) -> Value {
        run_command(BringWindowToFront::NAME, args, |ctx| {
            let pid = ctx
                .parameters
                .get("pid")
                .and_then(Value::as_i64)
                .ok_or_else(|| "Missing or invalid 'pid' parameter".to_string())?;
            let window_number = ctx
                .parameters
                .get("window_number")
                .and_then(Value::as_u64)
                .ok_or_else(|| "Missing or invalid 'window_number' parameter".to_string())?;

            ctx.info(&format!(
                "Attempting to focus window PID: {}, window number: {}",
                pid, window_number
            ));
            ctx.warn(FOCUS_UNSUPPORTED);
            Err::<(), _>(FOCUS_UNSUPPORTED.to_string())
        })
    }

    fn log_from_frontend(&self, args: Option<Value>) -> Value {
        run_command(LogFromFrontend::NAME, args, |ctx| {
            let entry: LogFromFrontend = serde_json::from_value(ctx.parameters.clone())
                .map_err(|e| format!("Invalid log arguments: {}", e))?;
            emit_frontend_log(entry.level, &entry.tag, &entry.message, None);
            Ok(())
        })
    }

    fn log_from_frontend_with_data(&self, args: Option<Value>) -> Value {
        run_command(LogFromFrontendWithData::NAME, args, |ctx| {
            let entry: LogFromFrontendWithData = serde_json::from_value(ctx.parameters.clone())
                .map_err(|e| format!("Invalid log arguments: {}", e))?;
            emit_frontend_log(entry.level, &entry.tag, &entry.message, Some(&entry.data));
            Ok(())
        })
    }

    fn open_devtools(&self) -> Value {
        run_command(OpenDevtools::NAME, None, |ctx| {
            if self.devtools_enabled {
                ctx.info("Opening DevTools");
            } else {
                ctx.info("DevTools not available in release mode");
            }
            Ok(())
        })
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-emit a log line received from the frontend
fn emit_frontend_log(level: LogLevel, tag: &str, message: &str, data: Option<&Value>) {
    let data = data
        .map(|d| serde_json::to_string_pretty(d).unwrap_or_else(|_| "{}".to_string()))
        .unwrap_or_default();

    match level {
        LogLevel::Debug => debug!(target: "frontend", tag = %tag, data = %data, "{}", message),
        LogLevel::Info => info!(target: "frontend", tag = %tag, data = %data, "{}", message),
        LogLevel::Warn => warn!(target: "frontend", tag = %tag, data = %data, "{}", message),
        LogLevel::Error => error!(target: "frontend", tag = %tag, data = %data, "{}", message),
    }
}

#[async_trait]
impl Transport for LocalBackend {
    fn is_available(&self) -> bool {
        true
    }

    async fn invoke(&self, command: &str, args: Option<Value>) -> Result<Value, TransportError> {
        let reply = match command {
            c if c == ListEditorWindows::NAME => self.list_editor_windows(),
            c if c == BringWindowToFront::NAME => self.bring_window_to_front(args),
            c if c == LogFromFrontend::NAME => self.log_from_frontend(args),
            c if c == LogFromFrontendWithData::NAME => self.log_from_frontend_with_data(args),
            c if c == OpenDevtools::NAME => self.open_devtools(),
            unknown => run_command(unknown, args, |_| {
                Err::<(), _>(format!("unknown command: {}", unknown))
            }),
        };
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Commands;
    use crate::ipc::{self, CallResult};
    use serde_json::json;

    fn cursor_window() -> WindowInfo {
        WindowInfo {
            app_name: "Cursor".to_string(),
            window_name: Some("main.rs - swii".to_string()),
            pid: 100,
            window_number: 1,
            project: Some("swii".to_string()),
            active_editor_tab: Some("main.rs".to_string()),
            app_icon: None,
        }
    }

    #[tokio::test]
    async fn test_list_editor_windows_defaults_to_empty() {
        let backend = LocalBackend::new();
        let commands = Commands::new(&backend);

        assert_eq!(commands.list_editor_windows().await, CallResult::Success(vec![]));
    }

    #[tokio::test]
    async fn test_list_editor_windows_returns_configured() {
        let backend = LocalBackend::new();
        backend.set_windows(vec![cursor_window()]);
        let commands = Commands::new(&backend);

        let windows = commands.list_editor_windows().await.ok().unwrap();

        assert_eq!(windows, vec![cursor_window()]);
    }

    #[tokio::test]
    async fn test_observed_windows_are_filtered_and_parsed() {
        let backend = LocalBackend::new();
        let raw = |app: &str, title: &str, pid| RawWindow {
            app_name: app.to_string(),
            title: Some(title.to_string()),
            pid,
            window_number: 1,
        };

        let kept = backend.observe_windows(&[
            raw("Safari", "Rust docs", 10),
            raw("Code", "main.rs - swii - Visual Studio Code", 20),
            raw("Zed", "switch \u{2014} ARCHITECTURE.md", 30),
        ]);
        let windows = Commands::new(&backend).list_editor_windows().await.ok().unwrap();

        assert_eq!(kept, 2);
        assert_eq!(windows.iter().map(|w| w.pid).collect::<Vec<_>>(), vec![20, 30]);
        assert_eq!(windows[0].project.as_deref(), Some("swii"));
        assert_eq!(windows[0].active_editor_tab.as_deref(), Some("main.rs"));
        assert_eq!(windows[1].project.as_deref(), Some("switch"));
        assert_eq!(windows[1].active_editor_tab.as_deref(), Some("ARCHITECTURE.md"));
    }

    #[tokio::test]
    async fn test_bring_window_to_front_declines() {
        let backend = LocalBackend::new();
        let commands = Commands::new(&backend);

        let result = commands.bring_window_to_front(100, 1).await;

        assert_eq!(result, CallResult::BackendFailure(FOCUS_UNSUPPORTED.to_string()));
    }

    #[tokio::test]
    async fn test_bring_window_to_front_missing_pid() {
        let backend = LocalBackend::new();

        let reply = backend
            .invoke("bring_window_to_front", Some(json!({"window_number": 1})))
            .await
            .unwrap();

        assert_eq!(reply["success"], false);
        assert_eq!(reply["error"], "Missing or invalid 'pid' parameter");
    }

    #[tokio::test]
    async fn test_logging_commands_succeed() {
        let backend = LocalBackend::new();
        let commands = Commands::new(&backend);

        assert!(commands
            .log_from_frontend(LogLevel::Info, "test", "hello")
            .await
            .is_success());
        assert!(commands
            .log_from_frontend_with_data(LogLevel::Error, "test", "boom", json!({"code": 7}))
            .await
            .is_success());
    }

    #[tokio::test]
    async fn test_log_with_bad_level_is_declined() {
        let backend = LocalBackend::new();

        let reply = backend
            .invoke(
                "log_from_frontend",
                Some(json!({"level": "loud", "tag": "t", "message": "m"})),
            )
            .await
            .unwrap();

        assert_eq!(reply["success"], false);
        assert!(reply["error"]
            .as_str()
            .unwrap()
            .starts_with("Invalid log arguments"));
    }

    #[tokio::test]
    async fn test_open_devtools_succeeds() {
        let backend = LocalBackend::new();
        let commands = Commands::new(&backend);

        assert_eq!(commands.open_devtools().await, CallResult::Success(()));
    }

    #[tokio::test]
    async fn test_unknown_command_is_declined() {
        let backend = LocalBackend::new();

        let envelope = ipc::invoke::<()>(&backend, "reboot", None).await.unwrap();

        assert!(!envelope.success);
        assert_eq!(envelope.error.as_deref(), Some("unknown command: reboot"));
    }
}
