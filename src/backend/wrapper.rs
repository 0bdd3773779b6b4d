//! Command wrapper: timing, logging and envelope construction for handlers

use serde::Serialize;
use serde_json::Value;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::ipc::CommandEnvelope;

/// Per-call metadata handed to a command handler
pub struct CommandContext {
    pub command_name: String,
    pub start_time: Instant,
    /// Arguments of the call, `Value::Null` when none were sent
    pub parameters: Value,
}

impl CommandContext {
    pub fn new(command_name: &str, parameters: Value) -> Self {
        Self {
            command_name: command_name.to_string(),
            start_time: Instant::now(),
            parameters,
        }
    }

    pub fn info(&self, message: &str) {
        info!(command = %self.command_name, "{}", message);
    }

    pub fn warn(&self, message: &str) {
        warn!(command = %self.command_name, "{}", message);
    }

    pub fn error(&self, message: &str) {
        error!(command = %self.command_name, "{}", message);
    }

    fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }
}

/// Run a handler and wrap its outcome in a serialized [`CommandEnvelope`]
pub fn run_command<T, F>(command_name: &str, args: Option<Value>, handler: F) -> Value
where
    T: Serialize,
    F: FnOnce(&CommandContext) -> Result<T, String>,
{
    let ctx = CommandContext::new(command_name, args.unwrap_or(Value::Null));
    ctx.info("Command started");
    if !ctx.parameters.is_null() {
        ctx.info("Command has parameters");
    }

    let result = handler(&ctx);
    let execution_time_ms = ctx.elapsed_ms();

    let envelope = match result {
        Ok(data) => match serde_json::to_value(data) {
            Ok(data) => {
                ctx.info(&format!(
                    "Command completed successfully in {}ms",
                    execution_time_ms
                ));
                CommandEnvelope::success(data, execution_time_ms)
            }
            Err(e) => {
                let message = format!("Failed to serialize result: {}", e);
                ctx.error(&message);
                CommandEnvelope::failure(message, execution_time_ms)
            }
        },
        Err(message) => {
            ctx.error(&format!("Command failed: {}", message));
            CommandEnvelope::failure(message, execution_time_ms)
        }
    };

    // Envelope of plain JSON values always serializes
    serde_json::to_value(envelope).unwrap_or(Value::Null)
}
