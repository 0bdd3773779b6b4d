//! swii - window-switcher overlay client
//!
//! Keeps the overlay's recorded visibility consistent with the native
//! window, turns the global hotkey into show/hide toggles, and exchanges
//! typed commands with the backend through a single call boundary.

pub mod backend;
pub mod commands;
pub mod config;
pub mod editor;
pub mod hotkey;
pub mod ipc;
pub mod overlay;
pub mod shortcut;

pub use commands::{Commands, LogLevel, WindowInfo};
pub use ipc::{CallResult, Transport, TransportError};
pub use overlay::{NativeWindow, OverlayCoordinator};
pub use shortcut::{ShortcutDispatcher, ShortcutEvent};
