//! Shortcut Dispatcher
//!
//! Turns the raw press/release stream of the global hotkey into one
//! activation per physical press. Auto-repeat delivers repeated "pressed"
//! events before the "released"; only the first one toggles the overlay.

use async_trait::async_trait;
use global_hotkey::{GlobalHotKeyEvent, HotKeyState};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Whether a key went down or up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

/// One raw hotkey event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShortcutEvent {
    pub id: u32,
    pub state: KeyState,
}

impl ShortcutEvent {
    pub fn pressed(id: u32) -> Self {
        Self {
            id,
            state: KeyState::Pressed,
        }
    }

    pub fn released(id: u32) -> Self {
        Self {
            id,
            state: KeyState::Released,
        }
    }
}

impl From<GlobalHotKeyEvent> for ShortcutEvent {
    fn from(event: GlobalHotKeyEvent) -> Self {
        let state = match event.state {
            HotKeyState::Pressed => KeyState::Pressed,
            HotKeyState::Released => KeyState::Released,
        };
        Self {
            id: event.id,
            state,
        }
    }
}

/// Something an activation toggles
#[async_trait]
pub trait ToggleTarget: Send + Sync {
    async fn toggle(&self);
}

/// Interprets hotkey events and drives the toggle target
pub struct ShortcutDispatcher<T> {
    target: T,
    pressed: HashSet<u32>,
}

impl<T: ToggleTarget> ShortcutDispatcher<T> {
    pub fn new(target: T) -> Self {
        Self {
            target,
            pressed: HashSet::new(),
        }
    }

    /// Apply the de-duplication rule. Returns true when the event is a new activation.
    pub fn interpret(&mut self, event: ShortcutEvent) -> bool {
        match event.state {
            KeyState::Pressed => self.pressed.insert(event.id),
            KeyState::Released => {
                self.pressed.remove(&event.id);
                false
            }
        }
    }

    /// Interpret one event and toggle the target on activation
    pub async fn dispatch(&mut self, event: ShortcutEvent) {
        if self.interpret(event) {
            debug!("Hotkey {} activated", event.id);
            self.target.toggle().await;
        }
    }

    /// Dispatch events until every sender is dropped
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<ShortcutEvent>) {
        while let Some(event) = events.recv().await {
            self.dispatch(event).await;
        }
        info!("Shortcut event stream closed");
    }
}
