//! Global hotkey registration for the overlay toggle

use anyhow::{anyhow, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use global_hotkey::{
    hotkey::{Code, HotKey, Modifiers},
    GlobalHotKeyEvent, GlobalHotKeyManager,
};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::shortcut::ShortcutEvent;

/// Parses a hotkey string like "Alt+Space", "Cmd+Shift+K", "F9" into a HotKey
pub fn parse_hotkey(hotkey_str: &str) -> Result<HotKey> {
    let mut modifiers = Modifiers::empty();
    let mut key_code: Option<Code> = None;

    for part in hotkey_str.split('+').map(str::trim) {
        let upper = part.to_uppercase();
        match upper.as_str() {
            "CTRL" | "CONTROL" => modifiers |= Modifiers::CONTROL,
            "SHIFT" => modifiers |= Modifiers::SHIFT,
            "ALT" | "OPTION" | "OPT" => modifiers |= Modifiers::ALT,
            "WIN" | "SUPER" | "META" | "CMD" | "COMMAND" => modifiers |= Modifiers::SUPER,
            "COMMANDORCONTROL" | "CMDORCTRL" => modifiers |= primary_modifier(),
            "" => return Err(anyhow!("Empty key in hotkey string '{}'", hotkey_str)),
            _ => {
                if key_code.is_some() {
                    return Err(anyhow!("More than one key in hotkey string '{}'", hotkey_str));
                }
                key_code = Some(parse_key_code(&upper)?);
            }
        }
    }

    let code = key_code.ok_or_else(|| anyhow!("No key code found in hotkey string"))?;
    Ok(HotKey::new(Some(modifiers), code))
}

/// Cmd on macOS, Ctrl elsewhere
fn primary_modifier() -> Modifiers {
    if cfg!(target_os = "macos") {
        Modifiers::SUPER
    } else {
        Modifiers::CONTROL
    }
}

/// Parse a key code string into a Code enum
fn parse_key_code(key: &str) -> Result<Code> {
    if let Some(letter) = single_char(key).filter(char::is_ascii_uppercase) {
        return Ok(LETTERS[(letter as u8 - b'A') as usize]);
    }
    if let Some(digit) = single_char(key).and_then(|c| c.to_digit(10)) {
        return Ok(DIGITS[digit as usize]);
    }

    let code = match key {
        "F1" => Code::F1,
        "F2" => Code::F2,
        "F3" => Code::F3,
        "F4" => Code::F4,
        "F5" => Code::F5,
        "F6" => Code::F6,
        "F7" => Code::F7,
        "F8" => Code::F8,
        "F9" => Code::F9,
        "F10" => Code::F10,
        "F11" => Code::F11,
        "F12" => Code::F12,

        "SPACE" => Code::Space,
        "ENTER" | "RETURN" => Code::Enter,
        "TAB" => Code::Tab,
        "ESCAPE" | "ESC" => Code::Escape,
        "BACKSPACE" => Code::Backspace,
        "DELETE" | "DEL" => Code::Delete,
        "HOME" => Code::Home,
        "END" => Code::End,
        "PAGEUP" | "PGUP" => Code::PageUp,
        "PAGEDOWN" | "PGDN" => Code::PageDown,
        "UP" => Code::ArrowUp,
        "DOWN" => Code::ArrowDown,
        "LEFT" => Code::ArrowLeft,
        "RIGHT" => Code::ArrowRight,
        "`" | "BACKQUOTE" => Code::Backquote,
        "," | "COMMA" => Code::Comma,
        "." | "PERIOD" => Code::Period,
        "/" | "SLASH" => Code::Slash,
        ";" | "SEMICOLON" => Code::Semicolon,

        _ => return Err(anyhow!("Unknown key code: {}", key)),
    };

    Ok(code)
}

fn single_char(key: &str) -> Option<char> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

const LETTERS: [Code; 26] = [
    Code::KeyA,
    Code::KeyB,
    Code::KeyC,
    Code::KeyD,
    Code::KeyE,
    Code::KeyF,
    Code::KeyG,
    Code::KeyH,
    Code::KeyI,
    Code::KeyJ,
    Code::KeyK,
    Code::KeyL,
    Code::KeyM,
    Code::KeyN,
    Code::KeyO,
    Code::KeyP,
    Code::KeyQ,
    Code::KeyR,
    Code::KeyS,
    Code::KeyT,
    Code::KeyU,
    Code::KeyV,
    Code::KeyW,
    Code::KeyX,
    Code::KeyY,
    Code::KeyZ,
];

const DIGITS: [Code; 10] = [
    Code::Digit0,
    Code::Digit1,
    Code::Digit2,
    Code::Digit3,
    Code::Digit4,
    Code::Digit5,
    Code::Digit6,
    Code::Digit7,
    Code::Digit8,
    Code::Digit9,
];

/// Holds the OS registration of the overlay toggle hotkey
pub struct HotkeyRegistration {
    manager: GlobalHotKeyManager,
    registered: Option<(String, HotKey)>,
}

impl HotkeyRegistration {
    pub fn new() -> Result<Self> {
        let manager = GlobalHotKeyManager::new()
            .map_err(|e| anyhow!("Failed to create hotkey manager: {:?}", e))?;

        Ok(Self {
            manager,
            registered: None,
        })
    }

    /// Register the toggle hotkey, replacing any previous one.
    /// Registering the same combination again is a no-op.
    pub fn register(&mut self, hotkey_str: &str) -> Result<u32> {
        let hotkey = parse_hotkey(hotkey_str)?;

        if let Some((_, current)) = &self.registered {
            if current.id() == hotkey.id() {
                return Ok(hotkey.id());
            }
        }
        self.unregister();

        self.manager
            .register(hotkey)
            .map_err(|e| anyhow!("Failed to register hotkey '{}': {:?}", hotkey_str, e))?;

        self.registered = Some((hotkey_str.to_string(), hotkey));
        info!("Registered overlay toggle hotkey: {}", hotkey_str);
        Ok(hotkey.id())
    }

    /// Unregister the toggle hotkey if one is registered
    pub fn unregister(&mut self) {
        if let Some((hotkey_str, hotkey)) = self.registered.take() {
            match self.manager.unregister(hotkey) {
                Ok(()) => info!("Unregistered overlay toggle hotkey: {}", hotkey_str),
                Err(e) => warn!("Failed to unregister hotkey '{}': {:?}", hotkey_str, e),
            }
        }
    }

    /// Id of the registered hotkey
    pub fn hotkey_id(&self) -> Option<u32> {
        self.registered.as_ref().map(|(_, hotkey)| hotkey.id())
    }
}

impl Drop for HotkeyRegistration {
    fn drop(&mut self) {
        self.unregister();
    }
}

/// How long the hotkey thread waits between platform event pumps
pub const PUMP_INTERVAL: Duration = Duration::from_millis(20);

/// Deliver pending platform events to the hotkey manager created on this
/// thread. Windows posts hotkey messages to the creating thread's queue and
/// macOS dispatches them from the main run loop; elsewhere there is nothing
/// to pump.
#[cfg(windows)]
pub fn pump_platform_events() {
    use windows::Win32::Foundation::HWND;
    use windows::Win32::UI::WindowsAndMessaging::{
        DispatchMessageW, PeekMessageW, TranslateMessage, MSG, PM_REMOVE,
    };

    unsafe {
        let mut msg = MSG::default();
        while PeekMessageW(&mut msg, HWND::default(), 0, 0, PM_REMOVE).into() {
            let _ = TranslateMessage(&msg);
            let _ = DispatchMessageW(&msg);
        }
    }
}

#[cfg(target_os = "macos")]
pub fn pump_platform_events() {
    use core_foundation::runloop::{kCFRunLoopDefaultMode, CFRunLoop};

    let mode = unsafe { kCFRunLoopDefaultMode };
    let _ = CFRunLoop::run_in_mode(mode, Duration::ZERO, false);
}

#[cfg(not(any(windows, target_os = "macos")))]
pub fn pump_platform_events() {}

/// Pump platform events on the calling thread until `stop` receives a value
/// or its sender goes away.
///
/// Call this on the thread that created the [`HotkeyRegistration`].
pub fn pump_until(stop: &Receiver<()>) {
    loop {
        pump_platform_events();
        match stop.recv_timeout(PUMP_INTERVAL) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("Hotkey event pump stopped");
}

/// Forward events for `hotkey_id` from the global hotkey receiver to `tx`.
///
/// Runs on its own thread because the receiver blocks. The thread ends when
/// either side of the bridge disconnects.
pub fn spawn_event_bridge(
    receiver: Receiver<GlobalHotKeyEvent>,
    hotkey_id: u32,
    tx: UnboundedSender<ShortcutEvent>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("hotkey-bridge".to_string())
        .spawn(move || {
            while let Ok(event) = receiver.recv() {
                if event.id != hotkey_id {
                    continue;
                }
                if tx.send(ShortcutEvent::from(event)).is_err() {
                    break;
                }
            }
            debug!("Hotkey bridge exiting");
        })
}
