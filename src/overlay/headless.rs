//! In-process overlay surface for running without a windowing backend

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use super::{NativeError, NativeWindow};

/// Keeps overlay visibility in memory and logs each request
#[derive(Debug, Default)]
pub struct HeadlessWindow {
    visible: AtomicBool,
    focused: AtomicBool,
}

impl HeadlessWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NativeWindow for HeadlessWindow {
    async fn is_visible(&self) -> Result<bool, NativeError> {
        Ok(self.visible.load(Ordering::SeqCst))
    }

    async fn show(&self) -> Result<(), NativeError> {
        self.visible.store(true, Ordering::SeqCst);
        info!("Overlay surface shown");
        Ok(())
    }

    async fn set_focus(&self) -> Result<(), NativeError> {
        self.focused.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn hide(&self) -> Result<(), NativeError> {
        self.visible.store(false, Ordering::SeqCst);
        self.focused.store(false, Ordering::SeqCst);
        info!("Overlay surface hidden");
        Ok(())
    }
}
