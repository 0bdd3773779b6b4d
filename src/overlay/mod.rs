//! Overlay Visibility Coordinator
//!
//! Tracks whether the overlay window is visible and drives show/hide
//! requests to the native layer. The recorded state only ever changes when
//! a poll tick observes the native value; `show`/`hide` are advisory.
//! Native failures are logged and absorbed here, never propagated.

pub mod headless;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use headless::HeadlessWindow;

/// Failure reported by the native window layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeError {
    #[error("native window query failed: {0}")]
    Query(String),
    #[error("native window request failed: {0}")]
    Request(String),
}

/// The native window hosting the overlay
#[async_trait]
pub trait NativeWindow: Send + Sync {
    async fn is_visible(&self) -> Result<bool, NativeError>;
    async fn show(&self) -> Result<(), NativeError>;
    async fn set_focus(&self) -> Result<(), NativeError>;
    async fn hide(&self) -> Result<(), NativeError>;
}

/// Reaction fired on a confirmed visibility transition
pub type Reaction = Arc<dyn Fn() + Send + Sync>;

/// Recorded visibility plus the registered reactions
struct OverlayState {
    visible: bool,
    on_show: Option<Reaction>,
    on_hide: Option<Reaction>,
}

/// What a single poll tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Native value matched the recorded value
    Unchanged,
    /// Recorded value changed to the contained visibility
    Transitioned(bool),
    /// Native query failed; state untouched
    Failed,
    /// Coordinator shut down while the query was pending
    Discarded,
}

struct Inner {
    window: Arc<dyn NativeWindow>,
    poll_interval: Duration,
    state: Mutex<OverlayState>,
    /// Held for the whole of a tick, so ticks never overlap
    tick: tokio::sync::Mutex<()>,
    shutdown: CancellationToken,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

/// Owns the overlay visibility state machine and its poll loop.
///
/// Cloning yields another handle to the same coordinator.
#[derive(Clone)]
pub struct OverlayCoordinator {
    inner: Arc<Inner>,
}

impl OverlayCoordinator {
    /// Create a coordinator in the `Hidden` state. The poll loop is not
    /// running until [`start`](Self::start) is called.
    pub fn new(window: Arc<dyn NativeWindow>, poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                window,
                poll_interval,
                state: Mutex::new(OverlayState {
                    visible: false,
                    on_show: None,
                    on_hide: None,
                }),
                tick: tokio::sync::Mutex::new(()),
                shutdown: CancellationToken::new(),
                poll_task: Mutex::new(None),
            }),
        }
    }

    /// Recorded visibility as last confirmed by a poll
    pub fn is_visible(&self) -> bool {
        self.inner.state.lock().visible
    }

    /// Register the reaction to a hidden -> visible transition, replacing any previous one
    pub fn on_show(&self, reaction: impl Fn() + Send + Sync + 'static) {
        self.inner.state.lock().on_show = Some(Arc::new(reaction));
    }

    /// Register the reaction to a visible -> hidden transition, replacing any previous one
    pub fn on_hide(&self, reaction: impl Fn() + Send + Sync + 'static) {
        self.inner.state.lock().on_hide = Some(Arc::new(reaction));
    }

    /// Ask the native layer to show and focus the overlay
    pub async fn show(&self) {
        debug!("Requesting overlay show");
        if let Err(e) = self.inner.window.show().await {
            warn!("Failed to show overlay: {}", e);
            return;
        }
        if let Err(e) = self.inner.window.set_focus().await {
            warn!("Failed to focus overlay: {}", e);
        }
    }

    /// Ask the native layer to hide the overlay
    pub async fn hide(&self) {
        debug!("Requesting overlay hide");
        if let Err(e) = self.inner.window.hide().await {
            warn!("Failed to hide overlay: {}", e);
        }
    }

    /// Hide if the native window is visible, show otherwise.
    ///
    /// Reads the native value rather than the recorded one, so a toggle is
    /// never made against stale state.
    pub async fn toggle(&self) {
        match self.inner.window.is_visible().await {
            Ok(true) => self.hide().await,
            Ok(false) => self.show().await,
            Err(e) => warn!("Cannot toggle overlay, visibility unknown: {}", e),
        }
    }

    /// Run one poll tick: read native visibility and react to a change.
    ///
    /// Ticks are serialized with the poll loop and with each other; a call
    /// made while another tick is in flight waits for it to finish.
    pub async fn poll_once(&self) -> PollOutcome {
        let _tick = self.inner.tick.lock().await;
        if self.is_shut_down() {
            return PollOutcome::Discarded;
        }

        let observed = self.inner.window.is_visible().await;

        if self.is_shut_down() {
            return PollOutcome::Discarded;
        }

        let visible = match observed {
            Ok(visible) => visible,
            Err(e) => {
                warn!("Overlay visibility poll failed: {}", e);
                return PollOutcome::Failed;
            }
        };

        let reaction = {
            let mut state = self.inner.state.lock();
            if state.visible == visible {
                return PollOutcome::Unchanged;
            }
            state.visible = visible;
            if visible {
                state.on_show.clone()
            } else {
                state.on_hide.clone()
            }
        };

        debug!("Overlay became {}", if visible { "visible" } else { "hidden" });
        if let Some(reaction) = reaction {
            reaction();
        }

        PollOutcome::Transitioned(visible)
    }

    /// Spawn the poll loop on the current tokio runtime. Does nothing if the
    /// loop is already running or the coordinator has been shut down.
    pub fn start(&self) {
        let mut poll_task = self.inner.poll_task.lock();
        if poll_task.is_some() || self.is_shut_down() {
            return;
        }

        let coordinator = self.clone();
        let shutdown = self.inner.shutdown.clone();
        let period = self.inner.poll_interval;

        info!("Starting overlay poll loop every {:?}", period);
        *poll_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // A tick that fires while a query is pending is dropped, not queued
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                coordinator.poll_once().await;
            }

            debug!("Overlay poll loop stopped");
        }));
    }

    /// Stop the poll loop. Safe to call any number of times.
    ///
    /// A poll already awaiting the native layer finishes on its own; its
    /// result is discarded.
    pub fn shutdown(&self) {
        if self.is_shut_down() {
            return;
        }
        self.inner.shutdown.cancel();
        self.inner.poll_task.lock().take();
        info!("Overlay coordinator shut down");
    }

    /// True once [`shutdown`](Self::shutdown) has been called
    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}

#[async_trait]
impl crate::shortcut::ToggleTarget for OverlayCoordinator {
    async fn toggle(&self) {
        OverlayCoordinator::toggle(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Request {
        Show,
        Focus,
        Hide,
    }

    /// Native window whose visibility reads come from a script
    struct ScriptedWindow {
        reads: Mutex<VecDeque<Result<bool, NativeError>>>,
        fallback: Mutex<bool>,
        requests: Mutex<Vec<Request>>,
    }

    impl ScriptedWindow {
        fn new(reads: Vec<Result<bool, NativeError>>) -> Arc<Self> {
            Arc::new(Self {
                reads: Mutex::new(reads.into()),
                fallback: Mutex::new(false),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<Request> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl NativeWindow for ScriptedWindow {
        async fn is_visible(&self) -> Result<bool, NativeError> {
            self.reads
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(*self.fallback.lock()))
        }

        async fn show(&self) -> Result<(), NativeError> {
            self.requests.lock().push(Request::Show);
            Ok(())
        }

        async fn set_focus(&self) -> Result<(), NativeError> {
            self.requests.lock().push(Request::Focus);
            Ok(())
        }

        async fn hide(&self) -> Result<(), NativeError> {
            self.requests.lock().push(Request::Hide);
            Ok(())
        }
    }

    /// Native window whose visibility reads take time, tracking overlap
    struct SlowWindow {
        reads: Mutex<VecDeque<(Duration, bool)>>,
        fallback: (Duration, bool),
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        read_count: AtomicUsize,
    }

    impl SlowWindow {
        fn new(fallback: (Duration, bool), reads: Vec<(Duration, bool)>) -> Arc<Self> {
            Arc::new(Self {
                reads: Mutex::new(reads.into()),
                fallback,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                read_count: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl NativeWindow for SlowWindow {
        async fn is_visible(&self) -> Result<bool, NativeError> {
            let (delay, visible) = self.reads.lock().pop_front().unwrap_or(self.fallback);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.read_count.fetch_add(1, Ordering::SeqCst);

            tokio::time::sleep(delay).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(visible)
        }

        async fn show(&self) -> Result<(), NativeError> {
            Ok(())
        }

        async fn set_focus(&self) -> Result<(), NativeError> {
            Ok(())
        }

        async fn hide(&self) -> Result<(), NativeError> {
            Ok(())
        }
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = count.clone();
        (count, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn coordinator(window: Arc<ScriptedWindow>) -> OverlayCoordinator {
        OverlayCoordinator::new(window, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_starts_hidden() {
        let overlay = coordinator(ScriptedWindow::new(vec![]));
        assert!(!overlay.is_visible());
    }

    #[tokio::test]
    async fn test_transition_fires_once() {
        let overlay = coordinator(ScriptedWindow::new(vec![Ok(true), Ok(true)]));
        let (shows, on_show) = counter();
        let (hides, on_hide) = counter();
        overlay.on_show(on_show);
        overlay.on_hide(on_hide);

        assert_eq!(overlay.poll_once().await, PollOutcome::Transitioned(true));
        assert_eq!(overlay.poll_once().await, PollOutcome::Unchanged);

        assert!(overlay.is_visible());
        assert_eq!(shows.load(Ordering::SeqCst), 1);
        assert_eq!(hides.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hide_transition_fires_on_hide() {
        let overlay = coordinator(ScriptedWindow::new(vec![Ok(true), Ok(false)]));
        let (hides, on_hide) = counter();
        overlay.on_hide(on_hide);

        overlay.poll_once().await;
        assert_eq!(overlay.poll_once().await, PollOutcome::Transitioned(false));

        assert!(!overlay.is_visible());
        assert_eq!(hides.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_poll_then_recovery() {
        let overlay = coordinator(ScriptedWindow::new(vec![
            Err(NativeError::Query("window gone".to_string())),
            Ok(true),
        ]));
        let (shows, on_show) = counter();
        overlay.on_show(on_show);

        assert_eq!(overlay.poll_once().await, PollOutcome::Failed);
        assert!(!overlay.is_visible());
        assert_eq!(shows.load(Ordering::SeqCst), 0);

        assert_eq!(overlay.poll_once().await, PollOutcome::Transitioned(true));
        assert!(overlay.is_visible());
        assert_eq!(shows.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let overlay = coordinator(ScriptedWindow::new(vec![Ok(true)]));
        let (first, on_first) = counter();
        let (second, on_second) = counter();
        overlay.on_show(on_first);
        overlay.on_show(on_second);

        overlay.poll_once().await;

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_show_does_not_flip_recorded_state() {
        let window = ScriptedWindow::new(vec![]);
        let overlay = coordinator(window.clone());
        let (shows, on_show) = counter();
        overlay.on_show(on_show);

        overlay.show().await;

        assert!(!overlay.is_visible());
        assert_eq!(shows.load(Ordering::SeqCst), 0);
        assert_eq!(window.requests(), vec![Request::Show, Request::Focus]);
    }

    #[tokio::test]
    async fn test_toggle_reads_native_value_each_time() {
        // Recorded state stays hidden throughout; native reads drive direction
        let window = ScriptedWindow::new(vec![Ok(false), Ok(true)]);
        let overlay = coordinator(window.clone());

        overlay.toggle().await;
        overlay.toggle().await;

        assert!(!overlay.is_visible());
        assert_eq!(
            window.requests(),
            vec![Request::Show, Request::Focus, Request::Hide]
        );
    }

    #[tokio::test]
    async fn test_toggle_with_failed_read_sends_nothing() {
        let window = ScriptedWindow::new(vec![Err(NativeError::Query("busy".to_string()))]);
        let overlay = coordinator(window.clone());

        overlay.toggle().await;

        assert!(window.requests().is_empty());
    }

    #[tokio::test]
    async fn test_poll_loop_observes_transition() {
        let window = ScriptedWindow::new(vec![]);
        *window.fallback.lock() = true;
        let overlay = coordinator(window);
        let (shows, on_show) = counter();
        overlay.on_show(on_show);

        overlay.start();
        overlay.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        overlay.shutdown();

        assert!(overlay.is_visible());
        assert_eq!(shows.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_query_skips_ticks_instead_of_overlapping() {
        let window = SlowWindow::new((Duration::from_millis(35), false), vec![]);
        let overlay = OverlayCoordinator::new(window.clone(), Duration::from_millis(10));

        overlay.start();
        tokio::time::sleep(Duration::from_millis(400)).await;
        overlay.shutdown();

        let reads = window.read_count.load(Ordering::SeqCst);
        assert_eq!(window.max_in_flight.load(Ordering::SeqCst), 1);
        // 40 ticks fit in the window; a 35ms query leaves room for at most 12
        assert!(reads >= 2, "only {} reads", reads);
        assert!(reads <= 400 / 35 + 2, "{} reads, ticks were queued", reads);
    }

    #[tokio::test]
    async fn test_overlapping_poll_calls_apply_in_order() {
        // The first read is slow and stale; the second is quick and current
        let window = SlowWindow::new(
            (Duration::ZERO, false),
            vec![(Duration::from_millis(30), true), (Duration::from_millis(5), false)],
        );
        let overlay = OverlayCoordinator::new(window.clone(), Duration::from_millis(10));
        let (shows, on_show) = counter();
        let (hides, on_hide) = counter();
        overlay.on_show(on_show);
        overlay.on_hide(on_hide);

        let (first, second) = tokio::join!(overlay.poll_once(), overlay.poll_once());

        assert_eq!(first, PollOutcome::Transitioned(true));
        assert_eq!(second, PollOutcome::Transitioned(false));
        assert_eq!(window.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(!overlay.is_visible());
        assert_eq!(shows.load(Ordering::SeqCst), 1);
        assert_eq!(hides.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent_and_discards_polls() {
        let overlay = coordinator(ScriptedWindow::new(vec![Ok(true)]));
        let (shows, on_show) = counter();
        overlay.on_show(on_show);

        overlay.start();
        overlay.shutdown();
        overlay.shutdown();

        assert!(overlay.is_shut_down());
        assert_eq!(overlay.poll_once().await, PollOutcome::Discarded);
        assert!(!overlay.is_visible());
        assert_eq!(shows.load(Ordering::SeqCst), 0);
    }
}
