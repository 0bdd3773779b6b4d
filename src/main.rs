//! swii - window-switcher overlay client
//!
//! Wires the overlay coordinator, the global toggle hotkey and the backend
//! together and runs until interrupted.

use anyhow::{anyhow, Result};
use clap::Parser;
use global_hotkey::GlobalHotKeyEvent;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use swii::backend::LocalBackend;
use swii::commands::all_command_names;
use swii::config::{self, AppConfig, GeneralConfig};
use swii::hotkey::{self, spawn_event_bridge, HotkeyRegistration};
use swii::overlay::{HeadlessWindow, OverlayCoordinator};
use swii::{CallResult, Commands, ShortcutDispatcher, ShortcutEvent};

/// swii - window-switcher overlay client
#[derive(Parser, Debug)]
#[command(name = "swii")]
#[command(about = "Toggle a window-switcher overlay with a global hotkey")]
struct Args {
    /// Path to a configuration file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the overlay visibility poll interval
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Override the toggle hotkey, e.g. "Alt+Space"
    #[arg(long)]
    hotkey: Option<String>,

    /// Do not register the global hotkey
    #[arg(long)]
    no_hotkey: bool,

    /// List editor windows and exit
    #[arg(long)]
    list_windows: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging before anything can report a problem
    let rust_log = std::env::var("RUST_LOG").ok();
    let builder = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(
            GeneralConfig::default().log_filter(rust_log.as_deref()),
        ))
        .with_filter_reloading();
    let log_filter = builder.reload_handle();
    tracing::subscriber::set_global_default(builder.finish())?;

    let config = apply_overrides(config::load_or_default(args.config.as_deref()), &args);
    log_filter.reload(EnvFilter::new(
        config.general.log_filter(rust_log.as_deref()),
    ))?;

    if args.list_windows {
        return current_thread_runtime()?.block_on(list_windows());
    }

    info!("swii starting...");

    // The overlay runs on its own thread; this one owns the hotkey manager
    // and pumps the platform events that feed it
    let (tx, rx) = mpsc::unbounded_channel();
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    let runtime_config = config.clone();
    let overlay_thread = std::thread::Builder::new()
        .name("overlay-runtime".to_string())
        .spawn(move || {
            let result = current_thread_runtime()
                .and_then(|runtime| runtime.block_on(run(runtime_config, rx)));
            let _ = done_tx.send(());
            result
        })?;

    let registration = if config.hotkey.enabled {
        register_hotkey(&config.hotkey.toggle, tx)
    } else {
        info!("Global hotkey disabled");
        None
    };
    hotkey::pump_until(&done_rx);
    drop(registration);

    overlay_thread
        .join()
        .map_err(|_| anyhow!("Overlay runtime thread panicked"))??;
    info!("swii shutdown complete");

    Ok(())
}

fn current_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn apply_overrides(mut config: AppConfig, args: &Args) -> AppConfig {
    if let Some(ms) = args.poll_interval_ms {
        config.overlay.poll_interval_ms = ms;
    }
    if let Some(ref hotkey) = args.hotkey {
        config.hotkey.toggle = hotkey.clone();
    }
    if args.no_hotkey {
        config.hotkey.enabled = false;
    }
    config
}

/// Print the editor windows reported by the backend
async fn list_windows() -> Result<()> {
    let backend = LocalBackend::new();
    let windows = Commands::new(&backend).list_editor_windows().await.into_result()?;

    println!("Editor windows:");
    if windows.is_empty() {
        println!("  No editor windows found");
    }
    for window in &windows {
        println!(
            "  [{}:{}] {} - {}",
            window.pid,
            window.window_number,
            window.app_name,
            window
                .project
                .as_deref()
                .or(window.window_name.as_deref())
                .unwrap_or("Untitled")
        );
    }
    Ok(())
}

async fn run(
    config: AppConfig,
    shortcuts: mpsc::UnboundedReceiver<ShortcutEvent>,
) -> Result<()> {
    let backend = Arc::new(LocalBackend::new());
    debug!("Backend commands: {}", all_command_names().join(", "));
    let overlay = OverlayCoordinator::new(
        Arc::new(HeadlessWindow::new()),
        config.overlay.poll_interval(),
    );

    // Refresh the window list each time the overlay appears
    let refresh_backend = backend.clone();
    overlay.on_show(move || {
        let backend = refresh_backend.clone();
        tokio::spawn(async move {
            let listed = Commands::new(&*backend)
                .list_editor_windows()
                .await
                .map(|windows| windows.len());
            match listed {
                CallResult::Success(count) => info!("Overlay shows {} windows", count),
                CallResult::BackendFailure(message) => {
                    warn!("Backend declined window listing: {}", message)
                }
                CallResult::TransportFailure(cause) => {
                    error!("Window listing never reached the backend: {}", cause)
                }
            }
        });
    });
    overlay.on_hide(|| info!("Overlay hidden"));
    overlay.start();

    if config.overlay.show_on_start {
        overlay.show().await;
    }

    let dispatcher = tokio::spawn(ShortcutDispatcher::new(overlay.clone()).run(shortcuts));

    tokio::signal::ctrl_c().await?;
    info!("Interrupted, shutting down");

    dispatcher.abort();
    overlay.shutdown();

    Ok(())
}

/// Register the toggle hotkey and start forwarding its events.
/// Failures are logged; the overlay keeps running without a hotkey.
fn register_hotkey(
    hotkey: &str,
    tx: mpsc::UnboundedSender<ShortcutEvent>,
) -> Option<HotkeyRegistration> {
    let mut registration = match HotkeyRegistration::new() {
        Ok(registration) => registration,
        Err(e) => {
            warn!("Global hotkeys unavailable: {}", e);
            return None;
        }
    };

    if let Err(e) = registration.register(hotkey) {
        warn!("{}", e);
        return None;
    }
    let hotkey_id = registration.hotkey_id()?;

    if let Err(e) = spawn_event_bridge(GlobalHotKeyEvent::receiver().clone(), hotkey_id, tx) {
        warn!("Failed to start hotkey bridge: {}", e);
        return None;
    }

    Some(registration)
}
