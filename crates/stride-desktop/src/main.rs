//! Stride desktop listener entry point.
//!
//! Wires together all infrastructure services and starts the Tokio async
//! runtime.  Command routing for a windowed shell goes through the
//! `infrastructure::ui_bridge` module; this binary runs the console front
//! end, which drives the same components directly.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()          -- TOML file, defaults on first run
//!  └─ wire components
//!       ├─ TomlSettingsStore      (write-back persistence)
//!       ├─ platform_injector()    (SendInput on Windows)
//!       ├─ DispatchStepsUseCase   (steps -> keypresses)
//!       └─ StepListener           (UDP background thread)
//!  └─ status pump             (Tokio task draining snapshots)
//!  └─ ctrl-c                  -- stop listener, release key, exit
//! ```

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use stride_core::{validate_port, ControlSettings};
use stride_desktop::application::dispatch_steps::DispatchStepsUseCase;
use stride_desktop::infrastructure::key_injection::platform_injector;
use stride_desktop::infrastructure::network::listener::StepListener;
use stride_desktop::infrastructure::storage::config::{load_config, AppConfig, TomlSettingsStore};
use stride_desktop::infrastructure::ui_bridge::ChannelStatusSink;

/// Command-line options.
#[derive(Debug, Parser)]
#[command(
    name = "stride",
    about = "Walk in place, walk in game: turns phone step events into keypresses",
    version
)]
struct Cli {
    /// Run without the desktop window, as a console listener.
    #[arg(long = "no-window")]
    no_window: bool,

    /// UDP port for this run; overrides the config file without changing it.
    #[arg(long)]
    port: Option<u16>,

    /// Log at debug level regardless of the config file.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Config must load before logging so debug_mode can raise the level.
    let (config, config_err) = match load_config() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    let default_level = if cli.debug || config.general.debug_mode {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("Stride starting");
    if let Some(e) = config_err {
        warn!("could not load config file, using defaults: {e}");
    }
    if !cli.no_window {
        info!("windowed shell not bundled in this build, continuing in console mode");
    }

    // ── Settings ──────────────────────────────────────────────────────────────
    let mut network = config.network.to_settings();
    if let Some(port) = cli.port {
        network.port = validate_port(port).context("invalid --port value")?;
        info!(
            "using port {} from the command line for this run",
            network.port
        );
    }
    let controls = match config.controls.to_settings() {
        Ok(controls) => controls,
        Err(e) => {
            warn!("config file controls are invalid ({e}), using defaults");
            ControlSettings::default()
        }
    };

    // ── Components ────────────────────────────────────────────────────────────
    let store = Arc::new(TomlSettingsStore);
    let dispatcher = Arc::new(DispatchStepsUseCase::new(
        platform_injector(),
        Arc::clone(&store) as _,
        controls,
    ));
    let listener = Arc::new(StepListener::new(network, Arc::clone(&dispatcher), store));

    // ── Status pump ───────────────────────────────────────────────────────────
    let (sink, mut status_rx) = ChannelStatusSink::channel(64);
    listener.attach_sink(sink);
    tokio::spawn(async move {
        while let Some(snapshot) = status_rx.recv().await {
            info!(
                status = %snapshot.connection_status,
                steps = snapshot.steps_received,
                "listener status"
            );
        }
    });

    // Console mode walks as soon as steps arrive; there is no button to press.
    dispatcher.activate();
    listener
        .start()
        .context("could not start the step listener")?;

    info!(
        "Stride ready on UDP port {}.  Press Ctrl-C to exit.",
        listener.port()
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutdown signal received");

    listener.stop();
    dispatcher.deactivate();

    info!("Stride stopped");
    Ok(())
}
