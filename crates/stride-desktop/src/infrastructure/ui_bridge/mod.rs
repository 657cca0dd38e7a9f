//! UI command bridge: exposes listener and dispatcher operations to a
//! desktop shell.
//!
//! All command functions live here and delegate to the shared [`AppState`].
//! The presentation layer (a Tauri-style webview shell, or the headless
//! console front end in `main.rs`) is the only consumer of this module; it
//! must NOT be imported by the Application or Domain layers.
//!
//! Commands are plain `async fn`s taking `Arc<AppState>`, so a shell can
//! route its invocations to them without this crate depending on any UI
//! framework.
//!
//! # Data Transfer Objects (DTOs)
//!
//! Internal types ([`StatusSnapshot`], `Duration`) are not shaped for JSON.
//! Each DTO is a flat struct of JSON-friendly fields (`String`, `u64`,
//! `f64`) deriving `Serialize`/`Deserialize`, so a shell can hand them
//! straight to its serializer.
//!
//! # `CommandResult<T>` wrapper
//!
//! Every command returns `CommandResult<T>` instead of `Result<T, E>`, so
//! all responses share one shape:
//! `{ success: bool, data: T | null, error: string | null }`.
//! A frontend can branch on `result.success` without wrapping each call in
//! try/catch.
//!
//! # Status push
//!
//! Polling `get_status` works, but the listener also pushes snapshots.
//! [`ChannelStatusSink`] adapts the listener's sink trait onto a Tokio
//! channel; the shell (or the console front end) drains the receiver and
//! forwards each snapshot to wherever it is displayed.

use std::sync::Arc;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};
use stride_core::{ControlSettings, SettingsUpdate, StatusSink, StatusSnapshot};
use tokio::sync::mpsc;
use tracing::debug;

use crate::application::dispatch_steps::DispatchStepsUseCase;
use crate::infrastructure::network::listener::StepListener;

// ── Shared application state ──────────────────────────────────────────────────

/// Application state shared by every command.
///
/// Both components are internally synchronized (atomics plus their own
/// locks), so commands hold plain `Arc`s and never need a mutex of their
/// own.  That keeps commands free to run concurrently: a `get_status` never
/// waits behind a `test_key` holding a lock.
pub struct AppState {
    /// The UDP listener translating datagrams into steps.
    pub listener: Arc<StepListener>,
    /// The use case turning steps into keypresses.
    pub dispatcher: Arc<DispatchStepsUseCase>,
}

impl AppState {
    /// Wraps the wired-up components for registration with the shell.
    pub fn new(listener: Arc<StepListener>, dispatcher: Arc<DispatchStepsUseCase>) -> Arc<Self> {
        Arc::new(Self {
            listener,
            dispatcher,
        })
    }
}

// ── Data Transfer Objects (Presentation layer) ────────────────────────────────

/// DTO for the listener status shown in the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDto {
    pub is_listening: bool,
    pub connection_status: String,
    pub steps_received: u64,
    /// Milliseconds since the Unix epoch, if a step has arrived.
    pub last_step_time_ms: Option<u64>,
    pub port: u16,
}

impl From<&StatusSnapshot> for StatusDto {
    fn from(s: &StatusSnapshot) -> Self {
        Self {
            is_listening: s.is_listening,
            connection_status: s.connection_status.to_string(),
            steps_received: s.steps_received,
            last_step_time_ms: s.last_step_time.and_then(|t| {
                t.duration_since(UNIX_EPOCH)
                    .ok()
                    .map(|d| d.as_millis() as u64)
            }),
            port: s.port,
        }
    }
}

/// DTO for the current control settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlSettingsDto {
    pub forward_key: String,
    pub step_duration_secs: f64,
    pub key_hold_duration_secs: f64,
}

impl From<&ControlSettings> for ControlSettingsDto {
    fn from(s: &ControlSettings) -> Self {
        Self {
            forward_key: s.forward_key.as_str().to_string(),
            step_duration_secs: s.step_duration.as_secs_f64(),
            key_hold_duration_secs: s.key_hold_duration.as_secs_f64(),
        }
    }
}

/// DTO for a partial control-settings change from the UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdateDto {
    pub forward_key: Option<String>,
    pub step_duration_secs: Option<f64>,
    pub hold_duration_secs: Option<f64>,
}

impl From<SettingsUpdateDto> for SettingsUpdate {
    fn from(dto: SettingsUpdateDto) -> Self {
        Self {
            forward_key: dto.forward_key,
            step_duration_secs: dto.step_duration_secs,
            hold_duration_secs: dto.hold_duration_secs,
        }
    }
}

/// Unified response wrapper used by all commands.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Starts the UDP listener and returns the resulting status.
pub async fn start_listener(state: Arc<AppState>) -> CommandResult<StatusDto> {
    match state.listener.start() {
        Ok(()) => CommandResult::ok(StatusDto::from(&state.listener.status())),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Stops the UDP listener and returns the resulting status.
pub async fn stop_listener(state: Arc<AppState>) -> CommandResult<StatusDto> {
    state.listener.stop();
    CommandResult::ok(StatusDto::from(&state.listener.status()))
}

/// Returns the current listener status.
pub async fn get_status(state: Arc<AppState>) -> CommandResult<StatusDto> {
    CommandResult::ok(StatusDto::from(&state.listener.status()))
}

/// Changes the UDP port for the next listening session.
///
/// Fails while the listener is running; stop it first.
pub async fn update_port(state: Arc<AppState>, port: u16) -> CommandResult<u16> {
    match state.listener.update_port(port) {
        Ok(()) => CommandResult::ok(port),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Enables translation of steps into keypresses.
pub async fn activate_walking(state: Arc<AppState>) -> CommandResult<bool> {
    state.dispatcher.activate();
    CommandResult::ok(state.dispatcher.is_active())
}

/// Disables translation of steps into keypresses.
pub async fn deactivate_walking(state: Arc<AppState>) -> CommandResult<bool> {
    state.dispatcher.deactivate();
    CommandResult::ok(state.dispatcher.is_active())
}

/// Returns the current control settings.
pub async fn get_control_settings(state: Arc<AppState>) -> CommandResult<ControlSettingsDto> {
    CommandResult::ok(ControlSettingsDto::from(&state.dispatcher.settings()))
}

/// Applies a partial control-settings change and returns the result.
pub async fn update_control_settings(
    state: Arc<AppState>,
    update: SettingsUpdateDto,
) -> CommandResult<ControlSettingsDto> {
    match state.dispatcher.update_settings(&update.into()) {
        Ok(()) => CommandResult::ok(ControlSettingsDto::from(&state.dispatcher.settings())),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Fires one test keypress so the user can verify delivery into the focused
/// window.
pub async fn test_key(state: Arc<AppState>) -> CommandResult<()> {
    match state.dispatcher.test_key() {
        Ok(()) => CommandResult::ok(()),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

// ── Status push channel ───────────────────────────────────────────────────────

/// Adapts [`StatusSink`] onto a Tokio mpsc channel.
///
/// `accept` runs on the listener's receive thread, so it must never block;
/// `try_send` drops a snapshot when the channel is full or the receiver is
/// gone, which is fine because the next snapshot supersedes it anyway.
pub struct ChannelStatusSink {
    tx: mpsc::Sender<StatusSnapshot>,
}

impl ChannelStatusSink {
    /// Creates the sink plus the receiver the shell drains.
    pub fn channel(capacity: usize) -> (Arc<Self>, mpsc::Receiver<StatusSnapshot>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Arc::new(Self { tx }), rx)
    }
}

impl StatusSink for ChannelStatusSink {
    fn accept(&self, snapshot: StatusSnapshot) {
        if let Err(e) = self.tx.try_send(snapshot) {
            debug!("status snapshot dropped: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
