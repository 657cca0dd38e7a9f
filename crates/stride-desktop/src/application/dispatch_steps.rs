//! DispatchStepsUseCase: translates step events into simulated keypresses.
//!
//! This use case sits at the application layer and delegates to a
//! [`KeyInjector`] trait object for OS-level keyboard injection.  The
//! platform-specific implementations are in the infrastructure layer.
//!
//! One step becomes one press/hold/release cycle on the configured forward
//! key.  Sends are serialized through an internal gate so overlapping steps
//! cannot interleave their press and release events, and a short spacing
//! pause after each release keeps the target game's input handling from
//! coalescing back-to-back presses.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stride_core::{
    ControlSettings, KeyCode, SettingsError, SettingsStore, SettingsUpdate, StoreError,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Pause after each release before the next step may begin.
pub const STEP_SPACING: Duration = Duration::from_millis(10);

/// Error type for key injection operations.
#[derive(Debug, Error)]
pub enum InjectionError {
    /// The user parked the pointer in the kill-switch corner.
    #[error("failsafe triggered: {0}")]
    Failsafe(String),
    /// The configured key name has no platform key code.
    #[error("unsupported key name: {0}")]
    UnsupportedKey(String),
    /// The OS rejected the injected event.
    #[error("platform error: {0}")]
    Platform(String),
}

/// Platform-agnostic keyboard injection trait.
///
/// Each supported OS provides an implementation in the infrastructure layer.
/// Implementations check the failsafe (pointer in the top-left screen corner)
/// before every event and report it as [`InjectionError::Failsafe`].
pub trait KeyInjector: Send + Sync {
    /// Presses the key down.
    fn press(&self, key: &KeyCode) -> Result<(), InjectionError>;

    /// Releases the key.
    fn release(&self, key: &KeyCode) -> Result<(), InjectionError>;
}

/// Error type for step dispatch operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Injection(#[from] InjectionError),
    #[error(transparent)]
    InvalidSettings(#[from] SettingsError),
    #[error(transparent)]
    Persist(#[from] StoreError),
}

/// The Dispatch Steps use case.
///
/// Starts **inactive**: steps received before the user activates walking are
/// counted by the listener but produce no keypresses.  The failsafe
/// deactivates the dispatcher rather than erroring out, so a runaway key can
/// always be stopped by flinging the pointer into the screen corner.
pub struct DispatchStepsUseCase {
    injector: Arc<dyn KeyInjector>,
    store: Arc<dyn SettingsStore>,
    active: AtomicBool,
    settings: Mutex<ControlSettings>,
    // Serializes press/hold/release cycles without blocking settings updates.
    send_gate: Mutex<()>,
}

impl DispatchStepsUseCase {
    /// Creates a new use case with the given injector and settings store.
    pub fn new(
        injector: Arc<dyn KeyInjector>,
        store: Arc<dyn SettingsStore>,
        settings: ControlSettings,
    ) -> Self {
        Self {
            injector,
            store,
            active: AtomicBool::new(false),
            settings: Mutex::new(settings),
            send_gate: Mutex::new(()),
        }
    }

    /// Returns whether walking is active.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Returns a copy of the current control settings.
    pub fn settings(&self) -> ControlSettings {
        self.settings.lock().expect("lock poisoned").clone()
    }

    /// Enables keypress dispatch.
    pub fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
        info!("walking activated");
    }

    /// Disables keypress dispatch and releases the forward key in case a
    /// press is in flight.
    ///
    /// Deliberately does not wait on the send gate: a deactivate must take
    /// effect even while a hold is sleeping.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
        let key = self.settings.lock().expect("lock poisoned").forward_key.clone();
        self.release_best_effort(&key);
        info!("walking deactivated");
    }

    /// Dispatches one step: press, hold, release, spacing pause.
    ///
    /// A no-op while inactive.  A failsafe trip deactivates walking and
    /// returns `Ok`; any other injection failure attempts to release the key
    /// before reporting the error, so a failed step never leaves the key
    /// stuck down.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Injection`] for non-failsafe injection
    /// failures.
    pub fn send_step(&self) -> Result<(), DispatchError> {
        if !self.is_active() {
            return Ok(());
        }
        let _gate = self.send_gate.lock().expect("lock poisoned");
        // Re-check: a deactivate may have landed while we waited on the gate.
        if !self.is_active() {
            return Ok(());
        }
        let settings = self.settings();
        let key = &settings.forward_key;

        if let Err(e) = self.injector.press(key) {
            return self.handle_press_failure(key, e);
        }
        std::thread::sleep(settings.key_hold_duration);
        if let Err(e) = self.injector.release(key) {
            return self.handle_release_failure(e);
        }
        std::thread::sleep(STEP_SPACING);
        debug!(key = %key, "step dispatched");
        Ok(())
    }

    /// Holds the forward key down for `duration`, then releases it.
    ///
    /// Used for "walk for N seconds" style actions.  The release is attempted
    /// on every exit path, including injection failures.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Injection`] for non-failsafe injection
    /// failures.
    pub fn send_continuous_forward(&self, duration: Duration) -> Result<(), DispatchError> {
        if !self.is_active() {
            return Ok(());
        }
        let _gate = self.send_gate.lock().expect("lock poisoned");
        if !self.is_active() {
            return Ok(());
        }
        let settings = self.settings();
        let key = &settings.forward_key;

        if let Err(e) = self.injector.press(key) {
            return self.handle_press_failure(key, e);
        }
        std::thread::sleep(duration);
        if let Err(e) = self.injector.release(key) {
            return self.handle_release_failure(e);
        }
        debug!(key = %key, ?duration, "continuous forward finished");
        Ok(())
    }

    /// Applies a partial settings update and persists the result.
    ///
    /// Validation happens before any field changes, so an invalid update
    /// leaves the current settings untouched.  A persistence failure is
    /// reported, but the in-memory change stands; the new values apply until
    /// the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidSettings`] if a provided field fails
    /// validation, or [`DispatchError::Persist`] if the write-back fails.
    pub fn update_settings(&self, update: &SettingsUpdate) -> Result<(), DispatchError> {
        let next = {
            let mut current = self.settings.lock().expect("lock poisoned");
            let next = update.apply_to(&current)?;
            *current = next.clone();
            next
        };
        info!(
            key = %next.forward_key,
            hold_ms = next.key_hold_duration.as_millis() as u64,
            "control settings updated"
        );
        if let Err(e) = self.store.save_controls(&next) {
            warn!("settings applied but not persisted: {e}");
            return Err(e.into());
        }
        Ok(())
    }

    /// Fires a single step so the user can verify key delivery reaches the
    /// focused window.
    ///
    /// # Errors
    ///
    /// Same as [`send_step`](Self::send_step).
    pub fn test_key(&self) -> Result<(), DispatchError> {
        self.send_step()
    }

    fn handle_press_failure(
        &self,
        key: &KeyCode,
        error: InjectionError,
    ) -> Result<(), DispatchError> {
        if matches!(error, InjectionError::Failsafe(_)) {
            warn!("failsafe triggered, deactivating walking: {error}");
            self.active.store(false, Ordering::SeqCst);
            self.release_best_effort(key);
            return Ok(());
        }
        self.release_best_effort(key);
        Err(error.into())
    }

    fn handle_release_failure(&self, error: InjectionError) -> Result<(), DispatchError> {
        if matches!(error, InjectionError::Failsafe(_)) {
            warn!("failsafe triggered, deactivating walking: {error}");
            self.active.store(false, Ordering::SeqCst);
            return Ok(());
        }
        Err(error.into())
    }

    fn release_best_effort(&self, key: &KeyCode) {
        if let Err(e) = self.injector.release(key) {
            debug!("best-effort key release failed: {e}");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
