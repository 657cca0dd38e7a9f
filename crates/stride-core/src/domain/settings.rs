//! Validated settings for the listener and the key dispatcher.
//!
//! All user-supplied values pass through the validators in this module
//! before any component state is mutated.  Out-of-range input is rejected
//! with a [`SettingsError`] carrying a human-readable reason, so callers
//! (a settings dialog, a CLI flag parser) can show it directly.
//!
//! Persistence is not handled here.  Components that change a setting write
//! it back through the [`SettingsStore`] collaborator, which the desktop
//! crate implements on top of the TOML config file.

use std::time::Duration;

use thiserror::Error;

/// Lowest port accepted by the validator.  Ports below 1024 are reserved
/// for system services on most platforms.
pub const MIN_PORT: u16 = 1024;

/// Shortest accepted key-hold duration in seconds.
pub const MIN_HOLD_SECS: f64 = 0.01;

/// Longest accepted key-hold duration in seconds.
pub const MAX_HOLD_SECS: f64 = 1.0;

/// Error type for settings validation and persistence-collaborator failures.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    /// The port is outside the accepted range.
    #[error("port {0} is outside the allowed range {min}-65535", min = MIN_PORT)]
    PortOutOfRange(u16),

    /// The forward key name is empty or whitespace-only.
    #[error("forward key must not be empty")]
    EmptyKey,

    /// The key-hold duration is outside the accepted range.
    #[error(
        "key hold duration {0}s is outside the allowed range {min}-{max}s",
        min = MIN_HOLD_SECS,
        max = MAX_HOLD_SECS
    )]
    HoldDurationOutOfRange(f64),

    /// The step duration is zero, negative, or not a finite number.
    #[error("step duration must be a positive number of seconds, got {0}")]
    InvalidStepDuration(f64),
}

/// Error produced by a [`SettingsStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed or rejected the write.
    #[error("failed to persist settings: {0}")]
    Persist(String),
}

// ── Validators ────────────────────────────────────────────────────────────────

/// Validates a UDP port for the listener.
///
/// # Errors
///
/// Returns [`SettingsError::PortOutOfRange`] for ports below 1024.
pub fn validate_port(port: u16) -> Result<u16, SettingsError> {
    if port < MIN_PORT {
        return Err(SettingsError::PortOutOfRange(port));
    }
    Ok(port)
}

/// Validates a key-hold duration given in seconds and converts it to a
/// [`Duration`].
///
/// # Errors
///
/// Returns [`SettingsError::HoldDurationOutOfRange`] when `secs` is outside
/// `0.01..=1.0` or not a finite number.
pub fn validate_hold_duration(secs: f64) -> Result<Duration, SettingsError> {
    // NaN fails the range check, so from_secs_f64 below cannot panic.
    if !(MIN_HOLD_SECS..=MAX_HOLD_SECS).contains(&secs) {
        return Err(SettingsError::HoldDurationOutOfRange(secs));
    }
    Ok(Duration::from_secs_f64(secs))
}

/// Validates a step duration given in seconds and converts it to a
/// [`Duration`].
///
/// # Errors
///
/// Returns [`SettingsError::InvalidStepDuration`] when `secs` is not a
/// positive finite number.
pub fn validate_step_duration(secs: f64) -> Result<Duration, SettingsError> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(SettingsError::InvalidStepDuration(secs));
    }
    Ok(Duration::from_secs_f64(secs))
}

// ── Key code ──────────────────────────────────────────────────────────────────

/// A validated keyboard key name, e.g. `"w"`, `"space"`, `"up"`.
///
/// Key names follow the conventions of the companion phone app: single
/// characters name themselves, and named keys use lowercase words.  The
/// platform injector translates the name to an OS key code at send time;
/// a name the platform cannot translate fails there, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCode(String);

impl KeyCode {
    /// Creates a key code from a user-supplied name, trimming surrounding
    /// whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::EmptyKey`] if the trimmed name is empty.
    pub fn new(name: impl Into<String>) -> Result<Self, SettingsError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(SettingsError::EmptyKey);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the key name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Settings structs ──────────────────────────────────────────────────────────

/// Settings consumed by the datagram listener at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSettings {
    /// UDP port to bind.
    pub port: u16,
    /// Receive buffer size in bytes.
    pub buffer_size: usize,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            port: crate::protocol::DEFAULT_PORT,
            buffer_size: crate::protocol::DEFAULT_BUFFER_SIZE,
        }
    }
}

/// Settings consumed by the key dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlSettings {
    /// The key simulated for forward movement.
    pub forward_key: KeyCode,
    /// Nominal duration of one step; used by callers that convert step
    /// cadence into continuous movement.
    pub step_duration: Duration,
    /// How long the forward key is held down for a single step.
    pub key_hold_duration: Duration,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            // "w" is the forward key in virtually every PC game.
            forward_key: KeyCode("w".to_string()),
            step_duration: Duration::from_millis(100),
            key_hold_duration: Duration::from_millis(50),
        }
    }
}

/// A partial update to [`ControlSettings`].
///
/// Each field is independently optional; absent fields leave the current
/// value untouched.  [`apply_to`](Self::apply_to) validates every provided
/// field before producing the new settings, so an invalid update never
/// mutates anything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    /// New forward key name, if changing.
    pub forward_key: Option<String>,
    /// New step duration in seconds, if changing.
    pub step_duration_secs: Option<f64>,
    /// New key-hold duration in seconds, if changing.
    pub hold_duration_secs: Option<f64>,
}

impl SettingsUpdate {
    /// Returns `true` when no field is set.
    pub fn is_empty(&self) -> bool {
        self.forward_key.is_none()
            && self.step_duration_secs.is_none()
            && self.hold_duration_secs.is_none()
    }

    /// Validates the provided fields and returns a copy of `current` with
    /// them applied.
    ///
    /// # Errors
    ///
    /// Returns the first [`SettingsError`] encountered; `current` is never
    /// modified.
    pub fn apply_to(&self, current: &ControlSettings) -> Result<ControlSettings, SettingsError> {
        let mut next = current.clone();
        if let Some(name) = &self.forward_key {
            next.forward_key = KeyCode::new(name.clone())?;
        }
        if let Some(secs) = self.step_duration_secs {
            next.step_duration = validate_step_duration(secs)?;
        }
        if let Some(secs) = self.hold_duration_secs {
            next.key_hold_duration = validate_hold_duration(secs)?;
        }
        Ok(next)
    }
}

// ── Persistence collaborator ──────────────────────────────────────────────────

/// Write-back collaborator for persisted configuration.
///
/// The listener and dispatcher own their settings in memory; when a setting
/// changes they push the new value through this trait.  The desktop crate
/// implements it on top of the TOML config file, and tests supply in-memory
/// recordings.
pub trait SettingsStore: Send + Sync {
    /// Persists the network section (port, buffer size).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    fn save_network(&self, settings: &NetworkSettings) -> Result<(), StoreError>;

    /// Persists the controls section (forward key, durations).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    fn save_controls(&self, settings: &ControlSettings) -> Result<(), StoreError>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Port validation ───────────────────────────────────────────────────────

    #[test]
    fn test_validate_port_accepts_range_boundaries() {
        assert_eq!(validate_port(1024), Ok(1024));
        assert_eq!(validate_port(65535), Ok(65535));
        assert_eq!(validate_port(9000), Ok(9000));
    }

    #[test]
    fn test_validate_port_rejects_privileged_ports() {
        assert_eq!(validate_port(1023), Err(SettingsError::PortOutOfRange(1023)));
        assert_eq!(validate_port(80), Err(SettingsError::PortOutOfRange(80)));
        assert_eq!(validate_port(0), Err(SettingsError::PortOutOfRange(0)));
    }

    // ── Duration validation ───────────────────────────────────────────────────

    #[test]
    fn test_validate_hold_duration_accepts_range_boundaries() {
        assert_eq!(validate_hold_duration(0.01), Ok(Duration::from_millis(10)));
        assert_eq!(validate_hold_duration(1.0), Ok(Duration::from_secs(1)));
    }

    #[test]
    fn test_validate_hold_duration_rejects_out_of_range() {
        assert!(validate_hold_duration(0.009).is_err());
        assert!(validate_hold_duration(1.01).is_err());
        assert!(validate_hold_duration(0.0).is_err());
        assert!(validate_hold_duration(-0.5).is_err());
    }

    #[test]
    fn test_validate_hold_duration_rejects_nan_and_infinity() {
        assert!(validate_hold_duration(f64::NAN).is_err());
        assert!(validate_hold_duration(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_step_duration_requires_positive_finite() {
        assert_eq!(validate_step_duration(0.1), Ok(Duration::from_millis(100)));
        assert!(validate_step_duration(0.0).is_err());
        assert!(validate_step_duration(-1.0).is_err());
        assert!(validate_step_duration(f64::NAN).is_err());
    }

    // ── KeyCode ───────────────────────────────────────────────────────────────

    #[test]
    fn test_key_code_trims_whitespace() {
        // Arrange / Act
        let key = KeyCode::new("  w \n").unwrap();

        // Assert
        assert_eq!(key.as_str(), "w");
        assert_eq!(key.to_string(), "w");
    }

    #[test]
    fn test_key_code_rejects_empty_and_whitespace_names() {
        assert_eq!(KeyCode::new(""), Err(SettingsError::EmptyKey));
        assert_eq!(KeyCode::new("   "), Err(SettingsError::EmptyKey));
        assert_eq!(KeyCode::new("\t\n"), Err(SettingsError::EmptyKey));
    }

    #[test]
    fn test_key_code_accepts_named_keys() {
        assert_eq!(KeyCode::new("space").unwrap().as_str(), "space");
        assert_eq!(KeyCode::new("up").unwrap().as_str(), "up");
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_control_settings_defaults() {
        let s = ControlSettings::default();
        assert_eq!(s.forward_key.as_str(), "w");
        assert_eq!(s.step_duration, Duration::from_millis(100));
        assert_eq!(s.key_hold_duration, Duration::from_millis(50));
    }

    #[test]
    fn test_network_settings_defaults() {
        let s = NetworkSettings::default();
        assert_eq!(s.port, 9000);
        assert_eq!(s.buffer_size, 1024);
    }

    // ── SettingsUpdate ────────────────────────────────────────────────────────

    #[test]
    fn test_empty_update_leaves_settings_unchanged() {
        // Arrange
        let current = ControlSettings::default();
        let update = SettingsUpdate::default();

        // Act
        let next = update.apply_to(&current).unwrap();

        // Assert
        assert!(update.is_empty());
        assert_eq!(next, current);
    }

    #[test]
    fn test_partial_update_changes_only_provided_field() {
        // Arrange
        let current = ControlSettings::default();
        let update = SettingsUpdate {
            hold_duration_secs: Some(0.2),
            ..SettingsUpdate::default()
        };

        // Act
        let next = update.apply_to(&current).unwrap();

        // Assert: only the hold duration changed
        assert_eq!(next.key_hold_duration, Duration::from_millis(200));
        assert_eq!(next.forward_key, current.forward_key);
        assert_eq!(next.step_duration, current.step_duration);
    }

    #[test]
    fn test_full_update_changes_all_fields() {
        // Arrange
        let current = ControlSettings::default();
        let update = SettingsUpdate {
            forward_key: Some("space".to_string()),
            step_duration_secs: Some(0.25),
            hold_duration_secs: Some(0.08),
        };

        // Act
        let next = update.apply_to(&current).unwrap();

        // Assert
        assert_eq!(next.forward_key.as_str(), "space");
        assert_eq!(next.step_duration, Duration::from_millis(250));
        assert_eq!(next.key_hold_duration, Duration::from_millis(80));
    }

    #[test]
    fn test_invalid_update_is_rejected_without_partial_application() {
        // Arrange: valid key change combined with an invalid duration
        let current = ControlSettings::default();
        let update = SettingsUpdate {
            forward_key: Some("space".to_string()),
            hold_duration_secs: Some(5.0),
            ..SettingsUpdate::default()
        };

        // Act
        let result = update.apply_to(&current);

        // Assert: the whole update fails; caller keeps `current` as-is
        assert_eq!(result, Err(SettingsError::HoldDurationOutOfRange(5.0)));
    }

    #[test]
    fn test_update_rejects_empty_key_name() {
        let update = SettingsUpdate {
            forward_key: Some("  ".to_string()),
            ..SettingsUpdate::default()
        };
        let result = update.apply_to(&ControlSettings::default());
        assert_eq!(result, Err(SettingsError::EmptyKey));
    }

    // ── Error display ─────────────────────────────────────────────────────────

    #[test]
    fn test_settings_errors_render_human_readable_reasons() {
        assert_eq!(
            SettingsError::PortOutOfRange(80).to_string(),
            "port 80 is outside the allowed range 1024-65535"
        );
        assert_eq!(
            SettingsError::EmptyKey.to_string(),
            "forward key must not be empty"
        );
    }
}
