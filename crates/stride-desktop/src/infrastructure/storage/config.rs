//! TOML-based configuration persistence for the desktop listener.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Stride\config.toml`
//! - Linux:    `~/.config/stride/config.toml`
//! - macOS:    `~/Library/Application Support/Stride/config.toml`
//!
//! # What is TOML? (for beginners)
//!
//! TOML (Tom's Obvious Minimal Language) is a configuration format meant to
//! be comfortable to read and hand-edit.  It resembles INI files but has
//! real data types.  Example:
//!
//! ```toml
//! [network]
//! port = 9000
//!
//! [controls]
//! forward_key = "w"
//! key_hold_duration = 0.05
//! ```
//!
//! The `serde` library converts between Rust structs and TOML text
//! automatically; the `#[derive(Serialize, Deserialize)]` macros generate
//! the conversion code at compile time.
//!
//! # Serde default values
//!
//! A field annotated with `#[serde(default = "some_fn")]` falls back to
//! `some_fn()` when it is absent from the file.  First runs (no file at all)
//! and upgrades from older files that lack newer fields both load cleanly
//! this way.  Whole sections are defaulted too, so even an empty file parses.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use stride_core::{
    validate_hold_duration, validate_step_duration, ControlSettings, KeyCode, NetworkSettings,
    SettingsError, SettingsStore, StoreError,
};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

/// UDP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// UDP port the phone app sends step events to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Receive buffer size in bytes; a step datagram is far smaller.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

/// Key dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ControlsConfig {
    /// Key simulated for forward movement, e.g. `"w"` or `"up"`.
    #[serde(default = "default_forward_key")]
    pub forward_key: String,
    /// Nominal duration of one step in seconds.
    #[serde(default = "default_step_duration")]
    pub step_duration: f64,
    /// How long the key is held down per step, in seconds.
    #[serde(default = "default_key_hold_duration")]
    pub key_hold_duration: f64,
}

/// General application behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// Whether closing the window hides to the tray instead of exiting.
    #[serde(default = "default_true")]
    pub minimize_to_tray: bool,
    /// Whether the listener starts on app launch without a button press.
    #[serde(default)]
    pub auto_start: bool,
    /// Raises the default log level to `debug` when set.
    #[serde(default)]
    pub debug_mode: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_port() -> u16 {
    stride_core::DEFAULT_PORT
}
fn default_buffer_size() -> usize {
    stride_core::DEFAULT_BUFFER_SIZE
}
fn default_forward_key() -> String {
    "w".to_string()
}
fn default_step_duration() -> f64 {
    0.1
}
fn default_key_hold_duration() -> f64 {
    0.05
}
fn default_true() -> bool {
    true
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            forward_key: default_forward_key(),
            step_duration: default_step_duration(),
            key_hold_duration: default_key_hold_duration(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            minimize_to_tray: default_true(),
            auto_start: false,
            debug_mode: false,
        }
    }
}

// ── Domain conversions ────────────────────────────────────────────────────────

impl NetworkConfig {
    /// Converts to the domain settings struct.
    ///
    /// No validation happens here: a privileged port from a hand-edited file
    /// surfaces as a bind error with a clear message, which is more useful
    /// than refusing to start.
    pub fn to_settings(&self) -> NetworkSettings {
        NetworkSettings {
            port: self.port,
            buffer_size: self.buffer_size,
        }
    }
}

impl ControlsConfig {
    /// Validates and converts to the domain settings struct.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] when a hand-edited file holds an empty key
    /// name or an out-of-range duration.
    pub fn to_settings(&self) -> Result<ControlSettings, SettingsError> {
        Ok(ControlSettings {
            forward_key: KeyCode::new(self.forward_key.clone())?,
            step_duration: validate_step_duration(self.step_duration)?,
            key_hold_duration: validate_hold_duration(self.key_hold_duration)?,
        })
    }
}

impl From<&NetworkSettings> for NetworkConfig {
    fn from(settings: &NetworkSettings) -> Self {
        Self {
            port: settings.port,
            buffer_size: settings.buffer_size,
        }
    }
}

impl From<&ControlSettings> for ControlsConfig {
    fn from(settings: &ControlSettings) -> Self {
        Self {
            forward_key: settings.forward_key.as_str().to_string(),
            step_duration: settings.step_duration.as_secs_f64(),
            key_hold_duration: settings.key_hold_duration.as_secs_f64(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot
/// be determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from disk, returning `AppConfig::default()` if the file
/// does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to disk.
///
/// Creates the config directory and file if they do not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(&config_file_path()?, config)
}

fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    // Ensure directory exists before writing.
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory plus the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Stride"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("stride"))
    }

    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/Stride
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Stride")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        // Fallback for unsupported platforms.
        None
    }
}

// ── Write-back store ──────────────────────────────────────────────────────────

/// [`SettingsStore`] backed by the TOML config file.
///
/// Each save is a read-modify-write of the whole file, so a network save
/// never clobbers a controls change made by another component.
pub struct TomlSettingsStore;

impl TomlSettingsStore {
    fn persist<F>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = load_config().map_err(|e| StoreError::Persist(e.to_string()))?;
        apply(&mut config);
        save_config(&config).map_err(|e| StoreError::Persist(e.to_string()))
    }
}

impl SettingsStore for TomlSettingsStore {
    fn save_network(&self, settings: &NetworkSettings) -> Result<(), StoreError> {
        self.persist(|config| config.network = NetworkConfig::from(settings))
    }

    fn save_controls(&self, settings: &ControlSettings) -> Result<(), StoreError> {
        self.persist(|config| config.controls = ControlsConfig::from(settings))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // ── AppConfig defaults ────────────────────────────────────────────────────

    #[test]
    fn test_app_config_default_has_expected_network_values() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.network.port, 9000);
        assert_eq!(cfg.network.buffer_size, 1024);
    }

    #[test]
    fn test_app_config_default_has_expected_controls() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.controls.forward_key, "w");
        assert_eq!(cfg.controls.step_duration, 0.1);
        assert_eq!(cfg.controls.key_hold_duration, 0.05);
    }

    #[test]
    fn test_general_config_defaults() {
        let cfg = GeneralConfig::default();
        assert!(cfg.minimize_to_tray);
        assert!(!cfg.auto_start);
        assert!(!cfg.debug_mode);
    }

    // ── TOML round-trip ───────────────────────────────────────────────────────

    #[test]
    fn test_app_config_serializes_and_deserializes_round_trip() {
        // Arrange
        let mut cfg = AppConfig::default();
        cfg.network.port = 9100;
        cfg.controls.forward_key = "up".to_string();
        cfg.general.debug_mode = true;

        // Act
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: AppConfig = toml::from_str(&toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        // Arrange: a first-run file may be completely empty
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");

        // Assert
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_deserialize_minimal_toml_uses_defaults() {
        // Arrange: bare section headers, no keys
        let toml_str = r#"
[network]
[controls]
[general]
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize minimal");

        // Assert
        assert_eq!(cfg.network.port, 9000);
        assert_eq!(cfg.controls.forward_key, "w");
        assert!(cfg.general.minimize_to_tray);
    }

    #[test]
    fn test_deserialize_partial_controls_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[controls]
key_hold_duration = 0.2
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.controls.key_hold_duration, 0.2);
        // Unspecified fields keep their defaults
        assert_eq!(cfg.controls.forward_key, "w");
        assert_eq!(cfg.network.port, 9000);
    }

    // ── Domain conversions ────────────────────────────────────────────────────

    #[test]
    fn test_controls_config_converts_to_validated_settings() {
        // Arrange
        let cfg = ControlsConfig::default();

        // Act
        let settings = cfg.to_settings().expect("defaults must validate");

        // Assert
        assert_eq!(settings.forward_key.as_str(), "w");
        assert_eq!(settings.step_duration, Duration::from_millis(100));
        assert_eq!(settings.key_hold_duration, Duration::from_millis(50));
    }

    #[test]
    fn test_controls_config_with_empty_key_fails_validation() {
        // Arrange: a hand-edited file can hold anything
        let cfg = ControlsConfig {
            forward_key: "   ".to_string(),
            ..ControlsConfig::default()
        };

        // Act / Assert
        assert_eq!(cfg.to_settings(), Err(SettingsError::EmptyKey));
    }

    #[test]
    fn test_controls_config_round_trips_through_settings() {
        // Arrange
        let settings = ControlSettings {
            forward_key: KeyCode::new("space").unwrap(),
            step_duration: Duration::from_millis(250),
            key_hold_duration: Duration::from_millis(80),
        };

        // Act
        let cfg = ControlsConfig::from(&settings);
        let restored = cfg.to_settings().unwrap();

        // Assert
        assert_eq!(restored, settings);
    }

    // ── load_config from temp directory ──────────────────────────────────────

    fn temp_config_path(label: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir()
            .join(format!("stride_{label}_{}_{nanos}", std::process::id()))
            .join("config.toml")
    }

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        // Arrange: a path nothing has written to
        let path = temp_config_path("absent");

        // Act
        let cfg = load_config_from(&path).expect("a missing file is not an error");

        // Assert
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_save_and_load_config_round_trip_via_temp_dir() {
        // Arrange
        let path = temp_config_path("roundtrip");
        let mut cfg = AppConfig::default();
        cfg.network.port = 12345;
        cfg.controls.forward_key = "space".to_string();

        // Act: save_config_to creates the parent directory itself
        save_config_to(&path, &cfg).expect("save must succeed");
        let loaded = load_config_from(&path).expect("load must succeed");

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_load_config_reports_parse_error_for_malformed_file() {
        // Arrange
        let path = temp_config_path("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        // Act
        let result = load_config_from(&path);

        // Assert
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        // Cleanup
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    // ── config_dir path formation ─────────────────────────────────────────────

    #[test]
    fn test_platform_config_dir_ends_with_app_directory() {
        // Silently skipped when the base env var is unset (stripped CI container).
        let Some(dir) = platform_config_dir() else {
            return;
        };
        #[cfg(target_os = "windows")]
        assert!(dir.ends_with("Stride"), "got {dir:?}");
        #[cfg(target_os = "linux")]
        assert!(dir.ends_with("stride"), "got {dir:?}");
        #[cfg(target_os = "macos")]
        assert!(dir.ends_with("Stride"), "got {dir:?}");
    }

    #[test]
    fn test_config_file_path_is_inside_platform_dir() {
        // NoPlatformConfigDir in a stripped CI env is acceptable here.
        if let (Ok(path), Ok(dir)) = (config_file_path(), config_dir()) {
            assert!(path.starts_with(&dir), "got {path:?}");
            assert!(path.ends_with("config.toml"), "got {path:?}");
        }
    }
}
