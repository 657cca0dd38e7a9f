//! In-memory settings store for tests.
//!
//! Records every save in a `Mutex<Vec<...>>` (like the mock key injector)
//! so tests can assert that a component wrote back exactly the settings it
//! applied, without the test run writing to the real config file.

use std::sync::Mutex;

use stride_core::{ControlSettings, NetworkSettings, SettingsStore, StoreError};

/// A recording [`SettingsStore`] that never touches the file system.
#[derive(Default)]
pub struct MemorySettingsStore {
    /// Records each value passed to `save_network`.
    pub saved_network: Mutex<Vec<NetworkSettings>>,
    /// Records each value passed to `save_controls`.
    pub saved_controls: Mutex<Vec<ControlSettings>>,
    /// When `true`, every save returns a `StoreError::Persist`.
    pub should_fail: bool,
}

impl MemorySettingsStore {
    /// Creates an empty store with `should_fail = false`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn save_network(&self, settings: &NetworkSettings) -> Result<(), StoreError> {
        if self.should_fail {
            return Err(StoreError::Persist("mock failure".into()));
        }
        self.saved_network.lock().unwrap().push(settings.clone());
        Ok(())
    }

    fn save_controls(&self, settings: &ControlSettings) -> Result<(), StoreError> {
        if self.should_fail {
            return Err(StoreError::Persist("mock failure".into()));
        }
        self.saved_controls.lock().unwrap().push(settings.clone());
        Ok(())
    }
}
