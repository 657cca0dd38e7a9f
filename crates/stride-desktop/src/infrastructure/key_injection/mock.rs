//! Mock key injector for unit and integration testing.
//!
//! # Why a mock injector?
//!
//! The real injector (`WindowsKeyInjector`) needs a live desktop session and
//! genuinely presses keys on the test machine, feeding input into whatever
//! window happens to be focused.  Test code also has no way to observe what
//! it sent.  `MockKeyInjector` swaps the OS calls for in-memory recording:
//! every press and release lands in a `Mutex<Vec<...>>`, so assertions can
//! check exactly what was injected and in what order.
//!
//! # Usage in tests
//!
//! ```ignore
//! let injector = Arc::new(MockKeyInjector::new());
//! let dispatcher = DispatchStepsUseCase::new(Arc::clone(&injector), store, settings);
//! dispatcher.activate();
//!
//! dispatcher.send_step().unwrap();
//!
//! // Assert that exactly one press was recorded.
//! assert_eq!(injector.presses.lock().unwrap().len(), 1);
//! ```
//!
//! # Failure flags
//!
//! Set `fail_press` / `fail_release` before wiring the injector in to
//! simulate OS failures, or `failsafe_on_press` to simulate the pointer
//! sitting in the kill-switch corner.  Dispatcher error paths become
//! testable without a broken OS.

use std::sync::Mutex;

use stride_core::KeyCode;

use crate::application::dispatch_steps::{InjectionError, KeyInjector};

/// A key injector that records every call instead of touching the OS.
///
/// The record fields are mutexed so the injector can be shared across
/// threads behind an `Arc`.
#[derive(Default)]
pub struct MockKeyInjector {
    /// Records each key passed to `press`.
    pub presses: Mutex<Vec<KeyCode>>,
    /// Records each key passed to `release`.
    pub releases: Mutex<Vec<KeyCode>>,
    /// When `true`, `press` returns an `InjectionError::Platform`.
    pub fail_press: bool,
    /// When `true`, `release` returns an `InjectionError::Platform`.
    pub fail_release: bool,
    /// When `true`, `press` returns an `InjectionError::Failsafe`.
    pub failsafe_on_press: bool,
}

impl MockKeyInjector {
    /// Creates a new `MockKeyInjector` with empty records and all failure
    /// flags off.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyInjector for MockKeyInjector {
    /// Records the press, or returns an error per the failure flags.
    fn press(&self, key: &KeyCode) -> Result<(), InjectionError> {
        if self.failsafe_on_press {
            return Err(InjectionError::Failsafe("pointer in corner".into()));
        }
        if self.fail_press {
            return Err(InjectionError::Platform("mock failure".into()));
        }
        self.presses.lock().unwrap().push(key.clone());
        Ok(())
    }

    /// Records the release, or returns an error if `fail_release` is set.
    fn release(&self, key: &KeyCode) -> Result<(), InjectionError> {
        if self.fail_release {
            return Err(InjectionError::Platform("mock failure".into()));
        }
        self.releases.lock().unwrap().push(key.clone());
        Ok(())
    }
}
