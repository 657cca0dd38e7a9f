//! Platform-specific keyboard injection implementations.
//!
//! The correct implementation is selected at compile time via
//! `#[cfg(target_os = ...)]`.

use std::sync::Arc;

use crate::application::dispatch_steps::KeyInjector;

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

/// Returns the injector for the build target.
///
/// On non-Windows targets there is no real injector yet; keystrokes are
/// recorded by the mock so the rest of the pipeline stays exercisable.
pub fn platform_injector() -> Arc<dyn KeyInjector> {
    #[cfg(target_os = "windows")]
    {
        Arc::new(windows::WindowsKeyInjector::new())
    }
    #[cfg(not(target_os = "windows"))]
    {
        tracing::warn!(
            "no key injector for this platform, keystrokes will be recorded but not delivered"
        );
        Arc::new(mock::MockKeyInjector::new())
    }
}
