//! # stride-core
//!
//! Shared library for Stride containing the step wire protocol, validated
//! settings types, and the listener status model.
//!
//! This crate is used by the desktop service and by integration tests.
//! It has zero dependencies on OS APIs, sockets, or UI frameworks.
//!
//! # What is Stride? (for beginners)
//!
//! Stride lets you walk a character in a PC game by physically pacing in
//! place.  A companion app on your phone detects each step you take and
//! sends a tiny UDP packet to your PC over the local network.  The desktop
//! service receives the packet and simulates a short press of the game's
//! forward-movement key.
//!
//! This crate (`stride-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`**: What travels over the network.  A datagram is a plain
//!   UTF-8 text payload; the only recognized command is the literal `STEP`.
//!
//! - **`domain`**: Pure business logic with no OS dependencies: validated
//!   settings (which key to press, how long to hold it, which port to
//!   listen on) and the status model that external observers consume.

// Declare the two top-level modules.  Rust will look for each in a
// subdirectory with the same name (e.g., src/protocol/mod.rs).
pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `stride_core::StatusSnapshot` instead of the full module path.
pub use domain::settings::{
    validate_hold_duration, validate_port, validate_step_duration, ControlSettings, KeyCode,
    NetworkSettings, SettingsError, SettingsStore, SettingsUpdate, StoreError,
};
pub use domain::status::{ConnectionStatus, StatusSink, StatusSnapshot};
pub use protocol::{classify_datagram, Payload, DEFAULT_BUFFER_SIZE, DEFAULT_PORT, STEP_COMMAND};
