//! Infrastructure layer for the desktop listener.
//!
//! Contains OS-facing adapters: the UDP datagram listener, keyboard
//! injection, file-system storage, and the UI command bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `stride_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod key_injection;
pub mod network;
pub mod storage;
pub mod ui_bridge;
