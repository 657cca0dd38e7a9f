//! Domain types for Stride.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: it compiles and tests on any platform without a socket,
//! a keyboard, or a config file in sight.
//!
//! The outer layers (the listener, the key dispatcher, the storage adapter)
//! depend on these types; the domain never depends on them.  The two
//! capability traits defined here, [`settings::SettingsStore`] and
//! [`status::StatusSink`], are the seams through which persistence and
//! status observation are injected from outside.

/// Validated settings types and the persistence collaborator trait.
pub mod settings;

/// Listener status model and the observer trait.
pub mod status;
