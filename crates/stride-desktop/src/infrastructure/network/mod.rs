//! Network infrastructure for the desktop listener.
//!
//! # Sub-modules
//!
//! - **`listener`**: Binds the UDP socket the phone app sends step events
//!   to, runs the receive loop on a dedicated thread, and feeds recognized
//!   steps into the dispatch use case.

pub mod listener;
