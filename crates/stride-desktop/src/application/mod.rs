//! Application layer use cases for the desktop listener.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure business rules) and the infrastructure (OS/network/storage).  Code
//! here orchestrates domain objects to fulfil a user goal, depends only on
//! traits rather than concrete OS adapters, and performs no I/O of its own.
//!
//! # What use cases does the listener have?
//!
//! - **`dispatch_steps`**: Translates step events into timed press/release
//!   pairs on the configured forward key, guards them behind the walking
//!   activation flag, and owns the failsafe reaction.  It runs on every
//!   datagram the phone sends.

pub mod dispatch_steps;
