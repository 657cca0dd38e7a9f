//! Connection status reporting.
//!
//! The listener publishes a [`StatusSnapshot`] through a [`StatusSink`]
//! whenever something observable happens: the socket opens or closes, a
//! step arrives, or an error takes the listener down.  The desktop crate
//! plugs a channel-backed sink in so the UI layer can react without
//! polling.

use std::net::SocketAddr;
use std::time::SystemTime;

/// Lifecycle state of the UDP listener, as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No socket is open.
    Disconnected,
    /// The socket is bound and waiting for the first datagram.
    Listening,
    /// At least one step arrived; carries the most recent sender.
    ConnectedTo(SocketAddr),
    /// Shutdown has begun but the receive thread has not exited yet.
    Stopping,
    /// The listener died or failed to start; carries the reason.
    Error(String),
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => f.write_str("Disconnected"),
            Self::Listening => f.write_str("Listening"),
            // The port the phone sends from is ephemeral and changes per
            // datagram, so only the address is worth showing.
            Self::ConnectedTo(addr) => write!(f, "Connected to {}", addr.ip()),
            Self::Stopping => f.write_str("Stopping"),
            Self::Error(reason) => write!(f, "Error: {reason}"),
        }
    }
}

/// Point-in-time view of the listener, safe to hand across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    /// Whether a listening session is currently active.
    pub is_listening: bool,
    /// Current lifecycle state.
    pub connection_status: ConnectionStatus,
    /// Steps received since the process started, across sessions.
    pub steps_received: u64,
    /// Arrival time of the most recent step, if any.
    pub last_step_time: Option<SystemTime>,
    /// Port the listener is (or will be) bound to.
    pub port: u16,
}

/// Receiver for status snapshots published by the listener.
///
/// Implementations must be cheap and non-blocking; they are called from the
/// receive thread between datagrams.
pub trait StatusSink: Send + Sync {
    /// Accepts a freshly taken snapshot.
    fn accept(&self, snapshot: StatusSnapshot);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
