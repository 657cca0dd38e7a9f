//! UDP step-event listener.
//!
//! The listener binds a UDP socket on the configured port (default 9000) and
//! waits for datagrams from the phone app.  On receiving a `STEP` payload, it:
//!
//! 1. Increments the session step counter and records the arrival time.
//! 2. Marks the sender as the connected phone.
//! 3. Hands the step to [`DispatchStepsUseCase`] for key injection.
//! 4. Publishes a fresh [`StatusSnapshot`] to the attached sink.
//!
//! The receive loop runs as a blocking loop on a dedicated thread to avoid
//! blocking the Tokio runtime with synchronous socket I/O.
//!
//! # Why UDP? (for beginners)
//!
//! UDP (User Datagram Protocol) is a lightweight, connectionless networking
//! protocol.  Unlike TCP it does not guarantee delivery, ordering, or
//! duplicate prevention.  Those trade-offs suit step events well:
//!
//! 1. A step is tiny (4 bytes of text) and self-contained, so there is no
//!    stream to keep ordered.
//! 2. A lost step costs one keypress out of a continuous walking cadence;
//!    retransmitting it later would be worse than dropping it.
//! 3. The phone can start sending without any handshake, so "pairing" is
//!    just typing the PC's address into the app.
//!
//! # Read timeout
//!
//! The socket is configured with a 1-second read timeout.  This means the
//! `recv_from` call blocks for at most 1 second before returning a timeout
//! error.  On each timeout we check the `running` flag; if a stop was
//! requested we exit the loop cleanly.  [`StepListener::stop`] additionally
//! sends a tiny datagram to the socket from localhost, so shutdown does not
//! have to wait for the timeout to expire.

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime};

use socket2::{Domain, Protocol, Socket, Type};
use stride_core::{
    classify_datagram, validate_port, ConnectionStatus, NetworkSettings, Payload, SettingsError,
    SettingsStore, StatusSink, StatusSnapshot, StoreError,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::application::dispatch_steps::DispatchStepsUseCase;

/// How long `recv_from` blocks before re-checking the running flag.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(1);

/// How long [`StepListener::stop`] waits for the receive thread to exit.
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// `start` was called while a session is already running.
    #[error("listener already running on port {0}")]
    AlreadyListening(u16),
    /// The UDP socket could not be bound.
    #[error("failed to bind listener socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// `update_port` was called while a session is running.
    #[error("port cannot change while the listener is running")]
    PortChangeWhileListening,
    #[error(transparent)]
    InvalidSettings(#[from] SettingsError),
    #[error(transparent)]
    Persist(#[from] StoreError),
    /// The OS refused to spawn the receive thread.
    #[error("failed to spawn receive thread: {0}")]
    ThreadSpawn(std::io::Error),
}

/// Mutable session fields guarded by one lock.
struct SessionState {
    connection_status: ConnectionStatus,
    last_step_time: Option<SystemTime>,
    port: u16,
}

/// State shared between the listener handle and its receive thread.
struct ListenerShared {
    /// Receive loop keeps going while this is set.
    running: AtomicBool,
    /// A session is active (socket bound or being torn down by `stop`).
    listening: AtomicBool,
    /// Steps received since process start, across sessions.
    steps_received: AtomicU64,
    state: Mutex<SessionState>,
    sink: Mutex<Option<Arc<dyn StatusSink>>>,
}

impl ListenerShared {
    fn snapshot(&self) -> StatusSnapshot {
        let state = self.state.lock().expect("lock poisoned");
        StatusSnapshot {
            is_listening: self.listening.load(Ordering::SeqCst),
            connection_status: state.connection_status.clone(),
            steps_received: self.steps_received.load(Ordering::SeqCst),
            last_step_time: state.last_step_time,
            port: state.port,
        }
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.state.lock().expect("lock poisoned").connection_status = status;
    }

    /// Flips the listening flag and the status as one observable transition.
    ///
    /// `snapshot` reads the flag under the same lock, so a concurrent
    /// `status` call never sees the pair half-updated.
    fn transition(&self, listening: bool, status: ConnectionStatus) {
        let mut state = self.state.lock().expect("lock poisoned");
        self.listening.store(listening, Ordering::SeqCst);
        state.connection_status = status;
    }

    fn publish(&self) {
        let sink = self.sink.lock().expect("lock poisoned").clone();
        if let Some(sink) = sink {
            sink.accept(self.snapshot());
        }
    }
}

/// The UDP listener.
///
/// One instance lives for the whole process; sessions are started and
/// stopped through it.  The step counter is cumulative across sessions.
pub struct StepListener {
    dispatcher: Arc<DispatchStepsUseCase>,
    store: Arc<dyn SettingsStore>,
    shared: Arc<ListenerShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
    buffer_size: usize,
}

impl StepListener {
    /// Creates a listener that will bind `network.port` when started.
    pub fn new(
        network: NetworkSettings,
        dispatcher: Arc<DispatchStepsUseCase>,
        store: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            dispatcher,
            store,
            shared: Arc::new(ListenerShared {
                running: AtomicBool::new(false),
                listening: AtomicBool::new(false),
                steps_received: AtomicU64::new(0),
                state: Mutex::new(SessionState {
                    connection_status: ConnectionStatus::Disconnected,
                    last_step_time: None,
                    port: network.port,
                }),
                sink: Mutex::new(None),
            }),
            handle: Mutex::new(None),
            buffer_size: network.buffer_size,
        }
    }

    /// Attaches the sink that receives status snapshots.
    ///
    /// Replaces any previously attached sink.
    pub fn attach_sink(&self, sink: Arc<dyn StatusSink>) {
        *self.shared.sink.lock().expect("lock poisoned") = Some(sink);
    }

    /// Returns whether a listening session is active.
    pub fn is_listening(&self) -> bool {
        self.shared.listening.load(Ordering::SeqCst)
    }

    /// Returns the configured port.
    pub fn port(&self) -> u16 {
        self.shared.state.lock().expect("lock poisoned").port
    }

    /// Returns a point-in-time status snapshot.
    pub fn status(&self) -> StatusSnapshot {
        self.shared.snapshot()
    }

    /// Binds the socket and starts the receive thread.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::AlreadyListening`] if a session is active,
    /// [`ListenerError::BindFailed`] if the socket cannot be bound (typically
    /// because another process holds the port), or
    /// [`ListenerError::ThreadSpawn`] if the OS refuses the thread.  On bind
    /// failure the published status carries the reason so the UI can show it.
    pub fn start(&self) -> Result<(), ListenerError> {
        let port = {
            // Flag and status flip under the state lock, so a concurrent
            // status() never sees a listening listener still Disconnected.
            let mut state = self.shared.state.lock().expect("lock poisoned");
            if self
                .shared
                .listening
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return Err(ListenerError::AlreadyListening(state.port));
            }
            state.connection_status = ConnectionStatus::Listening;
            state.port
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let socket = match bind_reusable(addr) {
            Ok(socket) => socket,
            Err(source) => {
                self.shared
                    .transition(false, ConnectionStatus::Error(format!("bind failed: {source}")));
                self.shared.publish();
                return Err(ListenerError::BindFailed { addr, source });
            }
        };
        socket.set_read_timeout(Some(RECEIVE_TIMEOUT)).ok();

        self.shared.running.store(true, Ordering::SeqCst);

        let shared = Arc::clone(&self.shared);
        let dispatcher = Arc::clone(&self.dispatcher);
        let buffer_size = self.buffer_size;
        let spawned = std::thread::Builder::new()
            .name("stride-listener".to_string())
            .spawn(move || receive_loop(socket, shared, dispatcher, buffer_size));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(source) => {
                self.shared.running.store(false, Ordering::SeqCst);
                self.shared.transition(false, ConnectionStatus::Disconnected);
                return Err(ListenerError::ThreadSpawn(source));
            }
        };
        *self.handle.lock().expect("lock poisoned") = Some(handle);

        info!("step listener started on UDP {addr}");
        self.shared.publish();
        Ok(())
    }

    /// Stops the receive thread and closes the socket.
    ///
    /// Safe to call when not listening (a no-op).  Publishes a `Stopping`
    /// snapshot, wakes the socket, waits up to [`JOIN_TIMEOUT`] for the
    /// thread, then publishes `Disconnected`.  A thread that misses the
    /// deadline is detached rather than blocking shutdown forever.
    pub fn stop(&self) {
        {
            let mut state = self.shared.state.lock().expect("lock poisoned");
            if !self.shared.listening.swap(false, Ordering::SeqCst) {
                return;
            }
            state.connection_status = ConnectionStatus::Stopping;
        }
        self.shared.publish();

        self.shared.running.store(false, Ordering::SeqCst);
        nudge_socket(self.port());

        let handle = self.handle.lock().expect("lock poisoned").take();
        if let Some(handle) = handle {
            if !join_with_timeout(handle, JOIN_TIMEOUT) {
                warn!("receive thread did not exit within {JOIN_TIMEOUT:?}, detaching");
            }
        }

        self.shared.set_status(ConnectionStatus::Disconnected);
        info!("step listener stopped");
        self.shared.publish();
    }

    /// Changes the port for the next session and persists it.
    ///
    /// The running socket is never rebound; callers must stop first.  If
    /// persistence fails the new port still applies until the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::PortChangeWhileListening`] during a session,
    /// [`ListenerError::InvalidSettings`] for an out-of-range port, or
    /// [`ListenerError::Persist`] if the write-back fails.
    pub fn update_port(&self, new_port: u16) -> Result<(), ListenerError> {
        if self.is_listening() {
            return Err(ListenerError::PortChangeWhileListening);
        }
        let port = validate_port(new_port)?;
        self.shared.state.lock().expect("lock poisoned").port = port;
        info!("listener port set to {port}");
        self.store.save_network(&NetworkSettings {
            port,
            buffer_size: self.buffer_size,
        })?;
        Ok(())
    }
}

/// The main receive loop executed on the listener thread.
fn receive_loop(
    socket: UdpSocket,
    shared: Arc<ListenerShared>,
    dispatcher: Arc<DispatchStepsUseCase>,
    buffer_size: usize,
) {
    let mut buf = vec![0u8; buffer_size];

    while shared.running.load(Ordering::SeqCst) {
        let (len, src) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) if is_timeout_error(&e) => continue,
            Err(e) => {
                if !shared.running.load(Ordering::SeqCst) {
                    // Orderly stop closed the socket under us.
                    break;
                }
                error!("listener socket error: {e}");
                shared.running.store(false, Ordering::SeqCst);
                shared.transition(false, ConnectionStatus::Error(format!("socket error: {e}")));
                shared.publish();
                return;
            }
        };
        if !shared.running.load(Ordering::SeqCst) {
            // Shutdown nudge, not phone traffic.
            break;
        }

        match classify_datagram(&buf[..len]) {
            Payload::Step => {
                shared.steps_received.fetch_add(1, Ordering::SeqCst);
                {
                    let mut state = shared.state.lock().expect("lock poisoned");
                    state.last_step_time = Some(SystemTime::now());
                    state.connection_status = ConnectionStatus::ConnectedTo(src);
                }
                debug!("step received from {src}");
                // A failed keypress must not take the listener down.
                if let Err(e) = dispatcher.send_step() {
                    error!("step dispatch failed: {e}");
                }
                shared.publish();
            }
            Payload::Unrecognized => {
                debug!("ignoring unrecognized datagram from {src}");
            }
            Payload::NotText => {
                debug!("ignoring non-text datagram from {src}");
            }
        }
    }

    info!("step listener receive loop exited");
}

/// Binds a UDP socket with `SO_REUSEADDR` set before the bind, so a restart
/// can take the port back while the previous socket still lingers in the OS.
///
/// std's `UdpSocket::bind` offers no way to set socket options first, hence
/// the socket2 detour.
fn bind_reusable(addr: SocketAddr) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

/// Sends an empty datagram to the listener's own port so a blocked
/// `recv_from` wakes immediately instead of waiting out the read timeout.
fn nudge_socket(port: u16) {
    if let Ok(socket) = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)) {
        let _ = socket.send_to(&[], (Ipv4Addr::LOCALHOST, port));
    }
}

/// Joins `handle`, polling `is_finished` until `timeout` elapses.
///
/// Returns `false` when the deadline passed; the handle is dropped and the
/// thread left to finish on its own.
fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    if handle.join().is_err() {
        error!("receive thread panicked during shutdown");
    }
    true
}

/// Returns `true` for OS timeout / would-block errors that should be retried.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
