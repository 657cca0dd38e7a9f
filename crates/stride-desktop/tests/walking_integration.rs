//! Integration tests for the walking pipeline: status push, the UI command
//! surface, and the safety behaviour around deactivation and the failsafe.
//!
//! # Purpose
//!
//! Where `listener_integration.rs` drives the `StepListener` directly, these
//! tests wire the system the way `main.rs` does: listener plus dispatcher
//! plus a `ChannelStatusSink`, with commands from the `ui_bridge` on top.
//! They verify:
//!
//! - Status snapshots arrive on the channel in lifecycle order, from
//!   `Listening` through `ConnectedTo` to `Disconnected`.
//! - A datagram sent by a "phone" ends up as a keypress when driven purely
//!   through UI commands.
//! - Deactivating mid-hold releases the key instead of leaving it stuck.
//! - A failsafe trip turns walking off without killing the listener.

use std::net::UdpSocket;
use std::sync::Arc;
use std::time::{Duration, Instant};

use stride_core::{
    ConnectionStatus, ControlSettings, NetworkSettings, SettingsStore, StatusSnapshot,
};
use stride_desktop::application::dispatch_steps::DispatchStepsUseCase;
use stride_desktop::infrastructure::key_injection::mock::MockKeyInjector;
use stride_desktop::infrastructure::network::listener::StepListener;
use stride_desktop::infrastructure::storage::memory::MemorySettingsStore;
use stride_desktop::infrastructure::ui_bridge::{
    activate_walking, get_status, start_listener, stop_listener, AppState, ChannelStatusSink,
};

// ── Test harness ──────────────────────────────────────────────────────────────

struct Harness {
    listener: Arc<StepListener>,
    dispatcher: Arc<DispatchStepsUseCase>,
    injector: Arc<MockKeyInjector>,
    port: u16,
}

fn make_harness(injector: MockKeyInjector) -> Harness {
    let port = free_port();
    let injector = Arc::new(injector);
    let store = Arc::new(MemorySettingsStore::new());
    let dispatcher = Arc::new(DispatchStepsUseCase::new(
        Arc::clone(&injector) as _,
        Arc::clone(&store) as Arc<dyn SettingsStore>,
        ControlSettings {
            key_hold_duration: Duration::from_millis(20),
            ..ControlSettings::default()
        },
    ));
    let listener = Arc::new(StepListener::new(
        NetworkSettings {
            port,
            buffer_size: 1024,
        },
        Arc::clone(&dispatcher),
        store,
    ));
    Harness {
        listener,
        dispatcher,
        injector,
        port,
    }
}

fn free_port() -> u16 {
    let probe = UdpSocket::bind("0.0.0.0:0").expect("probe bind");
    let port = probe.local_addr().unwrap().port();
    drop(probe);
    port
}

fn send_datagram(port: u16, payload: &[u8]) {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("sender bind");
    socket
        .send_to(payload, ("127.0.0.1", port))
        .expect("send datagram");
}

fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    predicate()
}

// ── Status push ───────────────────────────────────────────────────────────────

/// Tests that a full session pushes snapshots in lifecycle order: the first
/// is `Listening`, a step produces `ConnectedTo`, shutdown passes through
/// `Stopping`, and the last is `Disconnected`.
#[test]
fn test_status_snapshots_arrive_in_lifecycle_order() {
    let h = make_harness(MockKeyInjector::new());
    let (sink, mut rx) = ChannelStatusSink::channel(64);
    h.listener.attach_sink(sink);
    h.dispatcher.activate();

    h.listener.start().expect("start");
    send_datagram(h.port, b"STEP");
    assert!(wait_until(Duration::from_secs(2), || {
        h.injector.releases.lock().unwrap().len() == 1
    }));
    // Give the receive thread time to publish the post-dispatch snapshot
    // before shutdown snapshots join the queue.
    std::thread::sleep(Duration::from_millis(100));
    h.listener.stop();

    let mut snapshots: Vec<StatusSnapshot> = Vec::new();
    while let Ok(s) = rx.try_recv() {
        snapshots.push(s);
    }

    assert!(
        snapshots.len() >= 4,
        "expected start/step/stopping/stopped snapshots, got {}",
        snapshots.len()
    );
    assert_eq!(
        snapshots.first().unwrap().connection_status,
        ConnectionStatus::Listening
    );
    assert!(snapshots
        .iter()
        .any(|s| matches!(s.connection_status, ConnectionStatus::ConnectedTo(_))));
    assert!(snapshots
        .iter()
        .any(|s| s.connection_status == ConnectionStatus::Stopping));
    assert_eq!(
        snapshots.last().unwrap().connection_status,
        ConnectionStatus::Disconnected
    );
}

// ── UI command surface ────────────────────────────────────────────────────────

/// Tests the pipeline driven entirely through UI commands: activate, start,
/// receive a step from the "phone", observe it in `get_status`, stop.
#[tokio::test]
async fn test_commands_drive_phone_to_keypress_pipeline() {
    let h = make_harness(MockKeyInjector::new());
    let state = AppState::new(Arc::clone(&h.listener), Arc::clone(&h.dispatcher));

    let activated = activate_walking(Arc::clone(&state)).await;
    assert!(activated.success);
    let started = start_listener(Arc::clone(&state)).await;
    assert!(started.success, "start failed: {:?}", started.error);

    send_datagram(h.port, b"STEP");
    let deadline = Instant::now() + Duration::from_secs(2);
    while h.injector.releases.lock().unwrap().is_empty() && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let status = get_status(Arc::clone(&state)).await;
    let dto = status.data.expect("status data");
    assert_eq!(dto.steps_received, 1);
    assert_eq!(dto.connection_status, "Connected to 127.0.0.1");
    assert_eq!(h.injector.presses.lock().unwrap().len(), 1);

    let stopped = stop_listener(state).await;
    assert!(stopped.success);
    assert_eq!(stopped.data.unwrap().connection_status, "Disconnected");
}

// ── Safety behaviour ──────────────────────────────────────────────────────────

/// Tests that deactivating during a long continuous hold releases the key
/// right away, well before the hold would have ended on its own.
#[test]
fn test_deactivate_mid_hold_releases_key_immediately() {
    let h = make_harness(MockKeyInjector::new());
    h.dispatcher.activate();

    let dispatcher = Arc::clone(&h.dispatcher);
    let walker = std::thread::spawn(move || {
        // Half a second of continuous forward; the test interrupts it.
        let _ = dispatcher.send_continuous_forward(Duration::from_millis(500));
    });
    assert!(
        wait_until(Duration::from_millis(400), || {
            h.injector.presses.lock().unwrap().len() == 1
        }),
        "the hold must have begun"
    );

    h.dispatcher.deactivate();

    assert!(
        wait_until(Duration::from_millis(200), || {
            !h.injector.releases.lock().unwrap().is_empty()
        }),
        "deactivate must release the key before the hold ends"
    );
    assert!(!h.dispatcher.is_active());
    walker.join().expect("walker thread");
}

/// Tests that a failsafe trip (pointer in the screen corner) deactivates
/// walking without taking the listener down: further steps are still
/// counted, just not dispatched.
#[test]
fn test_failsafe_trip_deactivates_but_listener_survives() {
    let h = make_harness(MockKeyInjector {
        failsafe_on_press: true,
        ..MockKeyInjector::default()
    });
    h.dispatcher.activate();
    h.listener.start().expect("start");

    send_datagram(h.port, b"STEP");
    assert!(
        wait_until(Duration::from_secs(2), || !h.dispatcher.is_active()),
        "the failsafe must deactivate walking"
    );
    assert!(h.injector.presses.lock().unwrap().is_empty());

    send_datagram(h.port, b"STEP");
    assert!(
        wait_until(Duration::from_secs(2), || {
            h.listener.status().steps_received == 2
        }),
        "the listener must keep counting after the failsafe"
    );
    h.listener.stop();
}
