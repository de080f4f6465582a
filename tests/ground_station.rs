//! End-to-end tests of the station runtime over an in-memory link.
//!
//! Run with `cargo test --features benchmark` so the shared test utilities are
//! compiled into the library.

#![cfg(feature = "benchmark")]

use std::time::Duration;

use cansat_ground::test_utils::{
    MemorySinkFactory, SAMPLE_TELEMETRY, ScriptedTransport, TransportControl, telemetry_line,
    write_simp_fixture,
};
use cansat_ground::{
    CameraId, CameraState, Command, ConnectionState, GroundStation, RouterEvent, StationConfig,
    UpdateRate, WindowId,
};
use futures::{Stream, StreamExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Harness {
    station: GroundStation,
    events: std::pin::Pin<Box<dyn Stream<Item = RouterEvent> + Send>>,
    control: TransportControl,
    sinks: MemorySinkFactory,
}

fn harness(config: StationConfig) -> Harness {
    init_tracing();
    let (transport, control) = ScriptedTransport::new();
    let sinks = MemorySinkFactory::default();
    let mut station = GroundStation::with_sinks(transport, config, Box::new(sinks.clone()));
    let events = station.take_events().expect("first subscriber").boxed();
    Harness { station, events, control, sinks }
}

fn small_config() -> StationConfig {
    StationConfig { window_capacity: 16, ..StationConfig::default() }
}

impl Harness {
    /// Collect events until one matches, returning everything seen.
    async fn until<F>(&mut self, mut done: F) -> Vec<RouterEvent>
    where
        F: FnMut(&RouterEvent) -> bool,
    {
        let mut seen = Vec::new();
        tokio::time::timeout(Duration::from_secs(30), async {
            while let Some(event) = self.events.next().await {
                let stop = done(&event);
                seen.push(event);
                if stop {
                    return;
                }
            }
            panic!("event stream ended early: {seen:?}");
        })
        .await
        .expect("timed out waiting for event");
        seen
    }

    async fn open(&mut self) {
        self.station.open_link().expect("station running");
        self.until(|e| *e == RouterEvent::Connection(ConnectionState::Open)).await;
    }
}

fn frame_count(events: &[RouterEvent]) -> usize {
    events.iter().filter(|e| matches!(e, RouterEvent::Frame(_))).count()
}

#[tokio::test]
async fn commands_on_a_closed_link_are_rejected_once() {
    let mut h = harness(small_config());

    h.station.submit(Command::ProbeRelease).unwrap();
    h.station.submit(Command::Ping).unwrap();
    h.station.set_team_id(3114).unwrap();
    h.station.reset_mission().unwrap();

    let events = h.until(|e| *e == RouterEvent::MissionReset).await;
    let errors: Vec<_> = events.iter().filter(|e| e.is_error()).collect();
    assert_eq!(errors.len(), 2, "one rejection per request: {events:?}");
    assert!(h.control.sent().is_empty());
}

#[tokio::test]
async fn telemetry_updates_windows_and_cameras() {
    let mut h = harness(small_config());
    h.open().await;

    h.control.push_line(SAMPLE_TELEMETRY);
    let events = h.until(|e| matches!(e, RouterEvent::Frame(_))).await;

    for camera in CameraId::ALL {
        assert!(
            events.contains(&RouterEvent::CameraStatus { camera, state: CameraState::On }),
            "{camera:?} should be on"
        );
    }
    assert!(events.contains(&RouterEvent::Redraw(WindowId::Altitude)));

    let snapshot = h.station.current_snapshot();
    let altitude = snapshot.get(WindowId::Altitude);
    assert_eq!(altitude.x.len(), 16);
    assert_eq!(altitude.y[0].last(), Some(&1234.5));
}

#[tokio::test]
async fn log_transfer_bypasses_the_codec() {
    let mut h = harness(small_config());
    h.open().await;

    h.control.push_line("$LOGFILE:BEGIN");
    h.control.push_line(telemetry_line(1, 10.0));
    h.control.push_line(telemetry_line(2, 20.0));
    h.control.push_line("$MSG:{F|DESCENT} stored message");
    h.control.push_line("$LOGFILE:END");

    let events = h.until(|e| matches!(e, RouterEvent::TransferComplete { .. })).await;
    assert_eq!(frame_count(&events), 0);
    assert!(events.contains(&RouterEvent::TransferComplete { lines: 5 }));
    assert_eq!(h.sinks.lines().len(), 5);
    assert!(h.sinks.closed());

    // Back to normal decoding afterwards
    h.control.push_line(SAMPLE_TELEMETRY);
    let events = h.until(|e| matches!(e, RouterEvent::Frame(_))).await;
    assert_eq!(frame_count(&events), 1);
}

#[tokio::test]
async fn write_failure_closes_the_link() {
    let mut h = harness(small_config());
    h.open().await;

    h.control.fail_writes(true);
    h.station.submit(Command::Ping).unwrap();
    let events = h.until(|e| *e == RouterEvent::Connection(ConnectionState::Closed)).await;
    assert!(events.iter().any(RouterEvent::is_error));

    // Closed link: the next command never reaches the transport
    h.control.fail_writes(false);
    h.station.submit(Command::Ping).unwrap();
    h.until(|e| matches!(e, RouterEvent::Rejected(_))).await;
    assert!(h.control.sent().is_empty());
}

#[tokio::test]
async fn device_disappearing_closes_the_link() {
    let mut h = harness(small_config());
    h.open().await;

    h.control.disconnect();
    h.until(|e| *e == RouterEvent::Connection(ConnectionState::Closed)).await;
}

#[tokio::test(start_paused = true)]
async fn simp_script_is_paced_by_the_interval() {
    let script = write_simp_fixture("integration_simp", &["101325", "101300", "101250"]);
    let config = StationConfig {
        simp_script: script.clone(),
        simp_interval_ms: 1000,
        ..small_config()
    };
    let mut h = harness(config);
    h.open().await;

    let start = tokio::time::Instant::now();
    h.control.push_line("$MSG:{SIM|LAUNCH_PAD} BEGIN_SIMP");
    h.until(|e| matches!(e, RouterEvent::SimpStarted { lines: 3 })).await;

    let events = h.until(|e| matches!(e, RouterEvent::SimpFinished { .. })).await;
    assert!(events.contains(&RouterEvent::SimpFinished { sent: 3 }));
    assert!(start.elapsed() >= Duration::from_secs(3));
    info!(elapsed = ?start.elapsed(), "SIMP playback complete");

    assert_eq!(
        h.control.sent(),
        vec!["CMD,3114,SIMP,101325\n", "CMD,3114,SIMP,101300\n", "CMD,3114,SIMP,101250\n"]
    );
    let _ = std::fs::remove_file(script);
}

#[tokio::test(start_paused = true)]
async fn stalled_transfer_is_aborted_by_the_watchdog() {
    let config = StationConfig { bulk_timeout_ms: 2_000, ..small_config() };
    let mut h = harness(config);
    h.open().await;

    h.control.push_line("$LOGFILE:BEGIN");
    h.control.push_line("partial");
    let events = h.until(|e| matches!(e, RouterEvent::TransferAborted { .. })).await;
    assert!(events.contains(&RouterEvent::TransferAborted { lines: 2 }));
    assert!(h.sinks.closed());
}

#[tokio::test(start_paused = true)]
async fn snapshot_stream_coalesces_bursts() {
    let mut h = harness(small_config());
    let mut snapshots = h.station.snapshots_at(UpdateRate::Max(10));

    let first = snapshots.next().await.expect("initial snapshot");
    assert_eq!(first.get(WindowId::Altitude).y[0].last(), Some(&0.0));

    h.open().await;
    for packet in 1..=5 {
        h.control.push_line(telemetry_line(packet, packet as f64 * 100.0));
    }
    h.until(|e| matches!(e, RouterEvent::PacketCounts(c) if c.recv == 5)).await;

    let latest = snapshots.next().await.expect("throttled snapshot");
    assert_eq!(latest.get(WindowId::Altitude).y[0].last(), Some(&500.0));
}
