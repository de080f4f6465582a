//! Ground station handle

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::{UnboundedReceiverStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::bulk::{FileSinkFactory, SinkFactory};
use crate::config::StationConfig;
use crate::driver::{Driver, StationRequest};
use crate::error::{GroundStationError, Result};
use crate::router::{RouterEvent, TelemetryRouter};
use crate::session::CommandGroup;
use crate::stream::ThrottleExt;
use crate::transport::LineTransport;
use crate::types::{CommandRequest, UpdateRate};
use crate::window::SnapshotSet;

/// Handle to a running ground station.
///
/// Owns nothing but channels: the router and transport live in the dispatch
/// task. Dropping the handle stops the task.
pub struct GroundStation {
    requests: mpsc::UnboundedSender<StationRequest>,
    events: Option<mpsc::UnboundedReceiver<RouterEvent>>,
    snapshots: watch::Receiver<Arc<SnapshotSet>>,
    snapshot_rate: UpdateRate,
    cancel: CancellationToken,
}

impl GroundStation {
    /// Start a station that writes retrieved logs to `config.bulk_log_path`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<T>(transport: T, config: StationConfig) -> Self
    where
        T: LineTransport,
    {
        let sinks = FileSinkFactory::new(config.bulk_log_path.clone());
        Self::with_sinks(transport, config, Box::new(sinks))
    }

    /// Start a station with a custom log sink.
    pub fn with_sinks<T>(transport: T, config: StationConfig, sinks: Box<dyn SinkFactory>) -> Self
    where
        T: LineTransport,
    {
        info!(team_id = config.team_id, "Starting ground station");
        let router = TelemetryRouter::new(&config, sinks);
        let channels = Driver::spawn(transport, router, config.simp_interval());

        Self {
            requests: channels.requests,
            events: Some(channels.events),
            snapshots: channels.snapshots,
            snapshot_rate: config.snapshot_rate,
            cancel: channels.cancel,
        }
    }

    fn request(&self, request: StationRequest) -> Result<()> {
        self.requests.send(request).map_err(|_| GroundStationError::Shutdown)
    }

    pub fn open_link(&self) -> Result<()> {
        self.request(StationRequest::Open)
    }

    pub fn close_link(&self) -> Result<()> {
        self.request(StationRequest::Close)
    }

    /// Queue a command. Admission happens in the dispatch task; a refusal
    /// shows up as [`RouterEvent::Rejected`].
    pub fn submit(&self, request: impl Into<CommandRequest>) -> Result<()> {
        self.request(StationRequest::Submit(request.into()))
    }

    pub fn set_team_id(&self, team_id: u32) -> Result<()> {
        self.request(StationRequest::SetTeamId(team_id))
    }

    pub fn enter_group(&self, group: CommandGroup) -> Result<()> {
        self.request(StationRequest::EnterGroup(group))
    }

    pub fn reset_mission(&self) -> Result<()> {
        self.request(StationRequest::ResetMission)
    }

    /// Take the event stream. There is one consumer; later calls return
    /// `None`.
    pub fn take_events(&mut self) -> Option<impl Stream<Item = RouterEvent> + 'static> {
        self.events.take().map(UnboundedReceiverStream::new)
    }

    /// Window snapshots at the configured rate.
    pub fn snapshots(&self) -> impl Stream<Item = Arc<SnapshotSet>> + 'static {
        self.snapshots_at(self.snapshot_rate)
    }

    /// Window snapshots at most `rate` times per second.
    ///
    /// Yields the current snapshot immediately, then every published change.
    pub fn snapshots_at(&self, rate: UpdateRate) -> impl Stream<Item = Arc<SnapshotSet>> + 'static {
        let snapshots = WatchStream::new(self.snapshots.clone());

        match rate.throttle_interval() {
            None => snapshots.boxed(),
            Some(interval) => snapshots.throttle(interval).boxed(),
        }
    }

    pub fn current_snapshot(&self) -> Arc<SnapshotSet> {
        self.snapshots.borrow().clone()
    }

    /// Stop the dispatch task. The link is closed on the way out.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for GroundStation {
    fn drop(&mut self) {
        debug!("Dropping ground station");
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ConnectionState;
    use crate::test_utils::{MemorySinkFactory, SAMPLE_TELEMETRY, ScriptedTransport};
    use crate::types::{Command, Severity};
    use crate::window::WindowId;
    use std::time::Duration;

    fn station(transport: ScriptedTransport) -> GroundStation {
        let config = StationConfig { window_capacity: 4, ..StationConfig::default() };
        GroundStation::with_sinks(transport, config, Box::new(MemorySinkFactory::default()))
    }

    async fn next_matching<S, F>(events: &mut S, mut predicate: F) -> RouterEvent
    where
        S: Stream<Item = RouterEvent> + Unpin,
        F: FnMut(&RouterEvent) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = events.next().await.expect("event stream ended");
                if predicate(&event) {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    #[tokio::test]
    async fn lines_flow_once_the_link_is_open() {
        let (transport, control) = ScriptedTransport::new();
        let mut station = station(transport);
        let mut events = station.take_events().expect("events").boxed();
        assert!(station.take_events().is_none());

        station.open_link().unwrap();
        control.push_line(SAMPLE_TELEMETRY);

        let event = next_matching(&mut events, |e| matches!(e, RouterEvent::Frame(_))).await;
        let RouterEvent::Frame(frame) = event else { unreachable!() };
        assert_eq!(frame.packet_recv, 1);

        let snapshot = station.current_snapshot();
        assert_eq!(snapshot.get(WindowId::Altitude).y[0].last(), Some(&1234.5));
    }

    #[tokio::test]
    async fn admitted_commands_reach_the_wire() {
        let (transport, control) = ScriptedTransport::new();
        let mut station = station(transport);
        let mut events = station.take_events().expect("events").boxed();

        station.submit(Command::Ping).unwrap();
        let rejected = next_matching(&mut events, RouterEvent::is_error).await;
        assert!(matches!(rejected, RouterEvent::Rejected(_)));
        assert!(control.sent().is_empty());

        station.open_link().unwrap();
        station.submit(Command::Ping).unwrap();
        next_matching(&mut events, |e| {
            matches!(e, RouterEvent::Log { severity: Severity::Info, text } if text.starts_with("Sent"))
        })
        .await;
        assert_eq!(control.sent(), vec!["CMD,3114,TEST,X\n".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn line_split_across_a_watchdog_tick_arrives_whole() {
        use crate::transport::LineStream;
        use tokio::io::{AsyncWriteExt, BufReader};

        let (mut radio, ground) = tokio::io::duplex(1024);
        let (reader, writer) = tokio::io::split(ground);
        let transport = LineStream::new(BufReader::new(reader), writer);
        let config = StationConfig { window_capacity: 4, ..StationConfig::default() };
        let mut station =
            GroundStation::with_sinks(transport, config, Box::new(MemorySinkFactory::default()));
        let mut events = station.take_events().expect("events").boxed();

        station.open_link().unwrap();
        next_matching(&mut events, |e| matches!(e, RouterEvent::Connection(_))).await;

        radio.write_all(b"3114,00:12:45,").await.unwrap();
        // long enough for the watchdog to interrupt the pending read
        tokio::time::sleep(Duration::from_millis(700)).await;
        radio.write_all(b"12,F,DESCENT,1234.5\n").await.unwrap();

        let event = next_matching(&mut events, |e| matches!(e, RouterEvent::Frame(_))).await;
        let RouterEvent::Frame(frame) = event else { unreachable!() };
        assert_eq!(frame.team_id, 3114);
        assert_eq!(frame.mission_time.as_deref(), Some("00:12:45"));
        assert_eq!(frame.altitude, Some(1234.5));
        assert_eq!(frame.packet_recv, 1);
    }

    #[tokio::test]
    async fn shutdown_reports_the_final_close() {
        let (transport, control) = ScriptedTransport::new();
        let mut station = station(transport);
        let mut events = station.take_events().expect("events").boxed();

        station.open_link().unwrap();
        control.push_line("$LOGFILE:BEGIN");
        next_matching(&mut events, |e| *e == RouterEvent::TransferStarted).await;

        station.shutdown();
        let rest: Vec<_> = tokio::time::timeout(Duration::from_secs(5), events.collect())
            .await
            .expect("event stream ends after shutdown");
        assert!(rest.contains(&RouterEvent::TransferAborted { lines: 1 }));
        assert!(rest.contains(&RouterEvent::Connection(ConnectionState::Closed)));
    }

    #[tokio::test]
    async fn shutdown_of_a_closed_link_is_quiet() {
        let (transport, _control) = ScriptedTransport::new();
        let mut station = station(transport);
        let events = station.take_events().expect("events");

        station.shutdown();
        let rest: Vec<_> = tokio::time::timeout(Duration::from_secs(5), events.collect())
            .await
            .expect("event stream ends after shutdown");
        assert!(rest.is_empty(), "unexpected events: {rest:?}");
    }

    #[tokio::test]
    async fn dropping_the_handle_stops_the_task() {
        let (transport, control) = ScriptedTransport::new();
        let station = station(transport);
        station.open_link().unwrap();
        drop(station);

        tokio::time::timeout(Duration::from_secs(5), control.closed())
            .await
            .expect("transport released");
    }
}
