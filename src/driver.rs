//! Driver spawns and manages the dispatch task

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::error::TransportError;
use crate::router::{RouterEvent, RouterEvents, TelemetryRouter};
use crate::session::CommandGroup;
use crate::transport::LineTransport;
use crate::types::CommandRequest;
use crate::window::SnapshotSet;

/// How often the bulk-transfer watchdog runs.
const WATCHDOG_PERIOD: Duration = Duration::from_millis(500);

/// Read errors in a row before the driver stops backing off and gives up on
/// the link.
const MAX_READ_ERRORS: u32 = 10;

/// Operator input handed to the dispatch task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationRequest {
    Open,
    Close,
    Submit(CommandRequest),
    SetTeamId(u32),
    EnterGroup(CommandGroup),
    ResetMission,
}

/// Result of spawning the dispatch task
pub struct DriverChannels {
    /// Operator requests into the task
    pub requests: mpsc::UnboundedSender<StationRequest>,
    /// Router events out of the task, in order
    pub events: mpsc::UnboundedReceiver<RouterEvent>,
    /// Latest window snapshots
    pub snapshots: watch::Receiver<Arc<SnapshotSet>>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

/// What woke the dispatch loop.
enum Wake {
    Cancelled,
    Request(Option<StationRequest>),
    Line(Result<Option<String>, TransportError>),
    SimpTick,
    Watchdog,
}

/// Driver spawns and manages the dispatch task
///
/// A single task owns the router and the transport. Received lines, operator
/// requests, SIMP ticks and the watchdog are served one at a time, so the
/// router never needs locking.
pub struct Driver;

impl Driver {
    /// Spawn the dispatch task for `router` over `transport`.
    pub fn spawn<T>(transport: T, router: TelemetryRouter, simp_interval: Duration) -> DriverChannels
    where
        T: LineTransport,
    {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(router.snapshot_all()));

        let cancel = CancellationToken::new();
        let cancel_task = cancel.clone();

        tokio::spawn(async move {
            let task = DispatchTask {
                transport,
                router,
                events: event_tx,
                snapshots: snapshot_tx,
                simp_ticker: ticker(simp_interval),
                read_errors: 0,
            };
            task.run(request_rx, cancel_task).await;
        });

        DriverChannels {
            requests: request_tx,
            events: event_rx,
            snapshots: snapshot_rx,
            cancel,
        }
    }
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

struct DispatchTask<T> {
    transport: T,
    router: TelemetryRouter,
    events: mpsc::UnboundedSender<RouterEvent>,
    snapshots: watch::Sender<Arc<SnapshotSet>>,
    simp_ticker: Interval,
    read_errors: u32,
}

impl<T: LineTransport> DispatchTask<T> {
    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<StationRequest>,
        cancel: CancellationToken,
    ) {
        info!("Dispatch task started");
        let mut watchdog = ticker(WATCHDOG_PERIOD);
        let mut lines = 0u64;

        loop {
            let reading = self.router.session().is_open();
            let playing = self.router.simp_running();

            let wake = tokio::select! {
                biased;
                _ = cancel.cancelled() => Wake::Cancelled,
                request = requests.recv() => Wake::Request(request),
                line = self.transport.next_line(), if reading => Wake::Line(line),
                _ = self.simp_ticker.tick(), if playing => Wake::SimpTick,
                _ = watchdog.tick() => Wake::Watchdog,
            };

            let now = Instant::now().into_std();
            let events = match wake {
                Wake::Cancelled => {
                    info!("Dispatch task cancelled");
                    break;
                }
                Wake::Request(None) => {
                    debug!("All station handles dropped, shutting down");
                    break;
                }
                Wake::Request(Some(request)) => self.handle_request(request),
                Wake::Line(Ok(Some(line))) => {
                    lines += 1;
                    self.read_errors = 0;
                    self.router.ingest_at(&line, now)
                }
                Wake::Line(Ok(None)) => {
                    info!("Transport ended after {} lines", lines);
                    self.router.transport_error(TransportError::Disconnected)
                }
                Wake::Line(Err(e)) => self.handle_read_error(e).await,
                Wake::SimpTick => self.router.next_simp_line(),
                Wake::Watchdog => self.router.check_timeouts(now),
            };

            self.dispatch(events).await;
        }

        if self.router.session().is_open() {
            let events = self.router.close_link();
            self.dispatch(events).await;
        }
        info!("Dispatch task ended (processed {} lines)", lines);
    }

    fn handle_request(&mut self, request: StationRequest) -> RouterEvents {
        trace!(?request, "Operator request");
        match request {
            StationRequest::Open => self.router.open_link(),
            StationRequest::Close => self.router.close_link(),
            StationRequest::Submit(request) => self.router.submit(request),
            StationRequest::SetTeamId(team_id) => self.router.set_team_id(team_id),
            StationRequest::EnterGroup(group) => self.router.enter_group(group),
            StationRequest::ResetMission => self.router.reset_mission(),
        }
    }

    async fn handle_read_error(&mut self, e: TransportError) -> RouterEvents {
        if e.forces_close() {
            return self.router.transport_error(e);
        }

        // Link stays up: back off like a flaky provider
        self.read_errors += 1;
        error!("Read error ({}/{}): {}", self.read_errors, MAX_READ_ERRORS, e);
        if self.read_errors >= MAX_READ_ERRORS {
            error!("Too many read errors, closing link");
            self.read_errors = 0;
            return self.router.transport_error(TransportError::Disconnected);
        }

        // Exponential backoff: 100ms, 200ms, 400ms, ... capped at 1.6s
        let backoff = Duration::from_millis(50 * (1 << self.read_errors.min(5)));
        tokio::time::sleep(backoff).await;
        Vec::new().into()
    }

    /// Perform requested writes and forward everything else.
    async fn dispatch(&mut self, events: RouterEvents) {
        let mut queue: VecDeque<RouterEvent> = events.collect();
        let mut redraw = false;

        while let Some(event) = queue.pop_front() {
            match event {
                RouterEvent::Transmit(admitted) => {
                    let follow_up = match self.transport.send_line(&admitted.line).await {
                        Ok(()) => {
                            trace!(line = admitted.line.trim_end(), "Sent line");
                            self.router.confirm_sent(&admitted)
                        }
                        Err(e) => self.router.send_failed(&admitted, e),
                    };
                    // keep causal order: effects of this write before later events
                    for (i, event) in follow_up.enumerate() {
                        queue.insert(i, event);
                    }
                }
                event => {
                    match &event {
                        RouterEvent::SimpStarted { .. } => self.simp_ticker.reset(),
                        RouterEvent::Redraw(_) | RouterEvent::WindowsReset => redraw = true,
                        _ => {}
                    }
                    if self.events.send(event).is_err() {
                        trace!("Event receiver dropped");
                    }
                }
            }
        }

        if redraw {
            self.snapshots.send_replace(Arc::new(self.router.snapshot_all()));
        }
    }
}
