//! Bulk log transfer sub-protocol.
//!
//! After `$LOGFILE:BEGIN` the payload streams its stored log over the
//! telemetry link. Until a line containing `$LOGFILE:END` arrives, every line
//! is written verbatim to a [`LogSink`] and nothing reaches the codec.
//!
//! The transfer has a watchdog: if no line arrives for the configured idle
//! timeout the sink is closed and the session goes back to idle.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::codec::LOG_END_SENTINEL;
use crate::error::ProtocolError;

/// Destination of a bulk transfer.
pub trait LogSink: Send {
    /// Write one line followed by a newline.
    fn write_line(&mut self, line: &str) -> io::Result<()>;

    /// Flush and release the sink.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Opens a fresh sink for each transfer.
pub trait SinkFactory: Send {
    fn open(&mut self) -> io::Result<Box<dyn LogSink>>;
}

/// Writes transfers to a file, truncating it at the start of each transfer.
#[derive(Debug, Clone)]
pub struct FileSinkFactory {
    path: PathBuf,
}

impl FileSinkFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SinkFactory for FileSinkFactory {
    fn open(&mut self) -> io::Result<Box<dyn LogSink>> {
        debug!("Opening log sink {}", self.path.display());
        let file = File::create(&self.path)?;
        Ok(Box::new(FileSink { writer: BufWriter::new(file) }))
    }
}

struct FileSink {
    writer: BufWriter<File>,
}

impl LogSink for FileSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")
    }

    fn close(mut self: Box<Self>) -> io::Result<()> {
        self.writer.flush()
    }
}

/// What happened to a line handed to an active transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkProgress {
    /// Line stored, transfer continues.
    Stored { lines: u64 },
    /// End sentinel stored and sink closed.
    Completed { lines: u64 },
}

/// `Idle -> Collecting -> Idle` state machine around a sink.
pub struct BulkTransferSession {
    factory: Box<dyn SinkFactory>,
    sink: Option<Box<dyn LogSink>>,
    lines: u64,
    last_line: Option<Instant>,
    idle_timeout: Duration,
}

impl BulkTransferSession {
    pub fn new(factory: Box<dyn SinkFactory>, idle_timeout: Duration) -> Self {
        Self { factory, sink: None, lines: 0, last_line: None, idle_timeout }
    }

    pub fn is_active(&self) -> bool {
        self.sink.is_some()
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Open a sink and store the begin line.
    ///
    /// A begin line while already collecting is stored like any other line.
    pub fn begin(&mut self, line: &str, now: Instant) -> Result<BulkProgress, ProtocolError> {
        if self.is_active() {
            warn!("Log transfer begin received while already collecting");
            return self.accept(line, now);
        }

        let sink = self
            .factory
            .open()
            .map_err(|source| ProtocolError::SinkFailed { lines: 0, source })?;
        info!("Log transfer started");
        self.sink = Some(sink);
        self.lines = 0;
        self.accept(line, now)
    }

    /// Store one line. The end sentinel anywhere in the line finishes the
    /// transfer after the line itself has been written.
    pub fn accept(&mut self, line: &str, now: Instant) -> Result<BulkProgress, ProtocolError> {
        let Some(sink) = self.sink.as_mut() else {
            return Err(ProtocolError::UnexpectedBulkEnd);
        };

        if let Err(source) = sink.write_line(line) {
            let lines = self.lines;
            self.abort();
            return Err(ProtocolError::SinkFailed { lines, source });
        }
        self.lines += 1;
        self.last_line = Some(now);
        trace!(lines = self.lines, "Stored log line");

        if !line.contains(LOG_END_SENTINEL) {
            return Ok(BulkProgress::Stored { lines: self.lines });
        }

        let lines = self.lines;
        let closed = self.sink.take().map(|sink| sink.close()).unwrap_or(Ok(()));
        self.last_line = None;
        match closed {
            Ok(()) => {
                info!("Log transfer complete ({} lines)", lines);
                Ok(BulkProgress::Completed { lines })
            }
            Err(source) => Err(ProtocolError::SinkFailed { lines, source }),
        }
    }

    /// Abort the transfer if it has been idle for longer than the timeout.
    pub fn check_timeout(&mut self, now: Instant) -> Option<ProtocolError> {
        let last = self.last_line?;
        let idle = now.saturating_duration_since(last);
        if !self.is_active() || idle < self.idle_timeout {
            return None;
        }
        let lines = self.abort();
        warn!("Log transfer timed out after {:?} idle ({} lines)", idle, lines);
        Some(ProtocolError::BulkTimeout { idle, lines })
    }

    /// Close the sink without waiting for the end sentinel. Returns the
    /// number of lines stored. No-op when idle.
    pub fn abort(&mut self) -> u64 {
        if let Some(sink) = self.sink.take() {
            if let Err(e) = sink.close() {
                warn!("Failed to close aborted log sink: {}", e);
            }
            debug!("Log transfer aborted after {} lines", self.lines);
        }
        self.last_line = None;
        self.lines
    }
}

impl std::fmt::Debug for BulkTransferSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkTransferSession")
            .field("active", &self.is_active())
            .field("lines", &self.lines)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}
