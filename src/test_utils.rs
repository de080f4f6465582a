//! Test utilities shared by unit tests, integration tests and benchmarks
//!
//! In-memory stand-ins for the things the station talks to: the radio link,
//! the bulk log file and the SIMP script on disk.

#![cfg(any(test, feature = "benchmark"))]

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::bulk::{LogSink, SinkFactory};
use crate::error::TransportError;
use crate::transport::LineTransport;

/// A complete 26-field telemetry line in flight mode.
pub const SAMPLE_TELEMETRY: &str = "3114,00:12:45,12,F,DESCENT,1234.5,22.1,101.3,5.01,1,2,3,10,20,30,0.1,0.2,0.3,15,12:00:00,1200.0,38.15,-79.07,7,NONE,3";

/// Telemetry line with the given packet count and altitude, otherwise like
/// [`SAMPLE_TELEMETRY`].
pub fn telemetry_line(packet: u64, altitude: f64) -> String {
    format!(
        "3114,00:12:45,{packet},F,DESCENT,{altitude:.1},22.1,101.3,5.01,1,2,3,10,20,30,0.1,0.2,0.3,15,12:00:00,1200.0,38.15,-79.07,7,NONE,3"
    )
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct MemoryLog {
    lines: Mutex<Vec<String>>,
    closed: AtomicBool,
}

/// Sink factory that keeps the last transfer in memory.
///
/// Clones share storage, so a test can hand one clone to the router and
/// inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySinkFactory {
    log: Arc<MemoryLog>,
}

impl MemorySinkFactory {
    /// Lines written by the most recent transfer.
    pub fn lines(&self) -> Vec<String> {
        lock(&self.log.lines).clone()
    }

    /// Whether the most recent sink was closed.
    pub fn closed(&self) -> bool {
        self.log.closed.load(Ordering::SeqCst)
    }
}

impl SinkFactory for MemorySinkFactory {
    fn open(&mut self) -> io::Result<Box<dyn LogSink>> {
        lock(&self.log.lines).clear();
        self.log.closed.store(false, Ordering::SeqCst);
        Ok(Box::new(MemoryLogSink { log: Arc::clone(&self.log) }))
    }
}

struct MemoryLogSink {
    log: Arc<MemoryLog>,
}

impl LogSink for MemoryLogSink {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        lock(&self.log.lines).push(line.to_string());
        Ok(())
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        self.log.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Sink factory whose sinks can never be opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingSinkFactory;

impl SinkFactory for FailingSinkFactory {
    fn open(&mut self) -> io::Result<Box<dyn LogSink>> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "log file is read-only"))
    }
}

/// Write a SIMP script fixture to the temp directory and return its path.
///
/// Each call gets its own file so parallel tests do not trample each other.
pub fn write_simp_fixture(name: &str, payloads: &[&str]) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!("cansat_{}_{}_{}.txt", name, std::process::id(), n));

    let mut contents = String::from("# simulated pressure profile\n");
    for payload in payloads {
        contents.push_str("CMD,$,SIMP,");
        contents.push_str(payload);
        contents.push('\n');
    }
    std::fs::write(&path, contents).expect("write SIMP fixture");
    path
}

/// In-memory [`LineTransport`] driven from a [`TransportControl`].
#[derive(Debug)]
pub struct ScriptedTransport {
    incoming: mpsc::UnboundedReceiver<Option<String>>,
    sent: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<AtomicBool>,
}

/// Test side of a [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct TransportControl {
    incoming: mpsc::UnboundedSender<Option<String>>,
    sent: Arc<Mutex<Vec<String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl ScriptedTransport {
    pub fn new() -> (Self, TransportControl) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let fail_writes = Arc::new(AtomicBool::new(false));
        let transport = Self {
            incoming: rx,
            sent: Arc::clone(&sent),
            fail_writes: Arc::clone(&fail_writes),
        };
        let control = TransportControl { incoming: tx, sent, fail_writes };
        (transport, control)
    }
}

#[async_trait::async_trait]
impl LineTransport for ScriptedTransport {
    async fn next_line(&mut self) -> Result<Option<String>, TransportError> {
        // A dropped control reads as the device going away
        Ok(self.incoming.recv().await.flatten())
    }

    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::WriteFailed {
                source: io::Error::new(io::ErrorKind::BrokenPipe, "radio unplugged"),
            });
        }
        lock(&self.sent).push(line.to_string());
        Ok(())
    }
}

impl TransportControl {
    /// Deliver one received line.
    pub fn push_line(&self, line: impl Into<String>) {
        let _ = self.incoming.send(Some(line.into()));
    }

    /// Simulate the device disappearing.
    pub fn disconnect(&self) {
        let _ = self.incoming.send(None);
    }

    /// Make every following write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Lines written so far, terminators included.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }

    /// Resolves once the transport has been dropped.
    pub async fn closed(&self) {
        self.incoming.closed().await;
    }
}
