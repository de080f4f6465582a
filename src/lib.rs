//! Telemetry and command core for a CanSat ground station.
//!
//! The station talks to the payload over a line-oriented radio link. Received
//! lines are decoded into telemetry frames or control messages, fed into
//! fixed-capacity plot windows and persisted as fixed-width records; operator
//! commands are gated by the session state before they reach the wire.
//!
//! # Features
//!
//! - **Codec**: Tolerant decoding of 26-field telemetry and `$`-control lines
//! - **Sessions**: Connection, transmission and mode gating of every command
//! - **Bulk transfer**: Payload log retrieval with an idle watchdog
//! - **SIMP playback**: Paced replay of simulated pressure scripts
//! - **Streams**: Router events and throttled window snapshots over tokio
//!
//! The GUI, the serial port itself and the record database are collaborators
//! outside this crate. They plug in through [`LineTransport`], [`SinkFactory`]
//! and the event stream.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cansat_ground::{Command, GroundStation, LineStream, RouterEvent, StationConfig};
//! use futures::StreamExt;
//! use tokio::io::BufReader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = StationConfig::load("station.yaml")?;
//!     let (reader, writer) = tokio::io::duplex(4096);
//!     let transport = LineStream::new(BufReader::new(reader), writer);
//!
//!     let mut station = GroundStation::start(transport, config);
//!     let mut events = station.take_events().expect("first subscriber");
//!
//!     station.open_link()?;
//!     station.submit(Command::Ping)?;
//!
//!     while let Some(event) = events.next().await {
//!         if let RouterEvent::Log { text, severity } = event {
//!             println!("[{severity:?}] {text}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod codec;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;
pub mod window;

// Session state and sub-protocols
pub mod bulk;
pub mod config;
pub mod router;
pub mod session;

// Stream-based runtime
pub mod connection;
pub mod driver;
pub mod stream;
pub mod transport;

pub use error::*;
pub use types::*;

pub use bulk::{FileSinkFactory, LogSink, SinkFactory};
pub use codec::{Decoded, FrameCodec};
pub use config::StationConfig;
pub use connection::GroundStation;
pub use router::{RouterEvent, RouterEvents, TelemetryRouter};
pub use session::{CommandGroup, ConnectionState, SessionState};
pub use transport::{LineStream, LineTransport};
pub use window::{SnapshotSet, WindowId, WindowSnapshot};
