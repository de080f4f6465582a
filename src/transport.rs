//! Duplex line transport

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::TransportError;

/// Line-oriented link to the payload.
///
/// The physical serial port lives outside this crate; anything that can
/// deliver newline-delimited lines and write them back implements this.
#[async_trait::async_trait]
pub trait LineTransport: Send + 'static {
    /// Wait for the next received line, without its terminator.
    ///
    /// Returns:
    /// - `Ok(Some(line))` - A line arrived
    /// - `Ok(None)` - The device went away (end of stream)
    /// - `Err(e)` - Read failure
    ///
    /// Must be cancel safe. The driver drops a pending call whenever a tick
    /// or request wins the race, and a later call must not lose bytes.
    async fn next_line(&mut self) -> Result<Option<String>, TransportError>;

    /// Write one already-terminated line.
    async fn send_line(&mut self, line: &str) -> Result<(), TransportError>;
}

/// [`LineTransport`] over any tokio reader/writer pair.
///
/// Bytes that are not valid UTF-8 are replaced rather than failing the read;
/// radio noise routinely produces them.
#[derive(Debug)]
pub struct LineStream<R, W> {
    reader: R,
    writer: W,
    buf: Vec<u8>,
}

impl<R, W> LineStream<R, W>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer, buf: Vec::with_capacity(256) }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

#[async_trait::async_trait]
impl<R, W> LineTransport for LineStream<R, W>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Cancel safe: bytes of a partly received line stay buffered and the
    /// next call carries on from them.
    async fn next_line(&mut self) -> Result<Option<String>, TransportError> {
        let read = match self.reader.read_until(b'\n', &mut self.buf).await {
            Ok(read) => read,
            Err(source) => {
                self.buf.clear();
                return Err(TransportError::ReadFailed { source });
            }
        };
        if read == 0 && self.buf.is_empty() {
            return Ok(None);
        }

        while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
            self.buf.pop();
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        trace!(bytes = self.buf.len(), "Read line");
        self.buf.clear();
        Ok(Some(line))
    }

    async fn send_line(&mut self, line: &str) -> Result<(), TransportError> {
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|source| TransportError::WriteFailed { source })?;
        self.writer.flush().await.map_err(|source| TransportError::WriteFailed { source })
    }
}
