//! Newline-delimited framing over tokio async I/O.
//!
//! Outgoing messages go through a dedicated writer task fed by a bounded
//! mpsc channel, so handlers can send from synchronous code without holding
//! a lock on the stream:
//!
//! ```text
//! Peer ─┐
//! Peer ─┼─► LineWriterHandle (mpsc) ─► writer task ─► AsyncWrite
//! Peer ─┘
//! ```
//!
//! Inbound lines are read by [`read_lines`] and fed to
//! [`Peer::handle_message`] one at a time. A line that fails to decode, or
//! whose handler returns an error, is logged and skipped; the loop only
//! ends on EOF, an I/O error or an over-long line.
//!
//! # Example
//!
//! ```ignore
//! use kindwire::transport::{read_lines, spawn_line_writer, LineTransportConfig};
//!
//! let (read_half, write_half) = stream.into_split();
//! let config = LineTransportConfig::default();
//! let (writer, _task) = spawn_line_writer(write_half, &config);
//!
//! let pending = server.send_request(&writer, request)?;
//! read_lines(BufReader::new(read_half), &server, &meta, &config).await?;
//! ```

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::Transport;
use crate::error::{KindwireError, Result};
use crate::peer::{Peer, PeerRole};

/// Default capacity of the outgoing line queue.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Default maximum inbound line length (16 MiB).
pub const DEFAULT_MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

/// Maximum lines written before a flush.
const MAX_BATCH_SIZE: usize = 64;

/// Configuration for line-delimited transports.
#[derive(Debug, Clone)]
pub struct LineTransportConfig {
    /// Capacity of the outgoing line queue.
    pub channel_capacity: usize,
    /// Longest inbound line accepted, excluding the terminator.
    pub max_line_length: usize,
}

impl Default for LineTransportConfig {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Handle for queueing lines to the writer task.
///
/// Cheaply cloneable. Sending never waits: a full queue fails with
/// [`KindwireError::ChannelFull`], a stopped writer with
/// [`KindwireError::ConnectionClosed`].
#[derive(Debug, Clone)]
pub struct LineWriterHandle {
    tx: mpsc::Sender<String>,
}

impl LineWriterHandle {
    /// Whether the writer task has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Transport for LineWriterHandle {
    fn send(&self, data: String) -> Result<()> {
        if data.contains('\n') {
            return Err(KindwireError::Transport(
                "encoded message contains a newline".to_string(),
            ));
        }

        self.tx.try_send(data).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => KindwireError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => KindwireError::ConnectionClosed,
        })
    }
}

/// Spawn the writer task and return a handle for queueing lines.
///
/// The task ends with `Ok(())` once every handle is dropped, or with the
/// first I/O error.
pub fn spawn_line_writer<W>(
    writer: W,
    config: &LineTransportConfig,
) -> (LineWriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(config.channel_capacity);
    let task = tokio::spawn(writer_loop(rx, writer));
    (LineWriterHandle { tx }, task)
}

/// Spawn the writer task with default configuration.
pub fn spawn_line_writer_default<W>(writer: W) -> (LineWriterHandle, JoinHandle<Result<()>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    spawn_line_writer(writer, &LineTransportConfig::default())
}

async fn writer_loop<W>(mut rx: mpsc::Receiver<String>, mut writer: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(first) = rx.recv().await {
        write_line(&mut writer, &first).await?;

        // Drain whatever else is ready before flushing.
        let mut written = 1;
        while written < MAX_BATCH_SIZE {
            match rx.try_recv() {
                Ok(line) => {
                    write_line(&mut writer, &line).await?;
                    written += 1;
                }
                Err(_) => break,
            }
        }

        writer.flush().await?;
    }

    writer.shutdown().await?;
    Ok(())
}

async fn write_line<W>(writer: &mut W, line: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    Ok(())
}

/// Read newline-delimited messages and feed them to `peer`.
///
/// Returns `Ok(())` at EOF. Blank lines are ignored; a trailing `\r` is
/// stripped.
///
/// # Errors
///
/// - [`KindwireError::Io`] if reading fails.
/// - [`KindwireError::LineTooLong`] if a line exceeds `config.max_line_length`.
pub async fn read_lines<Rd, R, M>(
    mut reader: Rd,
    peer: &Peer<R, M>,
    meta: &M,
    config: &LineTransportConfig,
) -> Result<()>
where
    Rd: AsyncBufRead + Unpin,
    R: PeerRole,
{
    let limit = config.max_line_length;
    let mut buf = Vec::new();

    // Room for the line plus a `\r\n` terminator.
    let cap = (limit as u64).saturating_add(2);

    loop {
        buf.clear();
        let n = (&mut reader).take(cap).read_until(b'\n', &mut buf).await?;
        if n == 0 {
            return Ok(());
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        if buf.len() > limit {
            return Err(KindwireError::LineTooLong(limit));
        }

        if buf.is_empty() {
            continue;
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Dropping inbound line that is not UTF-8: {}", e);
                continue;
            }
        };

        if let Err(e) = peer.handle_message(meta, line) {
            tracing::error!("Dropping inbound message: {}", e);
        }
    }
}
