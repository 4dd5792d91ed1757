//! Transport module - the outgoing side of a connection.
//!
//! A peer never reads from a transport; it only calls [`Transport::send`]
//! with each encoded message. Inbound data is pushed into the peer by
//! whoever owns the connection, via [`Peer::handle_message`](crate::Peer::handle_message).
//!
//! Provided implementations:
//! - any `Fn(String) -> Result<()>` closure (loopbacks, tests)
//! - `tokio::sync::mpsc::UnboundedSender<String>` (hand off to another task)
//! - [`LineWriterHandle`] - newline-delimited framing over an async writer

mod lines;

pub use lines::{
    read_lines, spawn_line_writer, spawn_line_writer_default, LineTransportConfig,
    LineWriterHandle, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_LINE_LENGTH,
};

use tokio::sync::mpsc;

use crate::error::{KindwireError, Result};

/// Anything that can carry an encoded message to the remote peer.
pub trait Transport {
    /// Send one encoded message.
    fn send(&self, data: String) -> Result<()>;
}

impl<F> Transport for F
where
    F: Fn(String) -> Result<()>,
{
    #[inline]
    fn send(&self, data: String) -> Result<()> {
        self(data)
    }
}

impl Transport for mpsc::UnboundedSender<String> {
    fn send(&self, data: String) -> Result<()> {
        mpsc::UnboundedSender::send(self, data).map_err(|_| KindwireError::ConnectionClosed)
    }
}
