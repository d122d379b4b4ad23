//! The transport seam (C1): every byte-level I/O operation the connection
//! engine needs, abstracted behind a trait so a TLS transport can drop in
//! without touching the handshake or frame engine.

pub mod tcp;

use std::io::{self, IoSlice};
use std::net::SocketAddr;
use std::time::Duration;

pub use tcp::TcpTransport;

/// A blocking, synchronous byte-stream transport.
///
/// Implementations are not required to be `Send`/`Sync`; a `Connection`
/// owns exactly one transport and is used from a single thread at a time.
pub trait Transport {
    /// Read at least one byte into `buf`, blocking per the current read
    /// timeout. `Ok(0)` means the peer closed the connection.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all of `buf`, blocking until the whole buffer is sent or an
    /// error occurs.
    fn send(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Write all of `bufs` as a single gathered write, blocking until every
    /// byte across all slices is sent. A short underlying write is retried
    /// internally against the remaining slices rather than surfaced to the
    /// caller as partial progress.
    fn writev(&mut self, bufs: &[IoSlice<'_>]) -> io::Result<usize>;

    /// Arm (or clear, with `None`) the timeout applied to the next `recv`.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;

    /// Shut down both halves of the connection.
    fn shutdown(&mut self) -> io::Result<()>;

    /// The remote address this transport is connected to.
    fn peer_addr(&self) -> io::Result<SocketAddr>;

    /// Whether the transport still considers itself connected. Does not
    /// perform I/O; reflects only locally known state (e.g. whether a fatal
    /// error already closed the socket).
    fn is_open(&self) -> bool;
}
