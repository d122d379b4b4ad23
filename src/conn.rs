//! The connection engine: transport ownership, the inbound demux (C3), the
//! frame queue (C4), and the timed wait-for-frame loop (C5).
//!
//! Handshake orchestration (C7) lives in [`crate::handshake`]; the
//! synchronous RPC primitive (C6) lives in [`crate::rpc`] as further
//! `impl Connection` blocks over the type defined here.

use std::io;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::frame::{Frame, InboundBuffer};
use crate::protocol::{Method, MethodId};
use crate::queue::FrameQueue;
use crate::rpc::RpcReply;
use crate::transport::Transport;

/// Negotiated connection tuning, filled in once the handshake completes
/// `Tune`/`TuneOk`. Zero fields before negotiation.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tuning {
    pub channel_max: u16,
    pub frame_max: u32,
    pub heartbeat: u16,
}

/// An AMQP 0-9-1 connection: one TCP transport, one inbound buffer, one
/// frame queue. Single-threaded — `Connection` is intentionally not
/// `Clone`, and callers who need shared access supply their own `Mutex`.
pub struct Connection {
    transport: Box<dyn Transport>,
    inbound: InboundBuffer,
    queued: FrameQueue,
    pub tuning: Tuning,
    last_rpc_result: Option<RpcReply>,
    recv_scratch: [u8; 4096],
}

impl Connection {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            inbound: InboundBuffer::new(),
            queued: FrameQueue::new(),
            tuning: Tuning::default(),
            last_rpc_result: None,
            recv_scratch: [0u8; 4096],
        }
    }

    /// Wrap an already-connected transport. Named to match the rest of the
    /// handshake vocabulary (`send_header`, `login`); equivalent to [`new`].
    ///
    /// [`new`]: Connection::new
    pub fn open(transport: Box<dyn Transport>) -> Self {
        Self::new(transport)
    }

    /// Send the literal 8-byte AMQP protocol header. No framing.
    pub fn send_header(&mut self) -> Result<()> {
        const HEADER: [u8; 8] = [
            b'A', b'M', b'Q', b'P', 0,
            crate::PROTOCOL_VERSION_MAJOR,
            crate::PROTOCOL_VERSION_MINOR,
            crate::PROTOCOL_VERSION_REVISION,
        ];
        trace!("sending protocol header");
        self.transport.send(&HEADER).map_err(Error::Io)
    }

    /// Encode and send a method frame on `channel`.
    pub fn send_method(&mut self, channel: u16, method: Method) -> Result<()> {
        let frame = Frame::method(channel, method);
        trace!(channel, method = %frame_method_id(&frame), "sending method");
        self.transport.send(&frame.encode()).map_err(Error::Io)
    }

    pub fn last_rpc_result(&self) -> Option<&RpcReply> {
        self.last_rpc_result.as_ref()
    }

    pub(crate) fn set_last_rpc_result(&mut self, reply: RpcReply) {
        self.last_rpc_result = Some(reply);
    }

    pub(crate) fn enqueue(&mut self, frame: Frame) {
        self.queued.enqueue(frame);
    }

    /// Block indefinitely for the next frame.
    pub fn wait_frame(&mut self) -> Result<Frame> {
        self.wait_frame_inner(None)
    }

    /// Block for up to `timeout` for the next frame.
    pub fn wait_frame_timeout(&mut self, timeout: Duration) -> Result<Frame> {
        self.wait_frame_inner(Some(timeout))
    }

    /// The wait-for-frame engine (C5): fast path (queue), buffer-drain path
    /// (demux already-read bytes), then the blocking path with a monotonic
    /// deadline that `io::ErrorKind::Interrupted` cannot extend.
    fn wait_frame_inner(&mut self, timeout: Option<Duration>) -> Result<Frame> {
        if let Some(frame) = self.queued.dequeue() {
            trace!("wait_frame: fast path, dequeued queued frame");
            return Ok(frame);
        }

        if let Some(frame) = self.inbound.pop_frame()? {
            trace!("wait_frame: buffer-drain path satisfied the wait");
            return Ok(frame);
        }

        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if !self.transport.is_open() {
                return Err(Error::ConnectionClosed);
            }

            let remaining = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(Error::Timeout { timeout: timeout.unwrap() });
                    }
                    Some(remaining)
                }
                None => None,
            };

            self.transport.set_read_timeout(remaining).map_err(Error::Io)?;

            let n = match self.transport.recv(&mut self.recv_scratch) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                    // Retry against the *same* deadline — never reset it.
                    debug!("recv interrupted, retrying against original deadline");
                    continue;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut => {
                    // Per-call timeout elapsed; loop re-checks the overall deadline.
                    continue;
                }
                Err(e) => return Err(Error::Io(e)),
            };

            if n == 0 {
                return Err(Error::ConnectionClosed);
            }

            self.inbound.extend(&self.recv_scratch[..n]);
            if let Some(frame) = self.inbound.pop_frame()? {
                return Ok(frame);
            }
            // Not enough bytes yet for a complete frame; loop for more.
        }
    }

    /// Wait for a specific method on `channel`, closing the transport (and
    /// marking the connection unusable) on any mismatch — a protocol
    /// violation at this layer is always fatal.
    pub fn simple_wait_method(&mut self, channel: u16, expected: MethodId) -> Result<Method> {
        let frame = self.wait_frame()?;
        if frame.channel != channel {
            let _ = self.transport.shutdown();
            return Err(Error::WrongMethod { expected: vec![expected], got: MethodId::new(0, 0) });
        }
        match frame.payload {
            crate::frame::FramePayload::Method(method) if method.id() == expected => Ok(method),
            crate::frame::FramePayload::Method(method) => {
                let got = method.id();
                let _ = self.transport.shutdown();
                Err(Error::WrongMethod { expected: vec![expected], got })
            }
            _ => {
                let _ = self.transport.shutdown();
                Err(Error::WrongMethod { expected: vec![expected], got: MethodId::new(0, 0) })
            }
        }
    }
}

fn frame_method_id(frame: &Frame) -> String {
    match &frame.payload {
        crate::frame::FramePayload::Method(m) => m.id().to_string(),
        _ => "non-method".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::connection::CloseOk;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// An in-memory transport backed by a queue of pre-encoded reads, for
    /// driving the wait-for-frame engine without a real socket.
    struct MockTransport {
        inbound: VecDeque<Vec<u8>>,
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        open: bool,
        interrupted_remaining: usize,
    }

    impl Transport for MockTransport {
        fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.interrupted_remaining > 0 {
                self.interrupted_remaining -= 1;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            match self.inbound.pop_front() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                None => Ok(0),
            }
        }

        fn send(&mut self, buf: &[u8]) -> io::Result<()> {
            self.sent.lock().unwrap().push(buf.to_vec());
            Ok(())
        }

        fn writev(&mut self, bufs: &[std::io::IoSlice<'_>]) -> io::Result<usize> {
            let mut total = 0;
            for buf in bufs {
                self.sent.lock().unwrap().push(buf.to_vec());
                total += buf.len();
            }
            Ok(total)
        }

        fn set_read_timeout(&mut self, _timeout: Option<Duration>) -> io::Result<()> {
            Ok(())
        }

        fn shutdown(&mut self) -> io::Result<()> {
            self.open = false;
            Ok(())
        }

        fn peer_addr(&self) -> io::Result<std::net::SocketAddr> {
            Ok(std::net::SocketAddr::from(([127, 0, 0, 1], 0)))
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    #[test]
    fn wait_frame_drains_from_single_recv() {
        let frame = Frame::method(0, Method::ConnectionCloseOk(CloseOk));
        let wire = frame.encode();
        let transport = MockTransport {
            inbound: VecDeque::from([wire]),
            sent: Arc::new(Mutex::new(Vec::new())),
            open: true,
            interrupted_remaining: 0,
        };
        let mut conn = Connection::new(Box::new(transport));
        let got = conn.wait_frame().unwrap();
        assert_eq!(got.channel, 0);
    }

    #[test]
    fn wait_frame_fast_path_prefers_queue() {
        let queued_frame = Frame::method(7, Method::ConnectionCloseOk(CloseOk));
        let transport = MockTransport { inbound: VecDeque::new(), sent: Arc::new(Mutex::new(Vec::new())), open: true, interrupted_remaining: 0 };
        let mut conn = Connection::new(Box::new(transport));
        conn.enqueue(queued_frame);
        let got = conn.wait_frame_timeout(Duration::from_millis(10)).unwrap();
        assert_eq!(got.channel, 7);
    }

    #[test]
    fn wait_frame_timeout_when_no_data_arrives() {
        let transport = MockTransport { inbound: VecDeque::new(), sent: Arc::new(Mutex::new(Vec::new())), open: true, interrupted_remaining: 0 };
        let mut conn = Connection::new(Box::new(transport));
        let err = conn.wait_frame_timeout(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed) || matches!(err, Error::Timeout { .. }));
    }

    #[test]
    fn interrupted_recv_retries_against_same_deadline() {
        let transport = MockTransport {
            inbound: VecDeque::new(),
            sent: Arc::new(Mutex::new(Vec::new())),
            open: true,
            interrupted_remaining: 2,
        };
        let mut conn = Connection::new(Box::new(transport));
        // Two Interrupted results are absorbed silently; the loop then sees
        // an empty read (peer closed) rather than surfacing the interrupt as
        // an error or resetting the deadline clock.
        let err = conn.wait_frame_timeout(Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[test]
    fn simple_wait_method_rejects_mismatch_and_closes() {
        let frame = Frame::method(0, Method::ConnectionCloseOk(CloseOk));
        let wire = frame.encode();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let transport = MockTransport { inbound: VecDeque::from([wire]), sent: sent.clone(), open: true, interrupted_remaining: 0 };
        let mut conn = Connection::new(Box::new(transport));
        let err = conn
            .simple_wait_method(0, crate::protocol::CONNECTION_OPEN_OK)
            .unwrap_err();
        assert!(matches!(err, Error::WrongMethod { .. }));
    }
}
