//! The synchronous RPC primitive (C6): send one method, wait for any of a
//! caller-supplied set of replies, and queue everything else so it can be
//! delivered later in arrival order.

use tracing::{debug, trace};

use crate::conn::Connection;
use crate::error::Error;
use crate::frame::FramePayload;
use crate::protocol::{Method, MethodId, CHANNEL_CLOSE, CONNECTION_CLOSE};

/// The outcome of a [`Connection::simple_rpc`] call.
#[derive(Debug)]
pub enum RpcReply {
    /// The server replied with one of the expected method ids.
    Normal { reply: Method },
    /// The server closed the channel or connection instead of replying.
    ServerException { close: Method },
    /// A transport- or protocol-level failure occurred before any reply.
    LibraryException { error: Error },
}

impl RpcReply {
    pub fn is_normal(&self) -> bool {
        matches!(self, RpcReply::Normal { .. })
    }
}

impl Connection {
    /// Send `request` on `channel`, then loop reading frames until one
    /// matches an id in `expected_reply_ids`, or a close frame arrives for
    /// this channel / connection. Any other frame is queued for later
    /// delivery via `wait_frame`, in the order it arrived.
    pub fn simple_rpc(
        &mut self,
        channel: u16,
        request: Method,
        expected_reply_ids: &[MethodId],
    ) -> RpcReply {
        if let Err(e) = self.send_method(channel, request) {
            return RpcReply::LibraryException { error: e };
        }

        loop {
            let frame = match self.wait_frame() {
                Ok(frame) => frame,
                Err(e) => return RpcReply::LibraryException { error: e },
            };

            let method = match frame.payload {
                FramePayload::Method(method) => method,
                other => {
                    trace!(channel = frame.channel, "rpc: queuing non-method frame");
                    self.enqueue(crate::frame::Frame { channel: frame.channel, payload: other });
                    continue;
                }
            };

            let id = method.id();
            let accepted = (frame.channel == channel
                && (expected_reply_ids.contains(&id) || id == CHANNEL_CLOSE))
                || (frame.channel == 0 && id == CONNECTION_CLOSE);

            if !accepted {
                trace!(channel = frame.channel, %id, "rpc: queuing non-matching method");
                self.enqueue(crate::frame::Frame { channel: frame.channel, payload: FramePayload::Method(method) });
                continue;
            }

            debug!(channel = frame.channel, %id, "rpc: accepted reply");
            return if expected_reply_ids.contains(&id) {
                RpcReply::Normal { reply: method }
            } else {
                RpcReply::ServerException { close: method }
            };
        }
    }

    /// Convenience wrapper that stores the result in
    /// [`Connection::last_rpc_result`] and returns the decoded method only
    /// on `Normal`.
    pub fn simple_rpc_decoded(
        &mut self,
        channel: u16,
        request: Method,
        expected_reply_id: MethodId,
    ) -> Option<Method> {
        let reply = self.simple_rpc(channel, request, &[expected_reply_id]);
        let method = match &reply {
            RpcReply::Normal { reply } => Some(reply.clone()),
            _ => None,
        };
        self.set_last_rpc_result(reply);
        method
    }

    /// Retrieve the last RPC's classification, as `amqp_get_rpc_reply` does
    /// in the original C API.
    pub fn get_rpc_reply(&self) -> Option<&RpcReply> {
        self.last_rpc_result()
    }
}

/// Wraps a fallible step of the handshake so its `Error` becomes a
/// `RpcReply::LibraryException`, matching the shape every other RPC step
/// returns. Used by [`crate::handshake`] to keep its state machine in
/// terms of one result type.
pub(crate) fn lib_err(e: Error) -> RpcReply {
    RpcReply::LibraryException { error: e }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::channel::{Close as ChannelClose, CloseOk as ChannelCloseOk};
    use crate::protocol::connection::CloseOk as ConnCloseOk;
    use crate::protocol::{CHANNEL_CLOSE_OK, CONNECTION_CLOSE_OK};
    use crate::transport::Transport;
    use std::collections::VecDeque;
    use std::io;
    use std::time::Duration;

    struct ScriptedTransport {
        inbound: VecDeque<Vec<u8>>,
    }

    impl Transport for ScriptedTransport {
        fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.inbound.pop_front() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                None => Ok(0),
            }
        }
        fn send(&mut self, _buf: &[u8]) -> io::Result<()> {
            Ok(())
        }
        fn writev(&mut self, bufs: &[std::io::IoSlice<'_>]) -> io::Result<usize> {
            Ok(bufs.iter().map(|b| b.len()).sum())
        }
        fn set_read_timeout(&mut self, _timeout: Option<Duration>) -> io::Result<()> {
            Ok(())
        }
        fn shutdown(&mut self) -> io::Result<()> {
            Ok(())
        }
        fn peer_addr(&self) -> io::Result<std::net::SocketAddr> {
            Ok(std::net::SocketAddr::from(([127, 0, 0, 1], 0)))
        }
        fn is_open(&self) -> bool {
            true
        }
    }

    #[test]
    fn rpc_queues_out_of_band_frame_then_accepts_reply() {
        let deliver = crate::frame::Frame::method(
            1,
            Method::Unknown { class_id: 60, method_id: 60, payload: vec![] },
        );
        let reply = crate::frame::Frame::method(0, Method::ConnectionCloseOk(ConnCloseOk));
        let mut wire = deliver.encode();
        wire.extend(reply.encode());

        let transport = ScriptedTransport { inbound: VecDeque::from([wire]) };
        let mut conn = Connection::new(Box::new(transport));

        let outcome = conn.simple_rpc(
            0,
            Method::ConnectionClose(crate::protocol::connection::Close {
                reply_code: 0,
                reply_text: String::new(),
                class_id: 0,
                method_id: 0,
            }),
            &[CONNECTION_CLOSE_OK],
        );
        assert!(outcome.is_normal());

        // The deferred frame should now surface via wait_frame, in order.
        let next = conn.wait_frame().unwrap();
        assert_eq!(next.channel, 1);
    }

    #[test]
    fn rpc_classifies_channel_close_as_server_exception() {
        let close = crate::frame::Frame::method(
            3,
            Method::ChannelClose(ChannelClose {
                reply_code: 404,
                reply_text: "NOT_FOUND".into(),
                class_id: 50,
                method_id: 10,
            }),
        );
        let transport = ScriptedTransport { inbound: VecDeque::from([close.encode()]) };
        let mut conn = Connection::new(Box::new(transport));

        let outcome = conn.simple_rpc(
            3,
            Method::ChannelCloseOk(ChannelCloseOk),
            &[CHANNEL_CLOSE_OK],
        );
        match outcome {
            RpcReply::ServerException { close } => {
                assert_eq!(close.id(), crate::protocol::CHANNEL_CLOSE);
            }
            other => panic!("expected ServerException, got {other:?}"),
        }
    }
}
