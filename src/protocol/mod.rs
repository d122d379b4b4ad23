//! Method types and decode/encode dispatch.
//!
//! AMQP 0-9-1 methods are identified by a `(class_id, method_id)` pair. This
//! crate models only the connection-lifecycle and channel-close methods it
//! actually drives; everything else decodes to [`Method::Unknown`] so that
//! out-of-scope frames (e.g. `basic.deliver`) still round-trip through the
//! demux and frame queue without the crate needing to understand them.

pub mod channel;
pub mod connection;
pub mod table;

use crate::error::CodecResult;

/// Identifies a method by its class and method numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodId {
    pub class_id: u16,
    pub method_id: u16,
}

impl MethodId {
    pub const fn new(class_id: u16, method_id: u16) -> Self {
        Self { class_id, method_id }
    }
}

impl std::fmt::Display for MethodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.class_id, self.method_id)
    }
}

pub const CONNECTION_START: MethodId = MethodId::new(connection::CLASS_ID, connection::METHOD_START);
pub const CONNECTION_START_OK: MethodId = MethodId::new(connection::CLASS_ID, connection::METHOD_START_OK);
pub const CONNECTION_TUNE: MethodId = MethodId::new(connection::CLASS_ID, connection::METHOD_TUNE);
pub const CONNECTION_TUNE_OK: MethodId = MethodId::new(connection::CLASS_ID, connection::METHOD_TUNE_OK);
pub const CONNECTION_OPEN: MethodId = MethodId::new(connection::CLASS_ID, connection::METHOD_OPEN);
pub const CONNECTION_OPEN_OK: MethodId = MethodId::new(connection::CLASS_ID, connection::METHOD_OPEN_OK);
pub const CONNECTION_CLOSE: MethodId = MethodId::new(connection::CLASS_ID, connection::METHOD_CLOSE);
pub const CONNECTION_CLOSE_OK: MethodId = MethodId::new(connection::CLASS_ID, connection::METHOD_CLOSE_OK);
pub const CHANNEL_CLOSE: MethodId = MethodId::new(channel::CLASS_ID, channel::METHOD_CLOSE);
pub const CHANNEL_CLOSE_OK: MethodId = MethodId::new(channel::CLASS_ID, channel::METHOD_CLOSE_OK);

/// A decoded method frame body.
#[derive(Debug, Clone)]
pub enum Method {
    ConnectionStart(connection::Start),
    ConnectionStartOk(connection::StartOk),
    ConnectionTune(connection::Tune),
    ConnectionTuneOk(connection::TuneOk),
    ConnectionOpen(connection::Open),
    ConnectionOpenOk(connection::OpenOk),
    ConnectionClose(connection::Close),
    ConnectionCloseOk(connection::CloseOk),
    ChannelClose(channel::Close),
    ChannelCloseOk(channel::CloseOk),
    /// Any method this crate doesn't model. Carries the raw payload so the
    /// frame can still be queued and inspected by a caller that does.
    Unknown { class_id: u16, method_id: u16, payload: Vec<u8> },
}

impl Method {
    /// The `(class_id, method_id)` pair this method would encode as.
    pub fn id(&self) -> MethodId {
        match self {
            Method::ConnectionStart(_) => CONNECTION_START,
            Method::ConnectionStartOk(_) => CONNECTION_START_OK,
            Method::ConnectionTune(_) => CONNECTION_TUNE,
            Method::ConnectionTuneOk(_) => CONNECTION_TUNE_OK,
            Method::ConnectionOpen(_) => CONNECTION_OPEN,
            Method::ConnectionOpenOk(_) => CONNECTION_OPEN_OK,
            Method::ConnectionClose(_) => CONNECTION_CLOSE,
            Method::ConnectionCloseOk(_) => CONNECTION_CLOSE_OK,
            Method::ChannelClose(_) => CHANNEL_CLOSE,
            Method::ChannelCloseOk(_) => CHANNEL_CLOSE_OK,
            Method::Unknown { class_id, method_id, .. } => MethodId::new(*class_id, *method_id),
        }
    }

    /// Encode the class-id, method-id header and argument payload.
    pub fn encode(&self) -> Vec<u8> {
        let id = self.id();
        let mut buf = Vec::with_capacity(4 + 64);
        crate::codec::write_u16(&mut buf, id.class_id);
        crate::codec::write_u16(&mut buf, id.method_id);
        let args = match self {
            Method::ConnectionStart(m) => m.encode(),
            Method::ConnectionStartOk(m) => m.encode(),
            Method::ConnectionTune(m) => m.encode(),
            Method::ConnectionTuneOk(m) => m.encode(),
            Method::ConnectionOpen(m) => m.encode(),
            Method::ConnectionOpenOk(m) => m.encode(),
            Method::ConnectionClose(m) => m.encode(),
            Method::ConnectionCloseOk(m) => m.encode(),
            Method::ChannelClose(m) => m.encode(),
            Method::ChannelCloseOk(m) => m.encode(),
            Method::Unknown { payload, .. } => payload.clone(),
        };
        buf.extend_from_slice(&args);
        buf
    }

    /// Decode a method frame's payload (`class_id`, `method_id`, and
    /// arguments already concatenated, as read off the wire).
    pub fn decode(payload: &[u8]) -> CodecResult<Self> {
        let class_id = crate::codec::read_u16(payload, 0)?;
        let method_id = crate::codec::read_u16(payload, 2)?;
        let args = &payload[4..];
        Ok(match (class_id, method_id) {
            (c, m) if (c, m) == (connection::CLASS_ID, connection::METHOD_START) => {
                Method::ConnectionStart(connection::Start::decode(args)?)
            }
            (c, m) if (c, m) == (connection::CLASS_ID, connection::METHOD_START_OK) => {
                Method::ConnectionStartOk(connection::StartOk::decode(args)?)
            }
            (c, m) if (c, m) == (connection::CLASS_ID, connection::METHOD_TUNE) => {
                Method::ConnectionTune(connection::Tune::decode(args)?)
            }
            (c, m) if (c, m) == (connection::CLASS_ID, connection::METHOD_TUNE_OK) => {
                Method::ConnectionTuneOk(connection::TuneOk::decode(args)?)
            }
            (c, m) if (c, m) == (connection::CLASS_ID, connection::METHOD_OPEN) => {
                Method::ConnectionOpen(connection::Open::decode(args)?)
            }
            (c, m) if (c, m) == (connection::CLASS_ID, connection::METHOD_OPEN_OK) => {
                Method::ConnectionOpenOk(connection::OpenOk::decode(args)?)
            }
            (c, m) if (c, m) == (connection::CLASS_ID, connection::METHOD_CLOSE) => {
                Method::ConnectionClose(connection::Close::decode(args)?)
            }
            (c, m) if (c, m) == (connection::CLASS_ID, connection::METHOD_CLOSE_OK) => {
                Method::ConnectionCloseOk(connection::CloseOk::decode(args)?)
            }
            (c, m) if (c, m) == (channel::CLASS_ID, channel::METHOD_CLOSE) => {
                Method::ChannelClose(channel::Close::decode(args)?)
            }
            (c, m) if (c, m) == (channel::CLASS_ID, channel::METHOD_CLOSE_OK) => {
                Method::ChannelCloseOk(channel::CloseOk::decode(args)?)
            }
            _ => Method::Unknown { class_id, method_id, payload: args.to_vec() },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_method_round_trips_opaquely() {
        let m = Method::Unknown { class_id: 60, method_id: 60, payload: vec![1, 2, 3] };
        let encoded = m.encode();
        let decoded = Method::decode(&encoded).unwrap();
        match decoded {
            Method::Unknown { class_id, method_id, payload } => {
                assert_eq!(class_id, 60);
                assert_eq!(method_id, 60);
                assert_eq!(payload, vec![1, 2, 3]);
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn connection_close_ok_has_empty_args() {
        let m = Method::ConnectionCloseOk(connection::CloseOk);
        assert_eq!(m.id(), CONNECTION_CLOSE_OK);
        let encoded = m.encode();
        assert_eq!(encoded.len(), 4);
    }
}
