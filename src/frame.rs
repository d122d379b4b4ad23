//! Frame parsing, encoding, and the inbound demultiplexer.
//!
//! Wire format:
//! ```text
//! [type:u8] [channel:u16 BE] [length:u32 BE] [payload: length bytes] [0xCE]
//! ```

use crate::codec;
use crate::error::{CodecError, CodecResult};
use crate::protocol::Method;

pub const FRAME_END: u8 = 0xCE;

const TYPE_METHOD: u8 = 1;
const TYPE_HEADER: u8 = 2;
const TYPE_BODY: u8 = 3;
const TYPE_HEARTBEAT: u8 = 8;

const HEADER_LEN: usize = 7; // type(1) + channel(2) + length(4)

/// A single AMQP frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub channel: u16,
    pub payload: FramePayload,
}

#[derive(Debug, Clone)]
pub enum FramePayload {
    Method(Method),
    /// Content header, carried opaquely (decoding it further is out of scope).
    Header(Vec<u8>),
    /// Content body chunk, carried opaquely.
    Body(Vec<u8>),
    Heartbeat,
}

impl Frame {
    fn type_tag(&self) -> u8 {
        match &self.payload {
            FramePayload::Method(_) => TYPE_METHOD,
            FramePayload::Header(_) => TYPE_HEADER,
            FramePayload::Body(_) => TYPE_BODY,
            FramePayload::Heartbeat => TYPE_HEARTBEAT,
        }
    }

    fn body_bytes(&self) -> Vec<u8> {
        match &self.payload {
            FramePayload::Method(m) => m.encode(),
            FramePayload::Header(b) | FramePayload::Body(b) => b.clone(),
            FramePayload::Heartbeat => Vec::new(),
        }
    }

    /// Encode this frame to its complete wire representation, including the
    /// trailing frame-end marker.
    pub fn encode(&self) -> Vec<u8> {
        let body = self.body_bytes();
        let mut wire = Vec::with_capacity(HEADER_LEN + body.len() + 1);
        codec::write_u8(&mut wire, self.type_tag());
        codec::write_u16(&mut wire, self.channel);
        codec::write_u32(&mut wire, body.len() as u32);
        wire.extend_from_slice(&body);
        codec::write_u8(&mut wire, FRAME_END);
        wire
    }

    pub fn method(channel: u16, method: Method) -> Self {
        Frame { channel, payload: FramePayload::Method(method) }
    }
}

/// Decode a single frame from the front of `data`.
///
/// Returns `Ok(None)` when `data` doesn't yet contain a complete frame —
/// callers should wait for more bytes and retry. Returns
/// `Ok(Some((frame, consumed)))` on success, where `consumed` is always
/// greater than zero, which is what lets the demux loop make guaranteed
/// forward progress.
pub fn decode_frame(data: &[u8]) -> CodecResult<Option<(Frame, usize)>> {
    if data.len() < HEADER_LEN {
        return Ok(None);
    }
    let type_tag = codec::read_u8(data, 0)?;
    let channel = codec::read_u16(data, 1)?;
    let length = codec::read_u32(data, 3)? as usize;
    let total = HEADER_LEN + length + 1;
    if data.len() < total {
        return Ok(None);
    }
    let body = &data[HEADER_LEN..HEADER_LEN + length];
    let frame_end = data[HEADER_LEN + length];
    if frame_end != FRAME_END {
        return Err(CodecError::BadFrameEnd { got: frame_end });
    }
    let payload = match type_tag {
        TYPE_METHOD => FramePayload::Method(Method::decode(body)?),
        TYPE_HEADER => FramePayload::Header(body.to_vec()),
        TYPE_BODY => FramePayload::Body(body.to_vec()),
        TYPE_HEARTBEAT => FramePayload::Heartbeat,
        _ => FramePayload::Body(body.to_vec()),
    };
    Ok(Some((Frame { channel, payload }, total)))
}

/// Feeds a TCP byte stream to [`decode_frame`], carrying partial frames
/// across calls. Unlike a ring buffer, this grows and compacts a plain
/// `Vec`: connection setup traffic is small and infrequent enough that the
/// extra copy on compaction is not worth the complexity of a cursor-based
/// buffer.
#[derive(Default)]
pub struct InboundBuffer {
    buf: Vec<u8>,
}

impl InboundBuffer {
    pub fn new() -> Self {
        Self { buf: Vec::with_capacity(4096) }
    }

    /// Append freshly read bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// True if there may be a complete frame sitting in the buffer already.
    pub fn has_data(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Drain as many complete frames as are currently buffered.
    pub fn drain_frames(&mut self) -> CodecResult<Vec<Frame>> {
        let mut frames = Vec::new();
        let mut offset = 0;
        loop {
            match decode_frame(&self.buf[offset..])? {
                Some((frame, consumed)) => {
                    offset += consumed;
                    frames.push(frame);
                }
                None => break,
            }
        }
        if offset > 0 {
            self.buf.drain(..offset);
        }
        Ok(frames)
    }

    /// Pop the single next complete frame, if any, leaving the remainder
    /// buffered. Used by the blocking wait loop, which only needs one frame
    /// at a time but must not discard bytes belonging to the next one.
    pub fn pop_frame(&mut self) -> CodecResult<Option<Frame>> {
        match decode_frame(&self.buf)? {
            Some((frame, consumed)) => {
                self.buf.drain(..consumed);
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::connection::CloseOk;
    use crate::protocol::Method;

    fn close_ok_frame(channel: u16) -> Frame {
        Frame::method(channel, Method::ConnectionCloseOk(CloseOk))
    }

    #[test]
    fn encode_decode_round_trip() {
        let frame = close_ok_frame(0);
        let wire = frame.encode();
        let (decoded, consumed) = decode_frame(&wire).unwrap().unwrap();
        assert_eq!(consumed, wire.len());
        assert_eq!(decoded.channel, 0);
        assert!(matches!(decoded.payload, FramePayload::Method(Method::ConnectionCloseOk(_))));
    }

    #[test]
    fn heartbeat_round_trip() {
        let frame = Frame { channel: 0, payload: FramePayload::Heartbeat };
        let wire = frame.encode();
        assert_eq!(wire, vec![8, 0, 0, 0, 0, 0, 0, 0xCE]);
        let (decoded, _) = decode_frame(&wire).unwrap().unwrap();
        assert!(matches!(decoded.payload, FramePayload::Heartbeat));
    }

    #[test]
    fn partial_header_yields_none() {
        let wire = close_ok_frame(0).encode();
        assert!(decode_frame(&wire[..5]).unwrap().is_none());
    }

    #[test]
    fn partial_payload_yields_none() {
        let wire = close_ok_frame(0).encode();
        assert!(decode_frame(&wire[..wire.len() - 2]).unwrap().is_none());
    }

    #[test]
    fn bad_frame_end_is_rejected() {
        let mut wire = close_ok_frame(0).encode();
        let last = wire.len() - 1;
        wire[last] = 0x00;
        assert!(matches!(decode_frame(&wire), Err(CodecError::BadFrameEnd { got: 0 })));
    }

    #[test]
    fn inbound_buffer_drains_multiple_frames() {
        let mut inbound = InboundBuffer::new();
        let mut wire = close_ok_frame(0).encode();
        wire.extend(close_ok_frame(1).encode());
        inbound.extend(&wire);
        let frames = inbound.drain_frames().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].channel, 0);
        assert_eq!(frames[1].channel, 1);
        assert!(!inbound.has_data());
    }

    #[test]
    fn inbound_buffer_carries_partial_frame_across_feeds() {
        let mut inbound = InboundBuffer::new();
        let wire = close_ok_frame(0).encode();
        inbound.extend(&wire[..5]);
        assert!(inbound.drain_frames().unwrap().is_empty());
        inbound.extend(&wire[5..]);
        let frames = inbound.drain_frames().unwrap();
        assert_eq!(frames.len(), 1);
    }
}
