//! `channel` class methods. Only the close path is implemented; opening and
//! using channels beyond connection setup is out of scope for this crate.

use crate::codec;
use crate::error::CodecResult;

pub const CLASS_ID: u16 = 20;

pub const METHOD_CLOSE: u16 = 40;
pub const METHOD_CLOSE_OK: u16 = 41;

/// A channel-level close, sent by either peer.
#[derive(Debug, Clone)]
pub struct Close {
    pub reply_code: u16,
    pub reply_text: String,
    pub class_id: u16,
    pub method_id: u16,
}

impl Close {
    pub fn decode(payload: &[u8]) -> CodecResult<Self> {
        let reply_code = codec::read_u16(payload, 0)?;
        let (reply_text, n) = codec::read_short_string(payload, 2)?;
        let mut pos = 2 + n;
        let class_id = codec::read_u16(payload, pos)?;
        pos += 2;
        let method_id = codec::read_u16(payload, pos)?;
        Ok(Self { reply_code, reply_text, class_id, method_id })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        codec::write_u16(&mut buf, self.reply_code);
        codec::write_short_string(&mut buf, &self.reply_text);
        codec::write_u16(&mut buf, self.class_id);
        codec::write_u16(&mut buf, self.method_id);
        buf
    }
}

/// Acknowledges a `Close`.
#[derive(Debug, Clone, Copy)]
pub struct CloseOk;

impl CloseOk {
    pub fn decode(_payload: &[u8]) -> CodecResult<Self> {
        Ok(Self)
    }

    pub fn encode(&self) -> Vec<u8> {
        Vec::new()
    }
}
